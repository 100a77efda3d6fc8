use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use chathub_server::chat::registry::SessionRegistry;
use chathub_server::chat::{ActionLog, ChatService};
use chathub_server::config::{generate_config_template, Config};
use chathub_server::sink::{EventSink, LogSink, QueueSink};
use chathub_server::{routes, state, ws};

/// Time the queue publisher gets to drain after the server stops.
const SINK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    init_tracing(config.json_logs);

    // Worker pool shared by unary calls and stream subscribers
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))
}

fn init_tracing(json_logs: bool) {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chathub_server=info"))
    };

    if json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter()).init();
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        worker_threads = config.worker_threads,
        "Chat hub v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // External event queue, best effort
    let (sink, publisher): (Arc<dyn EventSink>, Option<JoinHandle<()>>) = if config.sink.enabled {
        let (sink, handle) = QueueSink::spawn(&config.sink, shutdown_rx.clone())?;
        tracing::info!(
            queue = %config.sink.queue_name,
            "Publishing actions to Redis event queue"
        );
        (Arc::new(sink), Some(handle))
    } else {
        tracing::info!("External event queue disabled, actions are only traced");
        (Arc::new(LogSink), None)
    };

    let app_state = state::AppState {
        chat: Arc::new(ChatService::with_parts(
            SessionRegistry::new(),
            Arc::new(ActionLog::new(sink)),
            config.admin_username.clone(),
        )),
        subscribers: ws::new_subscriber_registry(),
        stream_buffer: config.stream_buffer,
        shutdown: shutdown_rx,
    };

    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown requested, closing streams");
            shutdown_tx.send_replace(true);
        })
        .await?;

    if let Some(handle) = publisher {
        if tokio::time::timeout(SINK_DRAIN_TIMEOUT, handle).await.is_err() {
            tracing::warn!("Event queue publisher did not drain in time");
        }
    }

    tracing::info!("Chat hub stopped");
    Ok(())
}

/// Resolves on ctrl-c, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
