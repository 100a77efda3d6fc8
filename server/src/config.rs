use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Chat hub server
///
/// Flags left unset on the command line do not override lower layers.
#[derive(Parser, Serialize, Clone, Debug, Default)]
#[command(name = "chathub-server", version, about = "Chat hub broadcast server")]
pub struct Cli {
    /// Port to listen on [default: 50051]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address [default: 0.0.0.0]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file
    #[arg(long, default_value = "./chathub.toml")]
    #[serde(skip)]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub generate_config: bool,

    /// Username whose messages may carry admin commands [default: admin]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_username: Option<String>,

    /// Runtime worker threads handling requests and streams [default: 10]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,

    /// Frames buffered per stream subscriber before backpressure [default: 256]
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_buffer: Option<usize>,
}

/// Effective server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub json_logs: bool,
    pub generate_config: bool,
    /// Messages from this user may carry \kick / \add commands.
    pub admin_username: String,
    pub worker_threads: usize,
    pub stream_buffer: usize,
    /// External event queue ([sink] section in TOML)
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Configuration for the external event queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Publish every action to Redis (default: false, actions are only traced)
    #[serde(default)]
    pub enabled: bool,

    /// Redis connection URL (default: "redis://127.0.0.1:6379")
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Redis list the records are pushed onto (default: "chat_events")
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            redis_url: default_redis_url(),
            queue_name: default_queue_name(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_queue_name() -> String {
    "chat_events".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 50051,
            bind_address: "0.0.0.0".to_string(),
            json_logs: false,
            generate_config: false,
            admin_username: "admin".to_string(),
            worker_threads: 10,
            stream_buffer: 256,
            sink: SinkConfig::default(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (CHATHUB_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("CHATHUB_").split("__"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Chat Hub Server Configuration
# Place this file at ./chathub.toml or specify with --config <path>
# All settings can be overridden via environment variables (CHATHUB_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 50051)
# port = 50051

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Username whose messages may carry \kick / \add commands
# admin_username = "admin"

# Runtime worker threads (default: 10)
# worker_threads = 10

# Frames buffered per stream subscriber before the cursor waits (default: 256)
# stream_buffer = 256

# ---- External Event Queue ----
# Every recorded action is pushed as JSON onto a Redis list, best effort.
# [sink]
# enabled = false
# redis_url = "redis://127.0.0.1:6379"
# queue_name = "chat_events"
"#
    .to_string()
}
