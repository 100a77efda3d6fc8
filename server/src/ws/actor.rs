use axum::extract::ws::{CloseFrame, Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, Stream, StreamExt};
use prost::Message as ProstMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::chat::Action;
use crate::proto::ws::{envelope::Payload, Envelope};
use crate::state::AppState;
use crate::ws::protocol;
use crate::ws::SubscriberInfo;

/// Ping interval: server sends WebSocket ping every 30 seconds.
/// Detects peers that vanished without a close frame.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if pong not received within 10 seconds after ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the writer gets to flush a final close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

const CLOSE_GOING_AWAY: u16 = 1001;

/// Run the actor-per-connection pattern for a stream subscriber.
///
/// - Writer task: owns the sink, forwards frames from a bounded mpsc channel
/// - Feed task: drives this subscriber's cursor and pushes one frame per action
/// - Reader loop: handles client frames and requests until the peer or the
///   server goes away
///
/// The cursor lives inside the feed task, so tearing the connection down
/// drops it; the log itself is never touched.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let subscriber_id = Uuid::new_v4();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<Message>(state.stream_buffer.max(1));

    state.subscribers.insert(
        subscriber_id,
        SubscriberInfo {
            opened_at: Utc::now(),
        },
    );
    tracing::info!(
        subscriber = %subscriber_id,
        backlog = state.chat.log().len(),
        "Stream subscriber attached"
    );

    // Spawn writer task: forwards mpsc messages to WebSocket sink
    let mut writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Spawn feed task: replay history, then follow the log
    let feed_handle = tokio::spawn(feed_task(state.chat.open_stream(), tx.clone()));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).await.is_err() {
                // Writer task has died, connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {}
                _ => {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx
                        .send(Message::Close(Some(CloseFrame {
                            code: CLOSE_GOING_AWAY,
                            reason: "Pong timeout".into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    let mut shutdown = state.shutdown.clone();

    // Reader loop: process incoming WebSocket messages
    loop {
        tokio::select! {
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(msg)) => match msg {
                    Message::Binary(data) => {
                        protocol::handle_binary_message(&data, &tx, &state).await;
                    }
                    Message::Text(text) => {
                        tracing::debug!(
                            subscriber = %subscriber_id,
                            "Received text message (expected binary protobuf): {}",
                            text.chars().take(100).collect::<String>()
                        );
                    }
                    Message::Pong(_) => {
                        let _ = pong_tx.send(());
                    }
                    Message::Ping(data) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Message::Close(frame) => {
                        tracing::info!(
                            subscriber = %subscriber_id,
                            reason = ?frame,
                            "Client initiated close"
                        );
                        break;
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!(
                        subscriber = %subscriber_id,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
                None => {
                    tracing::info!(subscriber = %subscriber_id, "WebSocket stream ended");
                    break;
                }
            },
            // The watch::Ref must not outlive the arm's future: it holds a lock guard.
            _ = async { let _ = shutdown.wait_for(|stopping| *stopping).await; } => {
                feed_handle.abort();
                let close = Message::Close(Some(CloseFrame {
                    code: CLOSE_GOING_AWAY,
                    reason: "Server shutting down".into(),
                }));
                let _ = timeout(CLOSE_GRACE, tx.send(close)).await;
                break;
            }
        }
    }

    // Cleanup: stop producers, then let the writer flush whatever is queued
    feed_handle.abort();
    ping_handle.abort();
    drop(tx);
    if timeout(CLOSE_GRACE, &mut writer_handle).await.is_err() {
        tracing::debug!(subscriber = %subscriber_id, "Writer did not drain in time");
        writer_handle.abort();
    }

    let connected_for = state
        .subscribers
        .remove(&subscriber_id)
        .map(|(_, info)| Utc::now() - info.opened_at);

    tracing::info!(
        subscriber = %subscriber_id,
        connected_secs = connected_for.map(|d| d.num_seconds()).unwrap_or_default(),
        "Stream subscriber detached"
    );
}

/// Feed task: one binary ActionEvent frame per action, in index order.
async fn feed_task(
    actions: impl Stream<Item = Arc<Action>>,
    tx: mpsc::Sender<Message>,
) {
    let mut actions = std::pin::pin!(actions);
    while let Some(action) = actions.next().await {
        let envelope = Envelope {
            request_id: String::new(),
            payload: Some(Payload::ActionEvent(action.as_ref().into())),
        };
        if tx
            .send(Message::Binary(envelope.encode_to_vec().into()))
            .await
            .is_err()
        {
            // Writer is gone; dropping the stream closes the cursor.
            break;
        }
    }
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, Message::Close(_));
        if ws_sender.send(msg).await.is_err() || closing {
            break;
        }
    }
}
