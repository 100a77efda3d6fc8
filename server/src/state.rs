use std::sync::Arc;
use tokio::sync::watch;

use crate::chat::ChatService;
use crate::ws::SubscriberRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Sessions, action log and stream cursors
    pub chat: Arc<ChatService>,
    /// Active WebSocket stream subscribers
    pub subscribers: SubscriberRegistry,
    /// Outbound frames buffered per subscriber before its cursor waits
    pub stream_buffer: usize,
    /// Flips to true once the server starts shutting down
    pub shutdown: watch::Receiver<bool>,
}
