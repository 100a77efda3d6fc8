//! Best-effort copy of every recorded action for downstream consumers.
//!
//! Publishing is fire-and-forget: an `EventSink` must return promptly and
//! must swallow its own failures. The in-memory action log stays the source
//! of truth for streaming.

pub mod queue;

use serde::{Deserialize, Serialize};

use crate::chat::Action;

pub use queue::QueueSink;

/// Flat record published for each action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkRecord {
    /// Epoch seconds (fractional).
    pub time: f64,
    pub username: String,
    /// "CONNECT", "DISCONNECT" or "SEND_MESSAGE".
    pub action_type: String,
    pub payload: String,
}

impl SinkRecord {
    pub fn from_action(action: &Action) -> Self {
        Self {
            time: action.epoch_seconds(),
            username: action.username.clone(),
            action_type: action.kind.as_str().to_string(),
            payload: action.payload.clone(),
        }
    }
}

/// Destination for sink records. Must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, record: SinkRecord);
}

/// Sink used when no external queue is configured: records are only traced.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, record: SinkRecord) {
        tracing::trace!(
            username = %record.username,
            action_type = %record.action_type,
            "Action recorded"
        );
    }
}
