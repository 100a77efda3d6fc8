pub mod actor;
pub mod handler;
pub mod protocol;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Bookkeeping for one attached stream subscriber.
#[derive(Debug, Clone)]
pub struct SubscriberInfo {
    pub opened_at: DateTime<Utc>,
}

/// Subscriber registry: every WebSocket currently streaming the action log.
/// Subscribers are anonymous; each connection gets its own id.
pub type SubscriberRegistry = Arc<DashMap<Uuid, SubscriberInfo>>;

/// Create a new empty subscriber registry.
pub fn new_subscriber_registry() -> SubscriberRegistry {
    Arc::new(DashMap::new())
}
