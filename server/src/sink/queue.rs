//! Redis list sink: each record is RPUSHed as JSON onto a named list.
//!
//! `publish` only enqueues onto a bounded channel; a background task owns
//! the single shared Redis connection. Records that cannot be delivered, or
//! that arrive while the channel is full, are logged and dropped
//! (at-most-once).

use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::{EventSink, SinkRecord};
use crate::config::SinkConfig;

/// Upper bound on a (re)connect attempt, so shutdown never hangs on Redis.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on a single RPUSH round trip.
const PUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Records buffered between the log and the publisher.
const QUEUE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct QueueSink {
    tx: mpsc::Sender<SinkRecord>,
}

impl QueueSink {
    /// Start the publisher task. It exits once `shutdown` flips (after
    /// draining what is already queued) or when every `QueueSink` is dropped.
    pub fn spawn(
        config: &SinkConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(Self, JoinHandle<()>), redis::RedisError> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let publisher = Publisher {
            client,
            queue_name: config.queue_name.clone(),
            conn: None,
        };
        let handle = tokio::spawn(publisher.run(rx, shutdown));
        Ok((Self { tx }, handle))
    }
}

impl EventSink for QueueSink {
    fn publish(&self, record: SinkRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(record)) => {
                tracing::warn!(
                    username = %record.username,
                    action = %record.action_type,
                    "Event queue full, dropping record"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Event queue publisher stopped, dropping record");
            }
        }
    }
}

struct Publisher {
    client: redis::Client,
    queue_name: String,
    conn: Option<MultiplexedConnection>,
}

impl Publisher {
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<SinkRecord>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(queue = %self.queue_name, "Event queue publisher started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    self.drain(&mut rx).await;
                    break;
                }
                record = rx.recv() => match record {
                    Some(record) => {
                        self.push(&record).await;
                    }
                    None => break,
                },
            }
        }

        tracing::info!(queue = %self.queue_name, "Event queue publisher stopped");
    }

    /// Flush what is already queued. The first failed push abandons the
    /// rest, so a dead broker costs at most one timeout here.
    async fn drain(&mut self, rx: &mut mpsc::Receiver<SinkRecord>) {
        rx.close();
        while let Ok(record) = rx.try_recv() {
            if !self.push(&record).await {
                let mut dropped = 1;
                while rx.try_recv().is_ok() {
                    dropped += 1;
                }
                tracing::warn!(dropped, "Event queue unavailable at shutdown, dropping backlog");
                return;
            }
        }
    }

    /// Returns whether the record reached Redis.
    async fn push(&mut self, record: &SinkRecord) -> bool {
        let body = match serde_json::to_string(record) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode sink record");
                return false;
            }
        };

        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(&self.queue_name).arg(body);

        let Some(conn) = self.connection().await else {
            return false;
        };
        let pushed: Result<redis::RedisResult<i64>, _> =
            timeout(PUSH_TIMEOUT, cmd.query_async(conn)).await;
        let error = match pushed {
            Ok(Ok(_)) => return true,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "timed out".to_string(),
        };
        tracing::warn!(
            queue = %self.queue_name,
            error = %error,
            "Failed to publish action to event queue"
        );
        // Reconnect on the next record.
        self.conn = None;
        false
    }

    async fn connection(&mut self) -> Option<&mut MultiplexedConnection> {
        if self.conn.is_none() {
            match timeout(CONNECT_TIMEOUT, self.client.get_multiplexed_async_connection()).await {
                Ok(Ok(conn)) => {
                    tracing::debug!(queue = %self.queue_name, "Connected to event queue");
                    self.conn = Some(conn);
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Event queue unreachable, dropping record");
                }
                Err(_) => {
                    tracing::warn!("Event queue connect timed out, dropping record");
                }
            }
        }
        self.conn.as_mut()
    }
}
