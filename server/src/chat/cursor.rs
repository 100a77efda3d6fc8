//! Per-subscriber read position into the action log.
//!
//! A cursor replays the log from index 0, then parks on the log's change
//! signal until more entries arrive. It never ends on its own; the stream is
//! closed by dropping it when the transport goes away.

use futures_util::stream::{self, Stream};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;

use super::{Action, ActionLog};

pub struct StreamCursor {
    log: Arc<ActionLog>,
    /// First index not yet pulled from the log.
    next_index: usize,
    /// Pulled but not yet delivered, in index order.
    pending: VecDeque<Arc<Action>>,
    growth: watch::Receiver<usize>,
}

impl StreamCursor {
    /// Cursor positioned at the start of the log (full history replay).
    pub fn new(log: Arc<ActionLog>) -> Self {
        let growth = log.subscribe();
        Self {
            log,
            next_index: 0,
            pending: VecDeque::new(),
            growth,
        }
    }

    /// Number of actions handed out so far.
    #[cfg(test)]
    pub(crate) fn delivered(&self) -> usize {
        self.next_index - self.pending.len()
    }

    /// Next action in index order, waiting for the log to grow if needed.
    ///
    /// Returns `None` only if the log itself has been dropped.
    pub async fn next(&mut self) -> Option<Arc<Action>> {
        loop {
            // Draining
            if let Some(action) = self.pending.pop_front() {
                return Some(action);
            }

            let batch = self.log.slice(self.next_index);
            if !batch.is_empty() {
                self.next_index += batch.len();
                self.pending.extend(batch);
                continue;
            }

            // Waiting: wait_for checks the current length before sleeping.
            let seen = self.next_index;
            self.growth.wait_for(|len| *len > seen).await.ok()?;
        }
    }

    /// Lazy, infinite stream of actions starting at this cursor's position.
    pub fn into_stream(self) -> impl Stream<Item = Arc<Action>> + Send + 'static {
        stream::unfold(self, |mut cursor| async move {
            let action = cursor.next().await?;
            Some((action, cursor))
        })
    }
}
