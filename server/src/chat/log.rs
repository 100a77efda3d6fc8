//! Append-only action log shared by every subscriber.
//!
//! The log length doubles as the change signal: it is published on a
//! `watch` channel while the entries lock is still held, so a reader that
//! observes length `n` can always slice at least `n` entries, and a waiter
//! never misses growth that happens between its check and its sleep.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use crate::sink::{EventSink, SinkRecord};

/// Kind of a recorded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Connect,
    Disconnect,
    Message,
}

impl ActionKind {
    /// Name used in sink records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "SEND_MESSAGE",
        }
    }
}

/// One entry of the log. Immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Position in the log, starting at 0.
    pub index: u64,
    pub username: String,
    pub kind: ActionKind,
    /// Message text; empty for connect/disconnect.
    pub payload: String,
    pub recorded_at: DateTime<Utc>,
}

impl Action {
    /// Wall-clock time as fractional epoch seconds.
    pub fn epoch_seconds(&self) -> f64 {
        self.recorded_at.timestamp_micros() as f64 / 1_000_000.0
    }
}

pub struct ActionLog {
    entries: Mutex<Vec<Arc<Action>>>,
    /// Current length. Updated under the `entries` lock.
    length_tx: watch::Sender<usize>,
    sink: Arc<dyn EventSink>,
}

impl ActionLog {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        let (length_tx, _) = watch::channel(0);
        Self {
            entries: Mutex::new(Vec::new()),
            length_tx,
            sink,
        }
    }

    /// Append an action and wake every waiting cursor. Returns its index.
    ///
    /// The sink copy is published after the lock is released; the sink
    /// never blocks and its failures never reach the caller.
    pub fn append(&self, username: &str, kind: ActionKind, payload: &str) -> u64 {
        let action = {
            let mut entries = self.entries.lock();
            let action = Arc::new(Action {
                index: entries.len() as u64,
                username: username.to_string(),
                kind,
                payload: payload.to_string(),
                recorded_at: Utc::now(),
            });
            entries.push(action.clone());
            self.length_tx.send_replace(entries.len());
            action
        };

        self.sink.publish(SinkRecord::from_action(&action));
        action.index
    }

    /// Snapshot of every action with `index >= from`, in order.
    pub fn slice(&self, from: usize) -> Vec<Arc<Action>> {
        let entries = self.entries.lock();
        entries.get(from..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Change signal: a receiver of the current log length.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.length_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::LogSink;

    fn new_log() -> ActionLog {
        ActionLog::new(Arc::new(LogSink))
    }

    #[test]
    fn test_append_assigns_gap_free_indices() {
        let log = new_log();
        assert!(log.is_empty());

        assert_eq!(log.append("alice", ActionKind::Connect, ""), 0);
        assert_eq!(log.append("alice", ActionKind::Message, "hi"), 1);
        assert_eq!(log.append("alice", ActionKind::Disconnect, ""), 2);

        let all = log.slice(0);
        assert_eq!(log.len(), 3);
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].payload, "hi");
        assert_eq!(all[1].kind, ActionKind::Message);
        for (i, action) in all.iter().enumerate() {
            assert_eq!(action.index, i as u64);
        }
    }

    #[test]
    fn test_slice_from_offset_and_past_end() {
        let log = new_log();
        for i in 0..5 {
            log.append("bob", ActionKind::Message, &i.to_string());
        }

        let tail = log.slice(3);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].index, 3);
        assert!(log.slice(5).is_empty());
        assert!(log.slice(42).is_empty());
    }

    #[test]
    fn test_signal_tracks_length() {
        let log = new_log();
        let rx = log.subscribe();
        assert_eq!(*rx.borrow(), 0);

        log.append("carol", ActionKind::Connect, "");
        log.append("carol", ActionKind::Message, "yo");
        assert_eq!(*rx.borrow(), 2);
    }

    #[test]
    fn test_concurrent_appends_are_totally_ordered() {
        let log = Arc::new(new_log());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        log.append(&format!("user{}", t), ActionKind::Message, &i.to_string());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let all = log.slice(0);
        assert_eq!(all.len(), 800);
        assert!(all.iter().enumerate().all(|(i, a)| a.index == i as u64));

        // Per-writer order is preserved inside the global order.
        for t in 0..8 {
            let name = format!("user{}", t);
            let payloads: Vec<u32> = all
                .iter()
                .filter(|a| a.username == name)
                .map(|a| a.payload.parse().unwrap())
                .collect();
            assert_eq!(payloads, (0..100).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_sink_receives_every_append() {
        let sink = Arc::new(crate::sink::testing::RecordingSink::default());
        let log = ActionLog::new(sink.clone());

        log.append("dave", ActionKind::Connect, "");
        log.append("dave", ActionKind::Message, "hello");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action_type, "CONNECT");
        assert_eq!(records[1].action_type, "SEND_MESSAGE");
        assert_eq!(records[1].payload, "hello");
        assert_eq!(records[1].username, "dave");
    }
}
