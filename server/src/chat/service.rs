//! Orchestration of sessions, the action log and subscriber streams.

use futures_util::Stream;
use std::sync::Arc;

use super::cursor::StreamCursor;
use super::registry::{SessionRegistry, Sessions};
use super::{Action, ActionKind, ActionLog, ChatError};
use crate::moderation::AdminCommand;
use crate::sink::EventSink;

pub struct ChatService {
    sessions: SessionRegistry,
    log: Arc<ActionLog>,
    admin_username: String,
}

impl ChatService {
    /// Fresh, empty state publishing every action to `sink`.
    pub fn new(sink: Arc<dyn EventSink>, admin_username: impl Into<String>) -> Self {
        Self::with_parts(
            SessionRegistry::new(),
            Arc::new(ActionLog::new(sink)),
            admin_username,
        )
    }

    /// Build around state owned elsewhere. Services sharing nothing are
    /// fully independent.
    pub fn with_parts(
        sessions: SessionRegistry,
        log: Arc<ActionLog>,
        admin_username: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            log,
            admin_username: admin_username.into(),
        }
    }

    pub fn log(&self) -> &Arc<ActionLog> {
        &self.log
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Open a session for `username` and record a Connect action.
    pub fn connect(&self, username: &str) -> Result<String, ChatError> {
        let mut sessions = self.sessions.lock();
        match sessions.register(username) {
            Ok(token) => {
                self.log.append(username, ActionKind::Connect, "");
                tracing::debug!(username = %username, "User connected");
                Ok(token)
            }
            Err(e) => {
                tracing::debug!(username = %username, "User tried unsuccessfully to connect");
                Err(e)
            }
        }
    }

    /// Record a Disconnect action for the session's user and revoke the token.
    pub fn disconnect(&self, token: &str) -> Result<(), ChatError> {
        let mut sessions = self.sessions.lock();
        let username = sessions.resolve(token)?.to_string();

        self.log.append(&username, ActionKind::Disconnect, "");
        sessions.revoke(token)?;

        tracing::debug!(username = %username, "User disconnected");
        Ok(())
    }

    /// Record a message. Administrator commands in `text` run first; the
    /// message itself is always recorded, raw command text included.
    pub fn send_message(&self, token: &str, text: &str) -> Result<(), ChatError> {
        let mut sessions = self.sessions.lock();
        let username = match sessions.resolve(token) {
            Ok(username) => username.to_string(),
            Err(e) => {
                tracing::debug!("Message rejected: token is not valid");
                return Err(e);
            }
        };

        // Every command runs; the first failure is what the caller sees.
        let mut outcome = Ok(());
        if username == self.admin_username {
            for command in AdminCommand::parse(text) {
                let result = self.run_admin_command(&mut sessions, command);
                if outcome.is_ok() {
                    outcome = result;
                }
            }
        }

        self.log.append(&username, ActionKind::Message, text);
        tracing::debug!(username = %username, text = %text, "User sent message");
        outcome
    }

    fn run_admin_command(
        &self,
        sessions: &mut Sessions,
        command: AdminCommand,
    ) -> Result<(), ChatError> {
        match command {
            AdminCommand::Kick { target } => {
                let token = match sessions.find_token_by_username(&target) {
                    Ok(token) => token.to_string(),
                    Err(e) => {
                        tracing::info!(target_user = %target, "Kick target is not connected");
                        return Err(e);
                    }
                };
                self.log.append(&target, ActionKind::Disconnect, "");
                sessions.revoke(&token)?;
                tracing::info!(target_user = %target, "Admin removed user");
            }
            AdminCommand::Add { username } => {
                tracing::info!(added_user = %username, "Admin added user");
            }
        }
        Ok(())
    }

    /// Full-history, never-ending feed of actions for one subscriber.
    pub fn open_stream(&self) -> impl Stream<Item = Arc<Action>> + Send + 'static {
        StreamCursor::new(self.log.clone()).into_stream()
    }
}
