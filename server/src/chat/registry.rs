//! Active sessions: opaque token <-> username, at most one session per name.

use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use uuid::Uuid;

use super::ChatError;

/// Session state behind a single lock. Callers hold the guard across a
/// registry check and the matching log append so the two stay in order.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take exclusive access to the session table.
    pub fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock()
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct Sessions {
    by_token: HashMap<String, String>,
    /// username -> token
    by_username: HashMap<String, String>,
}

impl Sessions {
    /// Create a session for `username` and return its fresh token.
    pub fn register(&mut self, username: &str) -> Result<String, ChatError> {
        if self.by_username.contains_key(username) {
            return Err(ChatError::DuplicateUsername(username.to_string()));
        }

        let token = Uuid::new_v4().simple().to_string();
        self.by_token.insert(token.clone(), username.to_string());
        self.by_username.insert(username.to_string(), token.clone());
        Ok(token)
    }

    pub fn resolve(&self, token: &str) -> Result<&str, ChatError> {
        self.by_token
            .get(token)
            .map(String::as_str)
            .ok_or(ChatError::InvalidToken)
    }

    /// Remove the session behind `token`, returning its username.
    pub fn revoke(&mut self, token: &str) -> Result<String, ChatError> {
        let username = self.by_token.remove(token).ok_or(ChatError::InvalidToken)?;
        self.by_username.remove(&username);
        Ok(username)
    }

    pub fn find_token_by_username(&self, username: &str) -> Result<&str, ChatError> {
        self.by_username
            .get(username)
            .map(String::as_str)
            .ok_or_else(|| ChatError::TargetNotFound(username.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}
