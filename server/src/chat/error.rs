use thiserror::Error;

/// Errors surfaced to chat clients as `{is_ok: false, error_message}`.
///
/// The display strings are what clients see, so they are part of the wire
/// contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Connect with a username that already holds an active session.
    #[error("User with such name already exists.")]
    DuplicateUsername(String),

    /// Disconnect or send with a token that is unknown or already revoked.
    #[error("Token is not valid.")]
    InvalidToken,

    /// Admin kick naming a user with no active session.
    #[error("User <{0}> is not connected.")]
    TargetNotFound(String),
}
