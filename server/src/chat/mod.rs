//! Chat hub core: session registry, shared action log and subscriber cursors.

pub mod api;
pub mod cursor;
pub mod error;
pub mod log;
pub mod registry;
pub mod service;

pub use error::ChatError;
pub use log::{Action, ActionKind, ActionLog};
pub use service::ChatService;
