//! Administrator commands embedded in chat messages.

pub mod command;

pub use command::AdminCommand;
