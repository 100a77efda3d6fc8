//! Chat hub server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod chat;
pub mod config;
pub mod moderation;
pub mod proto;
pub mod routes;
pub mod sink;
pub mod state;
pub mod ws;
