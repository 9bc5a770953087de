//! # SongFlow Common Library
//!
//! Shared code for the SongFlow server:
//! - Phase state machine and voting-integrity engine (`flow`)
//! - Database initialization and schema (`db`)
//! - Configuration loading and root folder resolution
//! - Identity tokens and the admin password digest
//!
//! No HTTP framework dependencies live here; the server crate wraps these
//! operations with axum handlers.

pub mod config;
pub mod db;
pub mod error;
pub mod flow;
pub mod identity;
pub mod time;

pub use error::{Error, Result};
pub use identity::UserId;
