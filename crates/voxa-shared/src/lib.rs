//! Shared types and utilities for Voxa components.
//!
//! Wire types exchanged between voxad and voxactl, plus the client-side
//! error type.

pub mod error;
pub mod response;
pub mod rpc;

pub use error::VoxaError;
pub use response::{Action, CommandResponse};

/// Port voxad listens on unless configured otherwise
pub const DEFAULT_PORT: u16 = 7878;

/// Base URL voxactl talks to unless configured otherwise
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:7878";

/// Crate version shared by every Voxa binary
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
