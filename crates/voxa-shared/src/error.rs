//! Error types for Voxa clients.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxaError {
    #[error("Voxa daemon not reachable at {0}. Start it with `voxad`.")]
    DaemonNotRunning(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Daemon returned {status}: {message}")]
    Daemon { status: u16, message: String },

    #[error("Voice capture error: {0}")]
    Capture(String),

    #[error("Speech output error: {0}")]
    Speech(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VoxaError {
    /// Process exit code for voxactl
    pub fn exit_code(&self) -> i32 {
        match self {
            VoxaError::DaemonNotRunning(_) => 2,
            VoxaError::Http(_) => 3,
            VoxaError::Daemon { .. } => 4,
            VoxaError::Capture(_) => 5,
            VoxaError::Speech(_) => 6,
            VoxaError::Io(_) => 7,
            VoxaError::Json(_) => 8,
        }
    }
}
