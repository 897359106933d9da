//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request file: {0}")]
    InvalidRequest(String),

    #[error("Media error: {0}")]
    Media(#[from] vcomp_media::MediaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Media(e) => e.is_retryable(),
            WorkerError::Io(_) => true,
            _ => false,
        }
    }

    /// Error category reported in logs and the process exit code.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::ConfigError(_) => "config",
            WorkerError::InvalidRequest(_) | WorkerError::Json(_) => "validation",
            WorkerError::Media(e) => e.kind(),
            WorkerError::Io(_) => "internal",
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            "validation" => 2,
            "probe_failure" => 3,
            "planning_invariant_violation" => 4,
            "engine_failure" => 5,
            "config" => 78,
            _ => 1,
        }
    }
}
