//! Error types for probing, planning and rendering.

use thiserror::Error;
use vcomp_models::{InvalidDuration, ValidationError};

use crate::assemble::EngineInvocation;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while turning a request into rendered media.
#[derive(Debug, Error)]
pub enum MediaError {
    /// A request parameter is malformed or out of range.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Media metadata could not be obtained or is unusable.
    #[error("Probe failed for {source_ref}: {message}")]
    ProbeFailed {
        source_ref: String,
        message: String,
        stderr: Option<String>,
    },

    /// Probed inputs make the requested composition impossible.
    #[error("Planning invariant violated: {0}")]
    PlanningInvariantViolation(String),

    /// The rendering engine rejected or failed on an assembled invocation.
    #[error("FFmpeg command failed: {message}")]
    EngineFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
        invocation: Option<Box<EngineInvocation>>,
    },

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a probe failure error.
    pub fn probe_failed(
        source_ref: impl Into<String>,
        message: impl Into<String>,
        stderr: Option<String>,
    ) -> Self {
        Self::ProbeFailed {
            source_ref: source_ref.into(),
            message: message.into(),
            stderr,
        }
    }

    /// Create a planning invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::PlanningInvariantViolation(message.into())
    }

    /// Create an engine failure error.
    pub fn engine_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EngineFailed {
            message: message.into(),
            stderr,
            exit_code,
            invocation: None,
        }
    }

    /// Attach the failing invocation to an engine failure.
    ///
    /// Other variants are returned unchanged.
    pub fn with_invocation(self, invocation: EngineInvocation) -> Self {
        match self {
            Self::EngineFailed {
                message,
                stderr,
                exit_code,
                ..
            } => Self::EngineFailed {
                message,
                stderr,
                exit_code,
                invocation: Some(Box::new(invocation)),
            },
            other => other,
        }
    }

    /// Stable category name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ProbeFailed { .. } => "probe_failure",
            Self::PlanningInvariantViolation(_) => "planning_invariant_violation",
            Self::EngineFailed { .. }
            | Self::FfmpegNotFound
            | Self::Cancelled
            | Self::Timeout(_) => "engine_failure",
            Self::FfprobeNotFound => "probe_failure",
            Self::Io(_) | Self::JsonParse(_) => "internal",
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProbeFailed { .. } | Self::Timeout(_))
    }
}

impl From<InvalidDuration> for MediaError {
    fn from(err: InvalidDuration) -> Self {
        let message = err.to_string();
        Self::probe_failed(err.source_ref, message, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        let validation: MediaError = ValidationError::missing("videoUrl").into();
        assert_eq!(validation.kind(), "validation");
        assert_eq!(validation.to_string(), "invalid videoUrl: is required");

        assert_eq!(
            MediaError::probe_failed("a.mp4", "no duration", None).kind(),
            "probe_failure"
        );
        assert_eq!(MediaError::invariant("too small").kind(), "planning_invariant_violation");
        assert_eq!(
            MediaError::engine_failed("exit 1", None, Some(1)).kind(),
            "engine_failure"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(MediaError::probe_failed("a.mp4", "timeout", None).is_retryable());
        assert!(MediaError::Timeout(30).is_retryable());
        assert!(!MediaError::invariant("bad").is_retryable());
        assert!(!MediaError::Cancelled.is_retryable());
    }

    #[test]
    fn test_invalid_duration_is_probe_failure() {
        let err: MediaError = vcomp_models::DurationInfo::try_new("a.mp4", -1.0)
            .unwrap_err()
            .into();
        assert!(matches!(err, MediaError::ProbeFailed { ref source_ref, .. } if source_ref == "a.mp4"));
    }
}
