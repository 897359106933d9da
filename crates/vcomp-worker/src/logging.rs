//! Structured job logging.

use tracing::{error, info, warn, Span};
use vcomp_models::{Action, JobId};

/// Job logger carrying the job id and action on every event.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    action: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, action: Action) -> Self {
        Self {
            job_id: job_id.to_string(),
            action: action.as_str().to_string(),
        }
    }

    /// Logger for a job whose action is not known yet.
    pub fn pending(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.to_string(),
            action: "unknown".to_string(),
        }
    }

    /// Same job, now with its action resolved.
    pub fn with_action(&self, action: Action) -> Self {
        Self {
            job_id: self.job_id.clone(),
            action: action.as_str().to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, action = %self.action, "Job started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, action = %self.action, "Job progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, action = %self.action, "Job warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, action = %self.action, "Job error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, action = %self.action, "Job completed: {}", message);
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, action = %self.action)
    }
}
