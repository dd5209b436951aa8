//! Structured job logging utilities.

use mconv_models::{JobId, Operation};
use tracing::{error, info, warn, Span};

/// Job logger for structured logging with consistent formatting.
///
/// Every line carries the job ID and operation.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: Operation,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: Operation) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation,
        }
    }

    /// Log the start of a job.
    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    /// Log a step of the job.
    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    /// Log the completion of a job.
    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Span covering the whole job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}
