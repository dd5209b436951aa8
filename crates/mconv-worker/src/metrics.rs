//! Job metrics.

use mconv_models::Operation;
use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_STARTED_TOTAL: &str = "mconv_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "mconv_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "mconv_jobs_failed_total";
    pub const TRANSCODE_DURATION_SECONDS: &str = "mconv_transcode_duration_seconds";
    pub const UPLOAD_DURATION_SECONDS: &str = "mconv_upload_duration_seconds";
}

pub fn record_job_started(operation: Operation) {
    counter!(names::JOBS_STARTED_TOTAL, "operation" => operation.as_str()).increment(1);
}

pub fn record_job_completed(operation: Operation) {
    counter!(names::JOBS_COMPLETED_TOTAL, "operation" => operation.as_str()).increment(1);
}

/// `stage` is `transcode` or `upload`.
pub fn record_job_failed(operation: Operation, stage: &'static str) {
    counter!(
        names::JOBS_FAILED_TOTAL,
        "operation" => operation.as_str(),
        "stage" => stage
    )
    .increment(1);
}

pub fn record_transcode_duration(operation: Operation, duration_secs: f64) {
    histogram!(names::TRANSCODE_DURATION_SECONDS, "operation" => operation.as_str())
        .record(duration_secs);
}

pub fn record_upload_duration(duration_secs: f64) {
    histogram!(names::UPLOAD_DURATION_SECONDS).record(duration_secs);
}
