//! Progress events relayed to WebSocket observers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// Tool progress snapshot, in the shape clients already parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    /// Frames encoded so far
    pub frames: u64,
    pub current_fps: f64,
    /// Output bitrate in kbit/s
    pub current_kbps: f64,
    /// Output size so far in kB
    pub target_size: u64,
    /// Output position as `HH:MM:SS.ss`
    pub timemark: String,
    /// 0-100, never decreasing within a job
    pub percent: f64,
}

/// One progress signal from a running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    pub job_id: JobId,
    /// Stored upload name observers filter on
    pub filename: String,
    pub data: ProgressData,
}

impl ProgressEvent {
    pub fn new(job_id: JobId, filename: impl Into<String>, data: ProgressData) -> Self {
        Self {
            job_id,
            filename: filename.into(),
            data,
        }
    }
}
