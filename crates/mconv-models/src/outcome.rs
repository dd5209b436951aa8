//! Terminal job outcomes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file the job wrote locally, with the URL it is served under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutputFile {
    pub path: PathBuf,
    pub url: String,
}

/// Where a successful output was copied in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RemoteObject {
    pub url: String,
    pub path: String,
}

/// Summary of an output file as reported by FFprobe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutputMetadata {
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Bits per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    /// Container name, e.g. `mov,mp4,m4a,3gp,3g2,mj2`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Operation-specific additions
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl OutputMetadata {
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

/// Successful terminal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobSuccess {
    /// Files written, primary output first; empty for probe-only jobs
    pub outputs: Vec<OutputFile>,
    pub remote: Option<RemoteObject>,
    pub metadata: OutputMetadata,
    /// Raw `{format, streams}` for probe-only jobs
    pub probe: Option<serde_json::Value>,
    pub elapsed_seconds: f64,
}

impl JobSuccess {
    pub fn primary_output(&self) -> Option<&OutputFile> {
        self.outputs.first()
    }
}

/// Which stage of the pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The transcoder exited non-zero or could not be driven
    Transcode,
    /// The output exists locally but could not be stored remotely
    Upload,
}

/// Failed terminal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobFailure {
    pub kind: FailureKind,
    /// Human-readable message passed through to clients
    pub diagnostic: String,
    /// Debug rendering of the underlying error, for logs only
    #[serde(skip)]
    pub cause: String,
    /// Local files that survived the failure (upload failures keep the output)
    pub outputs: Vec<OutputFile>,
}

/// Exactly one of these is produced per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Success(JobSuccess),
    Failure(JobFailure),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }

    pub fn failure(
        kind: FailureKind,
        diagnostic: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        JobOutcome::Failure(JobFailure {
            kind,
            diagnostic: diagnostic.into(),
            cause: cause.into(),
            outputs: Vec::new(),
        })
    }
}
