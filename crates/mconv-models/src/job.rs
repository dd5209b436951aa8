//! Job descriptors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::operation::Operation;
use crate::params::JobParameters;

/// Requester identity used when the client sends none.
pub const ANONYMOUS_REQUESTER: &str = "anonymous";

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable record of one accepted conversion request.
///
/// Fields are private; once built a descriptor is only read.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobDescriptor {
    id: JobId,
    input: PathBuf,
    /// Stored upload name, used to tag progress events
    file_id: String,
    /// Name the client gave the upload
    original_name: Option<String>,
    parameters: JobParameters,
    requester_id: String,
    wants_remote_upload: bool,
}

impl JobDescriptor {
    /// Create a descriptor for an uploaded input file.
    pub fn new(input: impl Into<PathBuf>, parameters: JobParameters) -> Self {
        let input = input.into();
        let file_id = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id: JobId::new(),
            input,
            file_id,
            original_name: None,
            parameters,
            requester_id: ANONYMOUS_REQUESTER.to_string(),
            wants_remote_upload: false,
        }
    }

    /// Set the requester; blank identities stay anonymous.
    pub fn with_requester(mut self, requester_id: Option<&str>) -> Self {
        if let Some(id) = requester_id.map(str::trim).filter(|id| !id.is_empty()) {
            self.requester_id = id.to_string();
        }
        self
    }

    pub fn with_remote_upload(mut self, wants_remote_upload: bool) -> Self {
        self.wants_remote_upload = wants_remote_upload;
        self
    }

    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn operation(&self) -> Operation {
        self.parameters.operation()
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    pub fn parameters(&self) -> &JobParameters {
        &self.parameters
    }

    pub fn requester_id(&self) -> &str {
        &self.requester_id
    }

    pub fn wants_remote_upload(&self) -> bool {
        self.wants_remote_upload
    }

    /// Input file name without extension.
    pub fn input_stem(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.id.to_string())
    }
}
