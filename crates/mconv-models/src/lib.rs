//! Shared data models for the media conversion server.
//!
//! This crate provides Serde-serializable types for:
//! - Job descriptors and their operation parameters
//! - Terminal job outcomes and output metadata
//! - Progress events and WebSocket message schemas

pub mod job;
pub mod operation;
pub mod outcome;
pub mod params;
pub mod progress;
pub mod resolution;
pub mod ws;

// Re-export common types
pub use job::{JobDescriptor, JobId, ANONYMOUS_REQUESTER};
pub use operation::{Operation, OperationParseError};
pub use outcome::{
    FailureKind, JobFailure, JobOutcome, JobSuccess, OutputFile, OutputMetadata, RemoteObject,
};
pub use params::{
    AnimatedImageOptions, AudioFormat, FormFields, JobParameters, ParameterError, ParameterResult,
    StreamingOptions, ThumbnailOptions, TrimRange, VideoOptions, WatermarkOptions,
    WatermarkPosition,
};
pub use progress::{ProgressData, ProgressEvent};
pub use resolution::{ResolutionPreset, ResolutionPresetError};
pub use ws::{WsMessage, WsMessageType};
