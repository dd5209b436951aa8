//! FFmpeg CLI wrapper for media conversion jobs.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Per-operation command plans
//! - FFprobe inspection
//! - The [`Transcoder`] capability the job runner drives

pub mod command;
pub mod error;
pub mod filters;
pub mod plan;
pub mod probe;
pub mod progress;
pub mod thumbnail;
pub mod transcoder;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use plan::TranscodePlan;
pub use probe::{probe_media, MediaProbe};
pub use progress::FfmpegProgress;
pub use transcoder::{events, FfmpegTranscoder, TranscodeEvent, TranscodeStream, Transcoder};
