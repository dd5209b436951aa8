//! Conversion operation kinds.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of work a job performs on its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Re-encode into another container/codec
    TranscodeVideo,
    /// Drop video, keep the audio track
    ExtractAudio,
    /// Grab still frames at given timestamps
    GenerateThumbnail,
    /// Cut a time range
    Trim,
    /// Overlay a second image onto the video
    Watermark,
    /// Scale to a named resolution preset
    Resize,
    /// Palette-optimized animated GIF
    ToAnimatedImage,
    /// HLS playlist + segments
    SegmentForStreaming,
    /// FFprobe only, no output file
    ProbeMetadata,
}

impl Operation {
    pub const ALL: &'static [Operation] = &[
        Operation::TranscodeVideo,
        Operation::ExtractAudio,
        Operation::GenerateThumbnail,
        Operation::Trim,
        Operation::Watermark,
        Operation::Resize,
        Operation::ToAnimatedImage,
        Operation::SegmentForStreaming,
        Operation::ProbeMetadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::TranscodeVideo => "transcode-video",
            Operation::ExtractAudio => "extract-audio",
            Operation::GenerateThumbnail => "generate-thumbnail",
            Operation::Trim => "trim",
            Operation::Watermark => "watermark",
            Operation::Resize => "resize",
            Operation::ToAnimatedImage => "to-animated-image",
            Operation::SegmentForStreaming => "segment-for-streaming",
            Operation::ProbeMetadata => "probe-metadata",
        }
    }

    /// Summary used in the `error` field of failure responses.
    pub fn failure_summary(&self) -> &'static str {
        match self {
            Operation::TranscodeVideo => "Conversion failed",
            Operation::ExtractAudio => "Audio extraction failed",
            Operation::GenerateThumbnail => "Thumbnail generation failed",
            Operation::Trim => "Video trimming failed",
            Operation::Watermark => "Watermark failed",
            Operation::Resize => "Resize failed",
            Operation::ToAnimatedImage => "GIF conversion failed",
            Operation::SegmentForStreaming => "HLS conversion failed",
            Operation::ProbeMetadata => "Metadata extraction failed",
        }
    }

    /// Whether the operation runs the transcoder at all.
    pub fn produces_output(&self) -> bool {
        !matches!(self, Operation::ProbeMetadata)
    }

    /// Whether the input needs a second uploaded file.
    pub fn requires_overlay_input(&self) -> bool {
        matches!(self, Operation::Watermark)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = OperationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == lower)
            .ok_or_else(|| OperationParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown operation: {0}")]
pub struct OperationParseError(String);
