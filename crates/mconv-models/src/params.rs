//! Operation parameters parsed from multipart form fields.
//!
//! Parsing is lenient: unrecognized fields are ignored and
//! malformed numbers fall back to the operation default instead of failing
//! the request. Only genuinely required fields (trim range, resize preset,
//! watermark image) produce errors.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::operation::Operation;
use crate::resolution::ResolutionPreset;

/// Text fields of a multipart request, keyed by field name.
pub type FormFields = HashMap<String, String>;

/// Result type for parameter parsing.
pub type ParameterResult<T> = Result<T, ParameterError>;

/// Parameter validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("Missing required parameter: {0}")]
    Missing(&'static str),

    #[error("Missing required file: {0}")]
    MissingFile(&'static str),

    #[error("Invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl ParameterError {
    /// Short summary for the `error` field of a response.
    pub fn summary(&self) -> String {
        match self {
            ParameterError::Missing(name) => format!("Missing required parameter: {}", name),
            ParameterError::MissingFile(name) => format!("No {} file provided", name),
            ParameterError::Invalid { name, .. } => format!("Invalid {}", name),
        }
    }
}

/// Options for `transcode-video`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoOptions {
    pub format: String,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Explicit `WxH` frame size
    pub resolution: Option<String>,
    pub fps: Option<u32>,
    pub video_bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
    pub preset: Option<String>,
    pub crf: Option<u8>,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            format: DEFAULT_VIDEO_FORMAT.to_string(),
            video_codec: None,
            audio_codec: None,
            resolution: None,
            fps: None,
            video_bitrate: None,
            audio_bitrate: None,
            preset: None,
            crf: None,
        }
    }
}

/// Audio container for `extract-audio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Aac,
    Wav,
    Flac,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Aac => "aac",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }

    /// FFmpeg encoder for this container.
    pub fn codec(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::Aac => "aac",
            AudioFormat::Wav => "pcm_s16le",
            AudioFormat::Flac => "flac",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "aac" => Ok(AudioFormat::Aac),
            "wav" => Ok(AudioFormat::Wav),
            "flac" => Ok(AudioFormat::Flac),
            _ => Err(()),
        }
    }
}

/// Options for `generate-thumbnail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThumbnailOptions {
    /// Seconds (`"12.5"`), clock form (`"00:00:12"`) or percent of duration (`"50%"`)
    pub timestamps: Vec<String>,
    /// `WxH` frame size
    pub size: String,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            timestamps: vec!["50%".to_string()],
            size: "320x240".to_string(),
        }
    }
}

/// Time range for `trim`, passed through to FFmpeg untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrimRange {
    pub start_time: String,
    pub duration: String,
}

/// Corner for the watermark overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl WatermarkPosition {
    /// `overlay=` coordinates keeping a 10px margin.
    pub fn overlay_expr(&self) -> &'static str {
        match self {
            WatermarkPosition::TopLeft => "10:10",
            WatermarkPosition::TopRight => "main_w-overlay_w-10:10",
            WatermarkPosition::BottomLeft => "10:main_h-overlay_h-10",
            WatermarkPosition::BottomRight => "main_w-overlay_w-10:main_h-overlay_h-10",
        }
    }
}

impl FromStr for WatermarkPosition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "topleft" => Ok(WatermarkPosition::TopLeft),
            "topright" => Ok(WatermarkPosition::TopRight),
            "bottomleft" => Ok(WatermarkPosition::BottomLeft),
            "bottomright" => Ok(WatermarkPosition::BottomRight),
            _ => Err(()),
        }
    }
}

/// Options for `watermark`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WatermarkOptions {
    /// Uploaded overlay image
    pub overlay: PathBuf,
    pub position: WatermarkPosition,
}

/// Options for `to-animated-image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnimatedImageOptions {
    pub fps: u32,
    /// Output width; height follows the aspect ratio
    pub scale: u32,
    /// Seconds of input to convert
    pub duration: f64,
}

impl Default for AnimatedImageOptions {
    fn default() -> Self {
        Self {
            fps: 10,
            scale: 320,
            duration: 10.0,
        }
    }
}

/// Options for `segment-for-streaming`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StreamingOptions {
    pub segment_duration: u32,
}

impl Default for StreamingOptions {
    fn default() -> Self {
        Self { segment_duration: 10 }
    }
}

/// Validated, operation-specific parameters of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum JobParameters {
    TranscodeVideo(VideoOptions),
    ExtractAudio { format: AudioFormat },
    GenerateThumbnail(ThumbnailOptions),
    Trim(TrimRange),
    Watermark(WatermarkOptions),
    Resize { preset: ResolutionPreset },
    ToAnimatedImage(AnimatedImageOptions),
    SegmentForStreaming(StreamingOptions),
    ProbeMetadata,
}

const DEFAULT_VIDEO_FORMAT: &str = "mp4";

impl JobParameters {
    /// Build parameters for `operation` from raw form fields.
    ///
    /// `overlay` is the second uploaded file, only consulted for watermarking.
    pub fn from_fields(
        operation: Operation,
        fields: &FormFields,
        overlay: Option<PathBuf>,
    ) -> ParameterResult<Self> {
        let params = match operation {
            Operation::TranscodeVideo => JobParameters::TranscodeVideo(VideoOptions {
                format: text(fields, "format")
                    .filter(|f| is_safe_extension(f))
                    .unwrap_or_else(|| DEFAULT_VIDEO_FORMAT.to_string()),
                video_codec: text(fields, "videoCodec"),
                audio_codec: text(fields, "audioCodec"),
                resolution: text(fields, "resolution"),
                fps: positive(fields, "fps"),
                video_bitrate: text(fields, "videoBitrate"),
                audio_bitrate: text(fields, "audioBitrate"),
                preset: text(fields, "preset"),
                crf: lenient::<u8>(fields, "crf").filter(|crf| (1..=51).contains(crf)),
            }),
            Operation::ExtractAudio => JobParameters::ExtractAudio {
                format: text(fields, "format")
                    .and_then(|f| f.parse().ok())
                    .unwrap_or_default(),
            },
            Operation::GenerateThumbnail => {
                let defaults = ThumbnailOptions::default();
                let timestamps: Vec<String> = text(fields, "timestamps")
                    .map(|raw| {
                        raw.split(',')
                            .map(|t| t.trim().to_string())
                            .filter(|t| !t.is_empty())
                            .collect()
                    })
                    .unwrap_or_default();
                JobParameters::GenerateThumbnail(ThumbnailOptions {
                    timestamps: if timestamps.is_empty() {
                        defaults.timestamps
                    } else {
                        timestamps
                    },
                    size: text(fields, "size").unwrap_or(defaults.size),
                })
            }
            Operation::Trim => JobParameters::Trim(TrimRange {
                start_time: text(fields, "startTime").ok_or(ParameterError::Missing("startTime"))?,
                duration: text(fields, "duration").ok_or(ParameterError::Missing("duration"))?,
            }),
            Operation::Watermark => JobParameters::Watermark(WatermarkOptions {
                overlay: overlay.ok_or(ParameterError::MissingFile("watermark"))?,
                position: text(fields, "position")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_default(),
            }),
            Operation::Resize => {
                let raw = text(fields, "resolution").ok_or(ParameterError::Missing("resolution"))?;
                let preset = raw.parse().map_err(|_| ParameterError::Invalid {
                    name: "resolution",
                    value: raw.clone(),
                })?;
                JobParameters::Resize { preset }
            }
            Operation::ToAnimatedImage => {
                let defaults = AnimatedImageOptions::default();
                JobParameters::ToAnimatedImage(AnimatedImageOptions {
                    fps: positive(fields, "fps").unwrap_or(defaults.fps),
                    scale: positive(fields, "scale").unwrap_or(defaults.scale),
                    duration: lenient::<f64>(fields, "duration")
                        .filter(|d| d.is_finite() && *d > 0.0)
                        .unwrap_or(defaults.duration),
                })
            }
            Operation::SegmentForStreaming => JobParameters::SegmentForStreaming(StreamingOptions {
                segment_duration: positive(fields, "segmentDuration")
                    .unwrap_or(StreamingOptions::default().segment_duration),
            }),
            Operation::ProbeMetadata => JobParameters::ProbeMetadata,
        };
        Ok(params)
    }

    /// The operation these parameters belong to.
    pub fn operation(&self) -> Operation {
        match self {
            JobParameters::TranscodeVideo(_) => Operation::TranscodeVideo,
            JobParameters::ExtractAudio { .. } => Operation::ExtractAudio,
            JobParameters::GenerateThumbnail(_) => Operation::GenerateThumbnail,
            JobParameters::Trim(_) => Operation::Trim,
            JobParameters::Watermark(_) => Operation::Watermark,
            JobParameters::Resize { .. } => Operation::Resize,
            JobParameters::ToAnimatedImage(_) => Operation::ToAnimatedImage,
            JobParameters::SegmentForStreaming(_) => Operation::SegmentForStreaming,
            JobParameters::ProbeMetadata => Operation::ProbeMetadata,
        }
    }
}

/// Non-empty trimmed text field.
fn text(fields: &FormFields, name: &str) -> Option<String> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parsed field, or `None` when absent or malformed.
fn lenient<T: FromStr>(fields: &FormFields, name: &str) -> Option<T> {
    text(fields, name).and_then(|v| v.parse().ok())
}

fn positive(fields: &FormFields, name: &str) -> Option<u32> {
    lenient::<u32>(fields, name).filter(|v| *v > 0)
}

/// Output formats end up in file names, so keep them to a bare extension.
fn is_safe_extension(format: &str) -> bool {
    format.len() <= 10 && format.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_transcode_defaults_and_lenient_numbers() {
        let params = JobParameters::from_fields(
            Operation::TranscodeVideo,
            &fields(&[("fps", "ten"), ("crf", "23"), ("unknownOption", "x")]),
            None,
        )
        .unwrap();

        match params {
            JobParameters::TranscodeVideo(opts) => {
                assert_eq!(opts.format, "mp4");
                assert_eq!(opts.fps, None);
                assert_eq!(opts.crf, Some(23));
            }
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_transcode_rejects_path_like_format() {
        let params = JobParameters::from_fields(
            Operation::TranscodeVideo,
            &fields(&[("format", "../../etc")]),
            None,
        )
        .unwrap();
        assert!(matches!(params, JobParameters::TranscodeVideo(ref o) if o.format == "mp4"));
    }

    #[test]
    fn test_trim_requires_both_fields() {
        let err = JobParameters::from_fields(
            Operation::Trim,
            &fields(&[("startTime", "00:00:01")]),
            None,
        )
        .unwrap_err();
        assert_eq!(err, ParameterError::Missing("duration"));
        assert!(err.summary().contains("duration"));

        let err = JobParameters::from_fields(Operation::Trim, &fields(&[("duration", "5")]), None)
            .unwrap_err();
        assert_eq!(err, ParameterError::Missing("startTime"));
    }

    #[test]
    fn test_resize_invalid_preset() {
        let err = JobParameters::from_fields(
            Operation::Resize,
            &fields(&[("resolution", "999p")]),
            None,
        )
        .unwrap_err();
        assert_eq!(err.summary(), "Invalid resolution");
    }

    #[test]
    fn test_gif_defaults_on_garbage() {
        let params = JobParameters::from_fields(
            Operation::ToAnimatedImage,
            &fields(&[("fps", "-3"), ("scale", "abc"), ("duration", "4.5")]),
            None,
        )
        .unwrap();
        assert_eq!(
            params,
            JobParameters::ToAnimatedImage(AnimatedImageOptions {
                fps: 10,
                scale: 320,
                duration: 4.5,
            })
        );
    }

    #[test]
    fn test_thumbnail_timestamps_split() {
        let params = JobParameters::from_fields(
            Operation::GenerateThumbnail,
            &fields(&[("timestamps", "10%, 2.5,,")]),
            None,
        )
        .unwrap();
        match params {
            JobParameters::GenerateThumbnail(opts) => {
                assert_eq!(opts.timestamps, vec!["10%", "2.5"]);
                assert_eq!(opts.size, "320x240");
            }
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_watermark_needs_overlay_file() {
        let err = JobParameters::from_fields(Operation::Watermark, &FormFields::new(), None)
            .unwrap_err();
        assert_eq!(err, ParameterError::MissingFile("watermark"));

        let params = JobParameters::from_fields(
            Operation::Watermark,
            &fields(&[("position", "sideways")]),
            Some(PathBuf::from("uploads/logo.png")),
        )
        .unwrap();
        assert!(matches!(
            params,
            JobParameters::Watermark(WatermarkOptions {
                position: WatermarkPosition::BottomRight,
                ..
            })
        ));
    }

    #[test]
    fn test_audio_format_fallback() {
        let params =
            JobParameters::from_fields(Operation::ExtractAudio, &fields(&[("format", "ogg")]), None)
                .unwrap();
        assert_eq!(params, JobParameters::ExtractAudio { format: AudioFormat::Mp3 });
        assert_eq!(params.operation(), Operation::ExtractAudio);
    }
}
