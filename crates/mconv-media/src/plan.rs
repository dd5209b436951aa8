//! Per-operation FFmpeg invocations.
//!
//! A plan is the ordered list of commands one job runs. Most operations need
//! a single command; thumbnails run one per timestamp. Progress across steps
//! is weighted equally.

use std::path::PathBuf;

use mconv_models::{JobDescriptor, JobParameters};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::filters::{animated_gif_filter, overlay_filter};
use crate::progress::FfmpegProgress;
use crate::thumbnail::{parse_time, resolve_timestamp};

/// Ordered FFmpeg commands for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodePlan {
    steps: Vec<FfmpegCommand>,
    /// Expected output duration of each step, for percent calculation
    expected_duration_ms: Option<i64>,
}

impl TranscodePlan {
    /// Build the plan for `job`, writing to `outputs` in order.
    ///
    /// `input_duration` is the probed input length in seconds, when known.
    pub fn build(
        job: &JobDescriptor,
        outputs: &[PathBuf],
        input_duration: Option<f64>,
    ) -> MediaResult<Self> {
        let input = job.input();
        let expected_outputs = match job.parameters() {
            JobParameters::GenerateThumbnail(opts) => opts.timestamps.len(),
            JobParameters::ProbeMetadata => 0,
            _ => 1,
        };
        if outputs.len() != expected_outputs {
            return Err(MediaError::invalid_plan(format!(
                "{} expects {} output path(s), got {}",
                job.operation(),
                expected_outputs,
                outputs.len()
            )));
        }

        let mut expected = input_duration;
        let steps = match job.parameters() {
            JobParameters::TranscodeVideo(opts) => {
                let mut cmd = FfmpegCommand::new(input, &outputs[0]);
                if let Some(codec) = &opts.video_codec {
                    cmd = cmd.video_codec(codec);
                }
                if let Some(codec) = &opts.audio_codec {
                    cmd = cmd.audio_codec(codec);
                }
                if let Some(bitrate) = &opts.video_bitrate {
                    cmd = cmd.video_bitrate(bitrate);
                }
                if let Some(bitrate) = &opts.audio_bitrate {
                    cmd = cmd.audio_bitrate(bitrate);
                }
                if let Some(fps) = opts.fps {
                    cmd = cmd.frame_rate(fps);
                }
                if let Some(size) = &opts.resolution {
                    cmd = cmd.size(size);
                }
                if let Some(preset) = &opts.preset {
                    cmd = cmd.preset(preset);
                }
                if let Some(crf) = opts.crf {
                    cmd = cmd.crf(crf);
                }
                vec![cmd]
            }
            JobParameters::ExtractAudio { format } => vec![FfmpegCommand::new(input, &outputs[0])
                .no_video()
                .audio_codec(format.codec())],
            JobParameters::GenerateThumbnail(opts) => {
                expected = None;
                opts.timestamps
                    .iter()
                    .zip(outputs)
                    .map(|(timestamp, output)| {
                        FfmpegCommand::new(input, output)
                            .seek(resolve_timestamp(timestamp, input_duration))
                            .single_frame()
                            .size(&opts.size)
                    })
                    .collect()
            }
            JobParameters::Trim(range) => {
                expected = min_known(parse_time(&range.duration), input_duration);
                vec![FfmpegCommand::new(input, &outputs[0])
                    .seek(&range.start_time)
                    .duration(&range.duration)]
            }
            JobParameters::Watermark(opts) => vec![FfmpegCommand::new(input, &outputs[0])
                .extra_input(&opts.overlay)
                .filter_complex(overlay_filter(opts.position))],
            JobParameters::Resize { preset } => vec![FfmpegCommand::new(input, &outputs[0])
                .size(preset.size_arg())
                .video_bitrate(format!("{}k", preset.video_bitrate_kbps()))],
            JobParameters::ToAnimatedImage(opts) => {
                expected = min_known(Some(opts.duration), input_duration);
                vec![FfmpegCommand::new(input, &outputs[0])
                    .duration(format_seconds(opts.duration))
                    .filter_complex(animated_gif_filter(opts.fps, opts.scale))
                    .output_args(["-loop", "0"])]
            }
            JobParameters::SegmentForStreaming(opts) => {
                vec![FfmpegCommand::new(input, &outputs[0]).output_args([
                    "-codec".to_string(),
                    "copy".to_string(),
                    "-start_number".to_string(),
                    "0".to_string(),
                    "-hls_time".to_string(),
                    opts.segment_duration.to_string(),
                    "-hls_list_size".to_string(),
                    "0".to_string(),
                    "-f".to_string(),
                    "hls".to_string(),
                ])]
            }
            JobParameters::ProbeMetadata => Vec::new(),
        };

        Ok(Self {
            steps,
            expected_duration_ms: expected.map(|secs| (secs * 1000.0).round() as i64),
        })
    }

    pub fn steps(&self) -> &[FfmpegCommand] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn expected_duration_ms(&self) -> Option<i64> {
        self.expected_duration_ms
    }

    /// Whole-job percent while step `index` reports `progress`.
    pub fn overall_percent(&self, index: usize, progress: &FfmpegProgress) -> f64 {
        if self.steps.is_empty() {
            return 100.0;
        }
        let step = progress.percentage(self.expected_duration_ms.unwrap_or(0));
        let total = self.steps.len() as f64;
        ((index as f64 * 100.0 + step) / total).clamp(0.0, 100.0)
    }
}

fn min_known(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Seconds without a trailing `.0` for whole values.
fn format_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        secs.to_string()
    }
}
