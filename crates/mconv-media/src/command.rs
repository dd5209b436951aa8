//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Lines of FFmpeg diagnostics kept for error reporting.
const STDERR_TAIL_LINES: usize = 20;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    /// Primary input file path
    input: PathBuf,
    /// Further inputs, e.g. a watermark image
    extra_inputs: Vec<PathBuf>,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before the primary -i)
    input_args: Vec<String>,
    /// Output arguments (after all inputs)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            extra_inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add a further input file after the primary one.
    pub fn extra_input(mut self, path: impl AsRef<Path>) -> Self {
        self.extra_inputs.push(path.as_ref().to_path_buf());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seek the primary input (before -i).
    pub fn seek(self, position: impl Into<String>) -> Self {
        self.input_arg("-ss").input_arg(position)
    }

    /// Limit output duration.
    pub fn duration(self, duration: impl Into<String>) -> Self {
        self.output_arg("-t").output_arg(duration)
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set video bitrate.
    pub fn video_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:v").output_arg(bitrate)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    /// Set output frame size (`WxH`).
    pub fn size(self, size: impl Into<String>) -> Self {
        self.output_arg("-s").output_arg(size)
    }

    /// Drop the video streams.
    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());
        args.push("-nostats".to_string());

        args.extend(self.input_args.clone());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        for extra in &self.extra_inputs {
            args.push("-i".to_string());
            args.push(extra.to_string_lossy().to_string());
        }

        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Full command line, for logs and `Started` events.
    pub fn command_line(&self) -> String {
        format!("ffmpeg {}", self.build_args().join(" "))
    }
}

/// Runner for FFmpeg commands with progress tracking.
///
/// The child is killed if the future driving it is dropped.
#[derive(Debug, Default, Clone)]
pub struct FfmpegRunner;

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self
    }

    /// Run an FFmpeg command, invoking `progress_callback` at each progress block.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &FfmpegCommand,
        mut progress_callback: F,
    ) -> MediaResult<()>
    where
        F: FnMut(FfmpegProgress) + Send,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("FFmpeg stderr was not captured", None, None))?;
        let mut reader = BufReader::new(stderr).lines();

        let mut current = FfmpegProgress::default();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        while let Some(line) = reader.next_line().await? {
            match parse_progress_line(&line, &mut current) {
                LineKind::Block(progress) => progress_callback(progress),
                LineKind::Field => {}
                LineKind::Diagnostic => {
                    trace!(line = %line, "ffmpeg");
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
        }

        let status = child.wait().await?;

        if status.success() {
            Ok(())
        } else {
            let stderr = Vec::from(tail).join("\n");
            Err(MediaError::ffmpeg_failed(
                format!("FFmpeg exited with status {}", status.code().unwrap_or(-1)),
                (!stderr.is_empty()).then_some(stderr),
                status.code(),
            ))
        }
    }
}

/// What one stderr line turned out to be.
#[derive(Debug, PartialEq)]
enum LineKind {
    /// `progress=` closed a block
    Block(FfmpegProgress),
    /// A `key=value` field of the current block
    Field,
    /// Anything else FFmpeg printed
    Diagnostic,
}

/// Parse a line from FFmpeg's `-progress` output.
fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> LineKind {
    let line = line.trim();

    let Some((key, value)) = line.split_once('=') else {
        return LineKind::Diagnostic;
    };
    let value = value.trim();

    match key {
        // Both are microseconds despite the name
        "out_time_us" | "out_time_ms" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "out_time" => {
            // Format: HH:MM:SS.microseconds
            current.out_time = value.to_string();
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "bitrate" => {
            // Format: "1234.5kbits/s" or "N/A"
            if let Some(kbps) = value.strip_suffix("kbits/s") {
                if let Ok(kbps) = kbps.trim().parse() {
                    current.bitrate_kbps = kbps;
                }
            }
        }
        "total_size" => {
            if let Ok(bytes) = value.parse() {
                current.total_size = bytes;
            }
        }
        "speed" => {
            // Format: "1.5x" or "N/A"
            if let Some(speed) = value.strip_suffix('x') {
                if let Ok(speed) = speed.trim().parse() {
                    current.speed = speed;
                }
            }
        }
        "progress" => {
            // "continue" or "end"
            if value == "end" {
                current.is_complete = true;
            }
            return LineKind::Block(current.clone());
        }
        k if k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') && !k.is_empty() => {}
        _ => return LineKind::Diagnostic,
    }

    LineKind::Field
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
