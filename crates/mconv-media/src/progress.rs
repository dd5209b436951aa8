//! FFmpeg progress parsing.

use mconv_models::ProgressData;
use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output bitrate in kbit/s
    pub bitrate_kbps: f64,
    /// Bytes written so far
    pub total_size: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Calculate progress percentage given total duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).clamp(0.0, 100.0)
    }

    /// Timemark in `HH:MM:SS.ss` form.
    pub fn timemark(&self) -> String {
        // FFmpeg prints microseconds; clients expect centiseconds
        match self.out_time.split_once('.') {
            Some((clock, frac)) if !clock.starts_with('-') => {
                let centis: String = frac.chars().take(2).collect();
                format!("{}.{:0<2}", clock, centis)
            }
            _ if self.out_time.is_empty() || self.out_time.starts_with('-') => {
                "00:00:00.00".to_string()
            }
            _ => self.out_time.clone(),
        }
    }

    /// Convert to the client-facing snapshot with the given overall percent.
    pub fn to_progress_data(&self, percent: f64) -> ProgressData {
        ProgressData {
            frames: self.frame,
            current_fps: self.fps,
            current_kbps: self.bitrate_kbps,
            target_size: self.total_size / 1024,
            timemark: self.timemark(),
            percent,
        }
    }
}
