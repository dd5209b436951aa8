//! FFprobe media information.

use mconv_models::OutputMetadata;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// FFprobe's `-show_format -show_streams` report, kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaProbe {
    #[serde(default)]
    pub format: Map<String, Value>,
    #[serde(default)]
    pub streams: Vec<Value>,
}

impl MediaProbe {
    /// Parse FFprobe's JSON output.
    pub fn from_json(bytes: &[u8]) -> MediaResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Duration in seconds.
    pub fn duration(&self) -> Option<f64> {
        self.format_number("duration")
            .filter(|d| d.is_finite() && *d >= 0.0)
    }

    /// Size in bytes.
    pub fn size(&self) -> Option<u64> {
        self.format_number("size").map(|s| s as u64)
    }

    /// Overall bitrate in bits per second.
    pub fn bitrate(&self) -> Option<u64> {
        self.format_number("bit_rate").map(|b| b as u64)
    }

    /// Container name, e.g. `mov,mp4,m4a,3gp,3g2,mj2`.
    pub fn format_name(&self) -> Option<String> {
        self.format
            .get("format_name")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Summary used in conversion responses.
    pub fn summary(&self) -> OutputMetadata {
        OutputMetadata {
            duration: self.duration(),
            size: self.size(),
            bitrate: self.bitrate(),
            format: self.format_name(),
            extras: Map::new(),
        }
    }

    /// The report without the server-side file path.
    pub fn without_path(mut self) -> Self {
        self.format.remove("filename");
        self
    }

    /// `{format, streams}` as sent to clients.
    pub fn into_json(self) -> Value {
        serde_json::json!({
            "format": Value::Object(self.format),
            "streams": Value::Array(self.streams),
        })
    }

    /// FFprobe prints numbers as strings; accept either.
    fn format_number(&self, key: &str) -> Option<f64> {
        match self.format.get(key)? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

/// Probe a media file.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaProbe> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    MediaProbe::from_json(&output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "h264", "codec_type": "video", "width": 1280, "height": 720},
            {"index": 1, "codec_name": "aac", "codec_type": "audio", "sample_rate": "44100"}
        ],
        "format": {
            "filename": "/srv/uploads/video-1700000000000-1.mp4",
            "nb_streams": 2,
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
            "duration": "12.480000",
            "size": "1048576",
            "bit_rate": "672164"
        }
    }"#;

    #[test]
    fn test_summary_fields() {
        let probe = MediaProbe::from_json(SAMPLE.as_bytes()).unwrap();
        let summary = probe.summary();

        assert!((summary.duration.unwrap() - 12.48).abs() < 1e-9);
        assert_eq!(summary.size, Some(1048576));
        assert_eq!(summary.bitrate, Some(672164));
        assert_eq!(summary.format.as_deref(), Some("mov,mp4,m4a,3gp,3g2,mj2"));
    }

    #[test]
    fn test_without_path_hides_filename() {
        let probe = MediaProbe::from_json(SAMPLE.as_bytes()).unwrap().without_path();
        let json = probe.into_json();

        assert!(json["format"].get("filename").is_none());
        assert_eq!(json["format"]["nb_streams"], 2);
        assert_eq!(json["streams"].as_array().unwrap().len(), 2);
        assert_eq!(json["streams"][1]["codec_type"], "audio");
    }

    #[test]
    fn test_missing_values() {
        let probe = MediaProbe::from_json(br#"{"format": {"duration": "N/A"}}"#).unwrap();
        assert_eq!(probe.duration(), None);
        assert_eq!(probe.size(), None);
        assert!(probe.streams.is_empty());
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let result = probe_media("/definitely/not/here.mp4").await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
