//! Named resolution presets for the resize operation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Resolution shorthand accepted by `/resize/video`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ResolutionPreset {
    #[serde(rename = "144p")]
    P144,
    #[serde(rename = "320p")]
    P320,
    #[serde(rename = "720p")]
    P720,
}

impl ResolutionPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPreset::P144 => "144p",
            ResolutionPreset::P320 => "320p",
            ResolutionPreset::P720 => "720p",
        }
    }

    /// Output frame size in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ResolutionPreset::P144 => (256, 144),
            ResolutionPreset::P320 => (480, 320),
            ResolutionPreset::P720 => (1280, 720),
        }
    }

    /// Target video bitrate in kbit/s.
    pub fn video_bitrate_kbps(&self) -> u32 {
        match self {
            ResolutionPreset::P144 => 200,
            ResolutionPreset::P320 => 500,
            ResolutionPreset::P720 => 2500,
        }
    }

    /// `WxH` form understood by FFmpeg's `-s`.
    pub fn size_arg(&self) -> String {
        let (w, h) = self.dimensions();
        format!("{}x{}", w, h)
    }
}

impl fmt::Display for ResolutionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResolutionPreset {
    type Err = ResolutionPresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "144p" => Ok(ResolutionPreset::P144),
            "320p" => Ok(ResolutionPreset::P320),
            "720p" => Ok(ResolutionPreset::P720),
            _ => Err(ResolutionPresetError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid resolution: {0}")]
pub struct ResolutionPresetError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_table() {
        assert_eq!("144p".parse::<ResolutionPreset>().unwrap().dimensions(), (256, 144));
        assert_eq!("320p".parse::<ResolutionPreset>().unwrap().video_bitrate_kbps(), 500);
        assert_eq!("720P".parse::<ResolutionPreset>().unwrap().size_arg(), "1280x720");
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let err = "999p".parse::<ResolutionPreset>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid resolution: 999p");
    }
}
