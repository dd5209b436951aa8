//! Where uploads and outputs live on disk, and how outputs are addressed.

use std::path::{Component, Path, PathBuf};

use mconv_models::{JobDescriptor, JobParameters};
use rand::Rng;

/// URL prefix outputs are served under.
pub const OUTPUTS_ROUTE: &str = "/outputs";

/// Extension used when the input has none.
const FALLBACK_EXTENSION: &str = "mp4";

/// Upload and output directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Create both directories if missing.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await
    }

    /// `<upload_dir>/<field>-<unix millis>-<random><ext>`, keeping the client's extension.
    pub fn upload_path(&self, field: &str, original_name: Option<&str>) -> PathBuf {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
        let ext = original_name
            .and_then(|name| Path::new(name).extension())
            .map(|e| e.to_string_lossy().to_string())
            .filter(|e| is_safe_extension(e))
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        self.upload_dir
            .join(format!("{}-{}-{}{}", field, millis, suffix, ext))
    }

    /// Output paths for a job, primary first.
    pub fn outputs_for(&self, job: &JobDescriptor) -> Vec<PathBuf> {
        let stem = job.input_stem();
        let named =
            |suffix: &str, ext: &str| self.output_dir.join(format!("{}-{}.{}", stem, suffix, ext));

        match job.parameters() {
            JobParameters::TranscodeVideo(opts) => vec![named("converted", &opts.format)],
            JobParameters::ExtractAudio { format } => vec![named("audio", format.extension())],
            JobParameters::GenerateThumbnail(opts) => (0..opts.timestamps.len())
                .map(|i| match i {
                    0 => named("thumbnail", "png"),
                    n => named(&format!("thumbnail-{}", n + 1), "png"),
                })
                .collect(),
            JobParameters::Trim(_) => vec![named("trimmed", &input_extension(job))],
            JobParameters::Watermark(_) => vec![named("watermarked", &input_extension(job))],
            JobParameters::Resize { preset } => vec![named(preset.as_str(), "mp4")],
            JobParameters::ToAnimatedImage(_) => vec![named("animated", "gif")],
            JobParameters::SegmentForStreaming(_) => {
                vec![self.output_dir.join("hls").join(&stem).join("output.m3u8")]
            }
            JobParameters::ProbeMetadata => Vec::new(),
        }
    }

    /// Public URL of a file under the output directory.
    pub fn url_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.output_dir).unwrap_or(path);
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        format!("{}/{}", OUTPUTS_ROUTE, segments.join("/"))
    }
}

fn input_extension(job: &JobDescriptor) -> String {
    job.input()
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .filter(|e| is_safe_extension(e))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

fn is_safe_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric())
}
