//! Application state.

use std::sync::Arc;

use mconv_media::{check_ffmpeg, FfmpegTranscoder, Transcoder};
use mconv_storage::{ObjectStoreClient, StorageUploader};
use mconv_worker::{CleanupScheduler, JobRunner, OutputLayout, ProgressBroadcast};
use tracing::{info, warn};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub broadcast: ProgressBroadcast,
    pub runner: JobRunner,
    pub cleanup: CleanupScheduler,
}

impl AppState {
    /// Create application state backed by FFmpeg and, when configured, object storage.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = check_ffmpeg() {
            warn!("{}; conversions will fail until it is installed", e);
        }

        let uploader: Option<Arc<dyn StorageUploader>> = match ObjectStoreClient::from_env() {
            Ok(client) => {
                info!(bucket = client.bucket(), "Remote upload enabled");
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!("Remote upload disabled: {}", e);
                None
            }
        };

        let state = Self::with_parts(config, Arc::new(FfmpegTranscoder::new()), uploader);
        state.layout().ensure_dirs().await?;
        Ok(state)
    }

    /// Assemble state from explicit parts.
    pub fn with_parts(
        config: ApiConfig,
        transcoder: Arc<dyn Transcoder>,
        uploader: Option<Arc<dyn StorageUploader>>,
    ) -> Self {
        let broadcast = ProgressBroadcast::new();
        let layout = OutputLayout::new(config.upload_dir.clone(), config.output_dir.clone());
        let runner = JobRunner::new(transcoder, broadcast.clone(), layout).with_uploader(uploader);
        let cleanup = CleanupScheduler::new(config.cleanup_grace);

        Self {
            config,
            broadcast,
            runner,
            cleanup,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        self.runner.layout()
    }
}
