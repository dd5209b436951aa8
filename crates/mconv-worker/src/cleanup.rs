//! Deferred removal of job files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mconv_models::{JobDescriptor, JobOutcome, JobParameters};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default delay between a job's outcome and removal of its files.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(300);

/// Removes job files after a grace period. Failures are logged, never raised.
#[derive(Debug, Clone)]
pub struct CleanupScheduler {
    grace: Duration,
}

impl Default for CleanupScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}

impl CleanupScheduler {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    /// Remove `paths` once the grace period has elapsed.
    pub fn schedule(&self, paths: Vec<PathBuf>) -> JoinHandle<()> {
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            remove_all(&paths).await;
        })
    }

    /// Remove `paths` right away.
    pub async fn remove_now(&self, paths: &[PathBuf]) {
        remove_all(paths).await;
    }

    /// Schedule removal of everything a finished job leaves behind.
    pub fn schedule_for(&self, job: &JobDescriptor, outcome: &JobOutcome) -> JoinHandle<()> {
        self.schedule(paths_to_clean(job, outcome))
    }
}

/// Files to remove after a job: its inputs always, its outputs only once they
/// are safely stored remotely.
pub fn paths_to_clean(job: &JobDescriptor, outcome: &JobOutcome) -> Vec<PathBuf> {
    let mut paths = vec![job.input().to_path_buf()];
    if let JobParameters::Watermark(opts) = job.parameters() {
        paths.push(opts.overlay.clone());
    }
    if let JobOutcome::Success(success) = outcome {
        if success.remote.is_some() {
            paths.extend(success.outputs.iter().map(|o| o.path.clone()));
        }
    }
    paths
}

async fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        remove_path(path).await;
    }
}

async fn remove_path(path: &Path) {
    let result = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => debug!(path = %path.display(), "Removed job file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Job file already gone")
        }
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove job file"),
    }
}
