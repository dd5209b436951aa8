//! The transcoding capability used by job runners.
//!
//! A transcoder turns a job into a stream of events. The stream always ends
//! with exactly one [`TranscodeEvent::Finished`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use mconv_models::{JobDescriptor, ProgressData};
use tokio::sync::mpsc;
use tracing::debug;

use crate::command::FfmpegRunner;
use crate::error::{MediaError, MediaResult};
use crate::plan::TranscodePlan;
use crate::probe::{probe_media, MediaProbe};

/// Lifecycle signal from a running transcode.
#[derive(Debug)]
pub enum TranscodeEvent {
    /// A step began with this command line
    Started {
        command_line: String,
        step: usize,
        steps: usize,
    },
    /// Whole-job progress; percent may repeat but is computed across all steps
    Progress(ProgressData),
    /// Terminal result
    Finished(MediaResult<()>),
}

/// Event stream for one job.
pub type TranscodeStream = BoxStream<'static, TranscodeEvent>;

/// Something that can run a job's media work and inspect files.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Start the job, writing to `outputs` in plan order.
    fn start(&self, job: &JobDescriptor, outputs: Vec<PathBuf>) -> TranscodeStream;

    /// Inspect a media file.
    async fn probe(&self, path: &Path) -> MediaResult<MediaProbe>;
}

/// [`Transcoder`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Default, Clone)]
pub struct FfmpegTranscoder {
    runner: FfmpegRunner,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn start(&self, job: &JobDescriptor, outputs: Vec<PathBuf>) -> TranscodeStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = self.runner.clone();
        let job = job.clone();

        tokio::spawn(async move {
            let result = drive(&runner, &job, &outputs, &tx).await;
            let _ = tx.send(TranscodeEvent::Finished(result));
        });

        events(rx)
    }

    async fn probe(&self, path: &Path) -> MediaResult<MediaProbe> {
        probe_media(path).await
    }
}

/// Adapt a channel of events into a [`TranscodeStream`].
///
/// If the sender goes away without a `Finished`, one is synthesized.
pub fn events(rx: mpsc::UnboundedReceiver<TranscodeEvent>) -> TranscodeStream {
    stream::unfold((rx, false), |(mut rx, finished)| async move {
        if finished {
            return None;
        }
        match rx.recv().await {
            Some(event @ TranscodeEvent::Finished(_)) => Some((event, (rx, true))),
            Some(event) => Some((event, (rx, false))),
            None => Some((
                TranscodeEvent::Finished(Err(MediaError::StreamClosed)),
                (rx, true),
            )),
        }
    })
    .boxed()
}

async fn drive(
    runner: &FfmpegRunner,
    job: &JobDescriptor,
    outputs: &[PathBuf],
    tx: &mpsc::UnboundedSender<TranscodeEvent>,
) -> MediaResult<()> {
    let input_duration = match probe_media(job.input()).await {
        Ok(probe) => probe.duration(),
        Err(e) => {
            debug!(job_id = %job.id(), error = %e, "Input probe failed; progress will be coarse");
            None
        }
    };

    let plan = TranscodePlan::build(job, outputs, input_duration)?;

    for output in outputs {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    for (index, step) in plan.steps().iter().enumerate() {
        let _ = tx.send(TranscodeEvent::Started {
            command_line: step.command_line(),
            step: index,
            steps: plan.len(),
        });

        runner
            .run_with_progress(step, |progress| {
                let percent = plan.overall_percent(index, &progress);
                let _ = tx.send(TranscodeEvent::Progress(progress.to_progress_data(percent)));
            })
            .await?;
    }

    Ok(())
}
