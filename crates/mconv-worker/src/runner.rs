//! Job runner: drives one job from start to its single outcome.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use mconv_media::{MediaError, TranscodeEvent, Transcoder};
use mconv_models::{
    FailureKind, JobDescriptor, JobFailure, JobOutcome, JobParameters, JobSuccess, Operation,
    OutputFile, OutputMetadata, ProgressEvent, RemoteObject,
};
use mconv_storage::{object_path, MediaKind, StorageUploader};
use tracing::{debug, Instrument};

use crate::broadcast::ProgressBroadcast;
use crate::layout::OutputLayout;
use crate::logging::JobLogger;
use crate::metrics;

/// Diagnostic when a job asks for remote upload but no store is configured.
pub const STORAGE_NOT_CONFIGURED: &str = "Remote storage is not configured";

/// Keeps reported percent within 0-100 and never decreasing.
#[derive(Debug, Default, Clone, Copy)]
struct PercentTracker {
    last: f64,
}

impl PercentTracker {
    fn advance(&mut self, percent: f64) -> f64 {
        if percent.is_finite() {
            self.last = self.last.max(percent.clamp(0.0, 100.0));
        }
        self.last
    }
}

/// Runs jobs against a transcoder, relaying progress and uploading results.
#[derive(Clone)]
pub struct JobRunner {
    transcoder: Arc<dyn Transcoder>,
    uploader: Option<Arc<dyn StorageUploader>>,
    broadcast: ProgressBroadcast,
    layout: OutputLayout,
}

impl JobRunner {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        broadcast: ProgressBroadcast,
        layout: OutputLayout,
    ) -> Self {
        Self {
            transcoder,
            uploader: None,
            broadcast,
            layout,
        }
    }

    pub fn with_uploader(mut self, uploader: Option<Arc<dyn StorageUploader>>) -> Self {
        self.uploader = uploader;
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn has_uploader(&self) -> bool {
        self.uploader.is_some()
    }

    /// Run `job` to completion. Never retries; always yields exactly one outcome.
    pub async fn run(&self, job: &JobDescriptor) -> JobOutcome {
        let logger = JobLogger::new(job.id(), job.operation());
        let span = logger.create_span();
        self.run_logged(job, &logger).instrument(span).await
    }

    async fn run_logged(&self, job: &JobDescriptor, logger: &JobLogger) -> JobOutcome {
        let operation = job.operation();
        let started = Instant::now();
        logger.log_start(&format!("input {}", job.input().display()));
        metrics::record_job_started(operation);

        let outcome = if operation == Operation::ProbeMetadata {
            self.probe_only(job).await
        } else {
            self.transcode(job, logger, started).await
        };

        match &outcome {
            JobOutcome::Success(success) => {
                metrics::record_job_completed(operation);
                logger.log_completion(&format!(
                    "{} output(s) in {:.2}s",
                    success.outputs.len(),
                    success.elapsed_seconds
                ));
            }
            JobOutcome::Failure(failure) => {
                let stage = match failure.kind {
                    FailureKind::Transcode => "transcode",
                    FailureKind::Upload => "upload",
                };
                metrics::record_job_failed(operation, stage);
                logger.log_error(&format!("{} failed: {}", stage, failure.cause));
            }
        }
        outcome
    }

    async fn probe_only(&self, job: &JobDescriptor) -> JobOutcome {
        let started = Instant::now();
        match self.transcoder.probe(job.input()).await {
            Ok(probe) => JobOutcome::Success(JobSuccess {
                outputs: Vec::new(),
                remote: None,
                metadata: probe.summary(),
                probe: Some(probe.without_path().into_json()),
                elapsed_seconds: started.elapsed().as_secs_f64(),
            }),
            Err(e) => transcode_failure(&e),
        }
    }

    async fn transcode(
        &self,
        job: &JobDescriptor,
        logger: &JobLogger,
        started: Instant,
    ) -> JobOutcome {
        let operation = job.operation();
        let paths = self.layout.outputs_for(job);
        let Some(primary) = paths.first().cloned() else {
            return transcode_failure(&MediaError::invalid_plan("operation has no output"));
        };
        let mut events = self.transcoder.start(job, paths.clone());
        let mut tracker = PercentTracker::default();
        let mut result = Err(MediaError::StreamClosed);

        while let Some(event) = events.next().await {
            match event {
                TranscodeEvent::Started {
                    command_line,
                    step,
                    steps,
                } => {
                    logger.log_progress(&format!("step {}/{}", step + 1, steps));
                    debug!(job_id = %job.id(), "{}", command_line);
                }
                TranscodeEvent::Progress(mut data) => {
                    data.percent = tracker.advance(data.percent);
                    self.broadcast
                        .publish(ProgressEvent::new(job.id().clone(), job.file_id(), data));
                }
                TranscodeEvent::Finished(finished) => {
                    result = finished;
                    break;
                }
            }
        }
        drop(events);

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_transcode_duration(operation, elapsed);

        if let Err(e) = result {
            return transcode_failure(&e);
        }

        let outputs: Vec<OutputFile> = paths
            .iter()
            .map(|path| OutputFile {
                path: path.clone(),
                url: self.layout.url_for(path),
            })
            .collect();

        let mut metadata = match self.transcoder.probe(&primary).await {
            Ok(probe) => probe.summary(),
            Err(e) => {
                logger.log_warning(&format!("output probe failed: {}", e));
                OutputMetadata::default()
            }
        };
        metadata = metadata.with_extra("conversionTime", round_ms(elapsed));
        if let JobParameters::Resize { preset } = job.parameters() {
            metadata = metadata.with_extra("resolution", preset.as_str());
        }

        let remote = if job.wants_remote_upload() {
            match self.upload(job, &primary).await {
                Ok(remote) => Some(remote),
                Err(upload_failure) => {
                    return JobOutcome::Failure(JobFailure {
                        outputs,
                        ..upload_failure
                    });
                }
            }
        } else {
            None
        };

        JobOutcome::Success(JobSuccess {
            outputs,
            remote,
            metadata,
            probe: None,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        })
    }

    async fn upload(&self, job: &JobDescriptor, local: &Path) -> Result<RemoteObject, JobFailure> {
        let Some(uploader) = &self.uploader else {
            return Err(JobFailure {
                kind: FailureKind::Upload,
                diagnostic: STORAGE_NOT_CONFIGURED.to_string(),
                cause: STORAGE_NOT_CONFIGURED.to_string(),
                outputs: Vec::new(),
            });
        };

        let kind = match job.operation() {
            Operation::ExtractAudio => MediaKind::Audio,
            _ => MediaKind::Video,
        };
        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let destination = object_path(
            job.requester_id(),
            kind,
            &file_name,
            chrono::Utc::now().timestamp_millis(),
        );

        let mut object_metadata = HashMap::new();
        object_metadata.insert("userId".to_string(), job.requester_id().to_string());
        object_metadata.insert("operation".to_string(), job.operation().to_string());
        if let Some(name) = job.original_name() {
            object_metadata.insert("originalName".to_string(), name.to_string());
        }

        let started = Instant::now();
        let result = uploader.upload(local, &destination, object_metadata).await;
        metrics::record_upload_duration(started.elapsed().as_secs_f64());

        match result {
            Ok(url) => Ok(RemoteObject {
                url,
                path: destination,
            }),
            Err(e) => Err(JobFailure {
                kind: FailureKind::Upload,
                diagnostic: e.to_string(),
                cause: format!("{:?}", e),
                outputs: Vec::new(),
            }),
        }
    }
}

fn transcode_failure(error: &MediaError) -> JobOutcome {
    JobOutcome::failure(
        FailureKind::Transcode,
        error.diagnostic(),
        format!("{:?}", error),
    )
}

fn round_ms(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}
