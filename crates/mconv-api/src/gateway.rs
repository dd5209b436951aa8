//! Request gateway: turns a parsed upload into a job, runs it and shapes
//! the response.

use mconv_models::{
    FormFields, JobDescriptor, JobOutcome, JobParameters, JobSuccess, Operation, ParameterError,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::upload::UploadForm;

/// File field holding the media input.
pub const INPUT_FIELD: &str = "video";
/// File field holding the watermark image.
pub const OVERLAY_FIELD: &str = "watermark";

/// Form fields consulted by the remote-upload variants.
const REQUESTER_FIELD: &str = "userId";
const REMOTE_UPLOAD_FIELD: &str = "uploadToFirebase";

/// Which response shape a route produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Served from `/outputs` only
    Local,
    /// Optionally copied to object storage
    Remote,
}

/// Success body. Absent fields are omitted.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Validate the form, run the job and schedule cleanup of its files.
///
/// Validation failures remove the stored uploads immediately; no job exists
/// for them.
pub async fn execute(
    state: &AppState,
    operation: Operation,
    mut form: UploadForm,
    delivery: Delivery,
) -> ApiResult<ConversionResponse> {
    let job = match describe(operation, &mut form, delivery) {
        Ok(job) => job,
        Err(e) => {
            form.discard(&state.cleanup).await;
            return Err(e.into());
        }
    };
    // Anything left over was never part of the job
    form.discard(&state.cleanup).await;

    info!(
        job_id = %job.id(),
        operation = %operation,
        file_id = job.file_id(),
        "Accepted conversion request"
    );

    // Runs to completion even if the client disconnects mid-request
    let task_state = state.clone();
    let outcome = tokio::spawn(async move {
        let outcome = task_state.runner.run(&job).await;
        task_state.cleanup.schedule_for(&job, &outcome);
        outcome
    })
    .await
    .map_err(|e| ApiError::internal(format!("Conversion task failed: {}", e)))?;

    match outcome {
        JobOutcome::Success(success) => Ok(shape(operation, delivery, success)),
        JobOutcome::Failure(failure) => Err(ApiError::from_failure(operation, failure)),
    }
}

/// Build the job descriptor, taking the files it owns out of `form`.
fn describe(
    operation: Operation,
    form: &mut UploadForm,
    delivery: Delivery,
) -> Result<JobDescriptor, ParameterError> {
    let input = form
        .take_file(INPUT_FIELD)
        .ok_or(ParameterError::MissingFile(INPUT_FIELD))?;
    let overlay = if operation.requires_overlay_input() {
        form.take_file(OVERLAY_FIELD)
    } else {
        None
    };

    // Give the files back so a validation failure still removes them
    let overlay_path = overlay.as_ref().map(|f| f.path.clone());
    let parameters = match JobParameters::from_fields(operation, &form.fields, overlay_path) {
        Ok(parameters) => parameters,
        Err(e) => {
            form.restore(INPUT_FIELD, input);
            if let Some(overlay) = overlay {
                form.restore(OVERLAY_FIELD, overlay);
            }
            return Err(e);
        }
    };

    let mut job = JobDescriptor::new(input.path, parameters);
    if let Some(name) = input.original_name {
        job = job.with_original_name(name);
    }
    if delivery == Delivery::Remote {
        job = job
            .with_requester(form.fields.get(REQUESTER_FIELD).map(String::as_str))
            .with_remote_upload(wants_remote_upload(&form.fields));
    }
    Ok(job)
}

fn wants_remote_upload(fields: &FormFields) -> bool {
    fields
        .get(REMOTE_UPLOAD_FIELD)
        .is_some_and(|v| v.trim() == "true")
}

/// Shape a success outcome for the route that produced it.
pub fn shape(operation: Operation, delivery: Delivery, success: JobSuccess) -> ConversionResponse {
    let primary = success.primary_output().map(|o| o.url.clone());
    let urls: Vec<String> = success.outputs.iter().map(|o| o.url.clone()).collect();
    let metadata = || serde_json::to_value(&success.metadata).ok();

    let mut response = ConversionResponse {
        success: true,
        ..Default::default()
    };

    if delivery == Delivery::Remote {
        response.local_url = primary;
        response.metadata = metadata();
        if let Some(remote) = success.remote {
            response.firebase_url = Some(remote.url);
            response.firebase_path = Some(remote.path);
        }
        return response;
    }

    match operation {
        Operation::TranscodeVideo | Operation::Resize | Operation::ToAnimatedImage => {
            response.output_url = primary;
            response.metadata = metadata();
        }
        Operation::ExtractAudio | Operation::Trim | Operation::Watermark => {
            response.output_url = primary;
        }
        Operation::GenerateThumbnail => {
            response.thumbnail_url = primary;
            response.thumbnail_urls = Some(urls);
        }
        Operation::SegmentForStreaming => {
            response.playlist_url = primary;
        }
        Operation::ProbeMetadata => {
            response.metadata = success.probe;
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use mconv_models::{OutputFile, OutputMetadata, RemoteObject};
    use serde_json::json;

    fn success(urls: &[&str]) -> JobSuccess {
        JobSuccess {
            outputs: urls
                .iter()
                .map(|u| OutputFile {
                    path: u.trim_start_matches('/').into(),
                    url: u.to_string(),
                })
                .collect(),
            remote: None,
            metadata: OutputMetadata {
                format: Some("mov,mp4,m4a,3gp,3g2,mj2".to_string()),
                ..Default::default()
            }
            .with_extra("conversionTime", 1.25),
            probe: None,
            elapsed_seconds: 1.25,
        }
    }

    fn to_json(response: ConversionResponse) -> Value {
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn test_transcode_shape() {
        let body = to_json(shape(
            Operation::TranscodeVideo,
            Delivery::Local,
            success(&["/outputs/video-1-2-converted.mp4"]),
        ));
        assert_eq!(body["success"], true);
        assert_eq!(body["outputUrl"], "/outputs/video-1-2-converted.mp4");
        assert_eq!(body["metadata"]["conversionTime"], 1.25);
        assert!(body.get("localUrl").is_none());
    }

    #[test]
    fn test_audio_shape_has_no_metadata() {
        let body = to_json(shape(
            Operation::ExtractAudio,
            Delivery::Local,
            success(&["/outputs/video-1-2-audio.mp3"]),
        ));
        assert_eq!(
            body,
            json!({"success": true, "outputUrl": "/outputs/video-1-2-audio.mp3"})
        );
    }

    #[test]
    fn test_thumbnail_shape() {
        let body = to_json(shape(
            Operation::GenerateThumbnail,
            Delivery::Local,
            success(&[
                "/outputs/video-1-2-thumbnail.png",
                "/outputs/video-1-2-thumbnail-2.png",
            ]),
        ));
        assert_eq!(body["thumbnailUrl"], "/outputs/video-1-2-thumbnail.png");
        assert_eq!(body["thumbnailUrls"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_hls_shape() {
        let body = to_json(shape(
            Operation::SegmentForStreaming,
            Delivery::Local,
            success(&["/outputs/hls/video-1-2/output.m3u8"]),
        ));
        assert_eq!(body["playlistUrl"], "/outputs/hls/video-1-2/output.m3u8");
        assert!(body.get("outputUrl").is_none());
    }

    #[test]
    fn test_probe_shape() {
        let mut probed = success(&[]);
        probed.probe = Some(json!({"format": {"format_name": "gif"}, "streams": []}));
        let body = to_json(shape(Operation::ProbeMetadata, Delivery::Local, probed));
        assert_eq!(body["metadata"]["format"]["format_name"], "gif");
        assert!(body.get("outputUrl").is_none());
    }

    #[test]
    fn test_remote_shape() {
        let mut uploaded = success(&["/outputs/video-1-2-converted.mp4"]);
        uploaded.remote = Some(RemoteObject {
            url: "https://storage.googleapis.com/media/users/u1/video/1-x.mp4".to_string(),
            path: "users/u1/video/1-x.mp4".to_string(),
        });
        let body = to_json(shape(Operation::TranscodeVideo, Delivery::Remote, uploaded));
        assert_eq!(body["localUrl"], "/outputs/video-1-2-converted.mp4");
        assert_eq!(body["firebasePath"], "users/u1/video/1-x.mp4");
        assert!(body["metadata"].is_object());
        assert!(body.get("outputUrl").is_none());

        let body = to_json(shape(
            Operation::ExtractAudio,
            Delivery::Remote,
            success(&["/outputs/video-1-2-audio.mp3"]),
        ));
        assert!(body.get("firebaseUrl").is_none());
    }

    #[test]
    fn test_remote_upload_flag() {
        let mut fields = FormFields::new();
        assert!(!wants_remote_upload(&fields));
        fields.insert(REMOTE_UPLOAD_FIELD.to_string(), "yes".to_string());
        assert!(!wants_remote_upload(&fields));
        fields.insert(REMOTE_UPLOAD_FIELD.to_string(), "true".to_string());
        assert!(wants_remote_upload(&fields));
    }
}
