//! Conversion endpoints. Each reads the multipart form, then hands off to
//! the gateway.

use axum::extract::{Multipart, State};
use axum::Json;
use mconv_models::Operation;

use crate::error::ApiResult;
use crate::gateway::{self, ConversionResponse, Delivery, INPUT_FIELD, OVERLAY_FIELD};
use crate::state::AppState;
use crate::upload::UploadForm;

async fn handle(
    state: AppState,
    multipart: Multipart,
    operation: Operation,
    delivery: Delivery,
) -> ApiResult<Json<ConversionResponse>> {
    let production = state.config.is_production();
    convert(state, multipart, operation, delivery)
        .await
        .map_err(|e| e.redact(production))
}

async fn convert(
    state: AppState,
    multipart: Multipart,
    operation: Operation,
    delivery: Delivery,
) -> ApiResult<Json<ConversionResponse>> {
    let file_fields: &[&str] = if operation.requires_overlay_input() {
        &[INPUT_FIELD, OVERLAY_FIELD]
    } else {
        &[INPUT_FIELD]
    };
    let form = UploadForm::read(multipart, state.layout(), file_fields, &state.cleanup).await?;
    let response = gateway::execute(&state, operation, form, delivery).await?;
    Ok(Json(response))
}

/// `POST /convert/video`
pub async fn convert_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::TranscodeVideo, Delivery::Local).await
}

/// `POST /convert/video-firebase`
pub async fn convert_video_remote(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::TranscodeVideo, Delivery::Remote).await
}

/// `POST /extract/audio`
pub async fn extract_audio(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::ExtractAudio, Delivery::Local).await
}

/// `POST /extract/audio-firebase`
pub async fn extract_audio_remote(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::ExtractAudio, Delivery::Remote).await
}

/// `POST /resize/video`
pub async fn resize_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::Resize, Delivery::Local).await
}

/// `POST /convert/to-gif`
pub async fn convert_to_gif(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::ToAnimatedImage, Delivery::Local).await
}

/// `POST /thumbnail`
pub async fn thumbnail(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::GenerateThumbnail, Delivery::Local).await
}

/// `POST /trim`
pub async fn trim(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::Trim, Delivery::Local).await
}

/// `POST /watermark`
pub async fn watermark(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::Watermark, Delivery::Local).await
}

/// `POST /hls`
pub async fn hls(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::SegmentForStreaming, Delivery::Local).await
}

/// `POST /metadata`
pub async fn metadata(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ConversionResponse>> {
    handle(state, multipart, Operation::ProbeMetadata, Delivery::Local).await
}
