//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use mconv_worker::OUTPUTS_ROUTE;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::{
    convert_to_gif, convert_video, convert_video_remote, extract_audio, extract_audio_remote,
    health, hls, metadata, ready, resize_video, thumbnail, trim, watermark,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, json_payload_too_large, request_id, request_logging, security_headers,
};
use crate::state::AppState;
use crate::ws::ws_progress;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let conversion_routes = Router::new()
        .route("/convert/video", post(convert_video))
        .route("/convert/video-firebase", post(convert_video_remote))
        .route("/convert/to-gif", post(convert_to_gif))
        .route("/extract/audio", post(extract_audio))
        .route("/extract/audio-firebase", post(extract_audio_remote))
        .route("/resize/video", post(resize_video))
        .route("/thumbnail", post(thumbnail))
        .route("/trim", post(trim))
        .route("/watermark", post(watermark))
        .route("/hls", post(hls))
        .route("/metadata", post(metadata))
        // The transport-level limit below replaces axum's 2 MB extractor default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_upload_bytes))
        .layer(middleware::from_fn(json_payload_too_large));

    let ws_routes = Router::new()
        .route("/", get(ws_progress))
        .route("/ws", get(ws_progress));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let outputs = ServeDir::new(&state.config.output_dir);

    Router::new()
        .merge(conversion_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest_service(OUTPUTS_ROUTE, outputs)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
