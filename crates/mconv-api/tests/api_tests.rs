//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use mconv_api::{create_router, ApiConfig, AppState};
use mconv_media::{
    events, FfmpegTranscoder, MediaError, MediaProbe, MediaResult, TranscodeEvent, TranscodeStream,
    Transcoder,
};
use mconv_models::{JobDescriptor, ProgressData, WsMessage};
use mconv_storage::{StorageResult, StorageUploader};
use mconv_worker::STORAGE_NOT_CONFIGURED;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

const BOUNDARY: &str = "mconv-test-boundary";

/// 1x1 single-frame GIF.
const TINY_GIF: &[u8] = &[
    71, 73, 70, 56, 57, 97, 1, 0, 1, 0, 128, 0, 0, 0, 0, 0, 255, 255, 255, 33, 249, 4, 1, 0, 0, 0,
    0, 44, 0, 0, 0, 0, 1, 0, 1, 0, 0, 2, 1, 68, 0, 59,
];

/// Writes placeholder outputs and reports the given percents.
struct FakeTranscoder {
    percents: Vec<f64>,
    /// Time between the last progress event and `Finished`
    delay: Duration,
    fail: bool,
    starts: AtomicUsize,
}

impl FakeTranscoder {
    fn new(percents: Vec<f64>) -> Arc<Self> {
        Arc::new(Self {
            percents,
            delay: Duration::ZERO,
            fail: false,
            starts: AtomicUsize::new(0),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            percents: vec![50.0],
            delay,
            fail: false,
            starts: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            percents: vec![10.0],
            delay: Duration::ZERO,
            fail: true,
            starts: AtomicUsize::new(0),
        })
    }

    fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    fn start(&self, _job: &JobDescriptor, outputs: Vec<PathBuf>) -> TranscodeStream {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        for output in &outputs {
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(output, b"fake output").unwrap();
        }
        for percent in &self.percents {
            tx.send(TranscodeEvent::Progress(ProgressData {
                percent: *percent,
                ..Default::default()
            }))
            .unwrap();
        }

        let result = if self.fail {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with status 1",
                Some("Invalid data found when processing input".to_string()),
                Some(1),
            ))
        } else {
            Ok(())
        };
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(TranscodeEvent::Finished(result));
        });
        events(rx)
    }

    async fn probe(&self, _path: &Path) -> MediaResult<MediaProbe> {
        MediaProbe::from_json(
            br#"{"format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "0.040000",
                 "size": "1024", "bit_rate": "204800"}, "streams": []}"#,
        )
    }
}

/// Accepts every upload and records its destination.
#[derive(Default)]
struct FakeUploader {
    destinations: Mutex<Vec<String>>,
}

#[async_trait]
impl StorageUploader for FakeUploader {
    async fn upload(
        &self,
        local: &Path,
        destination: &str,
        _metadata: HashMap<String, String>,
    ) -> StorageResult<String> {
        assert!(local.exists(), "uploaded file must exist locally");
        self.destinations.lock().unwrap().push(destination.to_string());
        Ok(format!("https://storage.example.test/media/{}", destination))
    }

    async fn delete(&self, _path: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn signed_url(&self, path: &str, _ttl: Duration) -> StorageResult<String> {
        Ok(format!("https://storage.example.test/media/{}?signed", path))
    }
}

struct TestServer {
    _dir: TempDir,
    state: AppState,
    app: Router,
}

impl TestServer {
    fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self::with_config(transcoder, |_| {})
    }

    fn with_config(transcoder: Arc<dyn Transcoder>, tweak: impl FnOnce(&mut ApiConfig)) -> Self {
        Self::build(transcoder, None, tweak)
    }

    /// Server whose cleanup runs as soon as a job settles.
    fn eager_cleanup(
        transcoder: Arc<dyn Transcoder>,
        uploader: Option<Arc<dyn StorageUploader>>,
    ) -> Self {
        Self::build(transcoder, uploader, |config| {
            config.cleanup_grace = Duration::ZERO;
        })
    }

    fn build(
        transcoder: Arc<dyn Transcoder>,
        uploader: Option<Arc<dyn StorageUploader>>,
        tweak: impl FnOnce(&mut ApiConfig),
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ApiConfig {
            upload_dir: dir.path().join("uploads"),
            output_dir: dir.path().join("outputs"),
            ..ApiConfig::default()
        };
        tweak(&mut config);
        std::fs::create_dir_all(&config.upload_dir).unwrap();
        std::fs::create_dir_all(&config.output_dir).unwrap();

        let state = AppState::with_parts(config, transcoder, uploader);
        let app = create_router(state.clone(), None);
        Self {
            _dir: dir,
            state,
            app,
        }
    }

    async fn post(&self, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
        self.send(multipart_request(uri, parts)).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn uploads(&self) -> Vec<PathBuf> {
        list(&self.state.config.upload_dir)
    }

    fn outputs(&self) -> Vec<PathBuf> {
        list(&self.state.config.output_dir)
    }
}

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Let scheduled cleanup tasks run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

fn list(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn video(data: &[u8]) -> Part<'_> {
    Part::File {
        name: "video",
        filename: "clip.gif",
        data,
    }
}

fn ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::new(FakeTranscoder::new(vec![]));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = server.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_trim_without_duration_is_rejected() {
    let transcoder = FakeTranscoder::new(vec![50.0]);
    let server = TestServer::new(transcoder.clone());

    let (status, body) = server
        .post(
            "/trim",
            &[
                video(TINY_GIF),
                Part::Text {
                    name: "startTime",
                    value: "00:00:01",
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("duration"));
    assert_eq!(transcoder.starts(), 0);
    assert!(server.uploads().is_empty(), "stored upload was not removed");
    assert!(server.outputs().is_empty());
}

#[tokio::test]
async fn test_resize_rejects_unknown_preset() {
    let transcoder = FakeTranscoder::new(vec![]);
    let server = TestServer::new(transcoder.clone());

    let (status, body) = server
        .post(
            "/resize/video",
            &[
                video(TINY_GIF),
                Part::Text {
                    name: "resolution",
                    value: "999p",
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid resolution");
    assert_eq!(transcoder.starts(), 0);
    assert!(server.uploads().is_empty());
}

#[tokio::test]
async fn test_missing_file_is_rejected() {
    let server = TestServer::new(FakeTranscoder::new(vec![]));

    let (status, body) = server
        .post(
            "/convert/video",
            &[Part::Text {
                name: "format",
                value: "mp4",
            }],
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No video file provided");
}

#[tokio::test]
async fn test_watermark_requires_overlay() {
    let transcoder = FakeTranscoder::new(vec![]);
    let server = TestServer::new(transcoder.clone());

    let (status, body) = server.post("/watermark", &[video(TINY_GIF)]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No watermark file provided");
    assert_eq!(transcoder.starts(), 0);
    assert!(server.uploads().is_empty());
}

#[tokio::test]
async fn test_convert_serves_output_and_broadcasts_progress() {
    let server = TestServer::new(FakeTranscoder::new(vec![20.0, 60.0, 40.0, 100.0]));
    let mut observer = server.state.broadcast.register();

    let (status, body) = server.post("/convert/video", &[video(TINY_GIF)]).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["metadata"]["format"], "mov,mp4,m4a,3gp,3g2,mj2");
    assert!(body["metadata"]["conversionTime"].is_number());

    let url = body["outputUrl"].as_str().unwrap();
    assert!(url.starts_with("/outputs/video-"));
    assert!(url.ends_with("-converted.mp4"));

    let request = Request::builder().uri(url).body(Body::empty()).unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut percents = Vec::new();
    while let Ok(Some(message)) =
        tokio::time::timeout(Duration::from_millis(50), observer.recv()).await
    {
        match message {
            WsMessage::Connected { .. } => assert!(percents.is_empty()),
            WsMessage::Progress { data, filename } => {
                assert!(filename.starts_with("video-"));
                percents.push(data.percent);
            }
        }
    }
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    assert!(percents.iter().all(|p| (0.0..=100.0).contains(p)));
}

#[tokio::test]
async fn test_thumbnail_lists_every_timestamp() {
    let server = TestServer::new(FakeTranscoder::new(vec![]));

    let (status, body) = server
        .post(
            "/thumbnail",
            &[
                video(TINY_GIF),
                Part::Text {
                    name: "timestamps",
                    value: "10%,50%",
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    let urls = body["thumbnailUrls"].as_array().unwrap();
    assert_eq!(urls.len(), 2);
    assert_eq!(body["thumbnailUrl"], urls[0]);
}

#[tokio::test]
async fn test_remote_upload_without_store_keeps_local_result() {
    let server = TestServer::new(FakeTranscoder::new(vec![]));

    let (status, body) = server
        .post(
            "/convert/video-firebase",
            &[
                video(TINY_GIF),
                Part::Text {
                    name: "userId",
                    value: "user-7",
                },
                Part::Text {
                    name: "uploadToFirebase",
                    value: "true",
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["details"], STORAGE_NOT_CONFIGURED);
    let local = body["localUrl"].as_str().unwrap();
    let file = local.trim_start_matches("/outputs/");
    assert!(server.state.config.output_dir.join(file).exists());
}

#[tokio::test]
async fn test_remote_variant_without_upload_flag() {
    let server = TestServer::new(FakeTranscoder::new(vec![]));

    let (status, body) = server
        .post("/extract/audio-firebase", &[video(TINY_GIF)])
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["localUrl"].as_str().unwrap().ends_with("-audio.mp3"));
    assert!(body.get("firebaseUrl").is_none());
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let transcoder = FakeTranscoder::new(vec![]);
    let server = TestServer::with_config(transcoder.clone(), |config| {
        config.max_upload_bytes = 1024;
    });

    let big = vec![0u8; 8 * 1024];
    let (status, body) = server.post("/convert/video", &[video(&big)]).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "File too large");
    assert_eq!(transcoder.starts(), 0);
    assert!(server.uploads().is_empty());
}

#[tokio::test]
async fn test_declared_oversized_length_gets_json_error() {
    let transcoder = FakeTranscoder::new(vec![]);
    let server = TestServer::with_config(transcoder.clone(), |config| {
        config.max_upload_bytes = 1024;
    });

    let big = vec![0u8; 8 * 1024];
    let mut request = multipart_request("/convert/video", &[video(&big)]);
    let length = multipart_body(&[video(&big)]).len();
    request
        .headers_mut()
        .insert(header::CONTENT_LENGTH, length.into());

    let (status, body) = server.send(request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "File too large");
    assert!(body["details"].is_string());
    assert_eq!(transcoder.starts(), 0);
    assert!(server.uploads().is_empty());
}

#[tokio::test]
async fn test_successful_job_removes_upload() {
    let server = TestServer::eager_cleanup(FakeTranscoder::new(vec![100.0]), None);

    let (status, body) = server.post("/convert/video", &[video(TINY_GIF)]).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    settle().await;

    assert!(server.uploads().is_empty(), "{:?}", server.uploads());
    // Local-only outputs stay behind to be served
    assert_eq!(server.outputs().len(), 1);
}

#[tokio::test]
async fn test_failed_job_removes_upload() {
    let transcoder = FakeTranscoder::failing();
    let server = TestServer::eager_cleanup(transcoder.clone(), None);

    let (status, body) = server.post("/convert/video", &[video(TINY_GIF)]).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Conversion failed");
    assert!(body["details"].as_str().unwrap().contains("status 1"));
    assert_eq!(transcoder.starts(), 1);
    settle().await;
    assert!(server.uploads().is_empty(), "{:?}", server.uploads());
}

#[tokio::test]
async fn test_remote_upload_removes_local_files() {
    let uploader = Arc::new(FakeUploader::default());
    let server = TestServer::eager_cleanup(
        FakeTranscoder::new(vec![]),
        Some(uploader.clone() as Arc<dyn StorageUploader>),
    );

    let (status, body) = server
        .post(
            "/convert/video-firebase",
            &[
                video(TINY_GIF),
                Part::Text {
                    name: "userId",
                    value: "user-7",
                },
                Part::Text {
                    name: "uploadToFirebase",
                    value: "true",
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    let path = body["firebasePath"].as_str().unwrap();
    assert!(path.starts_with("users/user-7/video/"));
    assert!(body["firebaseUrl"].as_str().unwrap().ends_with(path));
    assert!(body["localUrl"].as_str().unwrap().ends_with("-converted.mp4"));
    assert_eq!(uploader.destinations.lock().unwrap().len(), 1);

    settle().await;
    assert!(server.uploads().is_empty(), "{:?}", server.uploads());
    assert!(server.outputs().is_empty(), "{:?}", server.outputs());
}

#[tokio::test]
async fn test_job_outlives_client_disconnect() {
    let transcoder = FakeTranscoder::slow(Duration::from_millis(300));
    let server = TestServer::eager_cleanup(transcoder.clone(), None);

    let request = multipart_request("/convert/video", &[video(TINY_GIF)]);
    let abandoned =
        tokio::time::timeout(Duration::from_millis(100), server.app.clone().oneshot(request)).await;
    assert!(abandoned.is_err(), "request finished before the client gave up");
    assert_eq!(transcoder.starts(), 1);

    tokio::time::sleep(Duration::from_millis(700)).await;

    assert!(server.uploads().is_empty(), "{:?}", server.uploads());
    let outputs = server.outputs();
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0].to_string_lossy().ends_with("-converted.mp4"));
}

#[tokio::test]
async fn test_tiny_gif_converts_to_mp4() {
    if !ffmpeg_available() {
        eprintln!("Skipping: ffmpeg not available");
        return;
    }
    let server = TestServer::new(Arc::new(FfmpegTranscoder::new()));

    let (status, body) = server
        .post(
            "/convert/video",
            &[
                video(TINY_GIF),
                Part::Text {
                    name: "format",
                    value: "mp4",
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["metadata"]["format"].as_str().unwrap().contains("mp4"));
    let file = body["outputUrl"]
        .as_str()
        .unwrap()
        .trim_start_matches("/outputs/")
        .to_string();
    assert!(server.state.config.output_dir.join(file).exists());
}

#[tokio::test]
async fn test_metadata_is_stable_for_identical_input() {
    if !ffmpeg_available() {
        eprintln!("Skipping: ffmpeg not available");
        return;
    }
    let server = TestServer::new(Arc::new(FfmpegTranscoder::new()));

    let (first_status, first) = server.post("/metadata", &[video(TINY_GIF)]).await;
    let (second_status, second) = server.post("/metadata", &[video(TINY_GIF)]).await;

    assert_eq!(first_status, StatusCode::OK, "{}", first);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["metadata"]["format"], second["metadata"]["format"]);
    assert_eq!(first["metadata"]["streams"], second["metadata"]["streams"]);
    assert!(first["metadata"]["format"].get("filename").is_none());
    assert!(server.outputs().is_empty());
}

