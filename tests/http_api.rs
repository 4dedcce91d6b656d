//! HTTP surface tests driven through the router without a socket.

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use callscribe::analysis::FirstSpeakerPolicy;
use callscribe::api::ApiServer;
use callscribe::auth::TokenAuthenticator;
use callscribe::classification::KeywordClassifier;
use callscribe::config::Config;
use callscribe::convert::AudioConverter;
use callscribe::db::{ConversationStore, NewConversation};
use callscribe::pipeline::{ConversationPipeline, PipelineSettings, ProgressTracker};
use callscribe::transcription::{RawSegment, RawTranscript, SpeechToText};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "callscribe-test-boundary";

struct PassthroughConverter;

#[async_trait]
impl AudioConverter for PassthroughConverter {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn convert(&self, input: &Path) -> Result<PathBuf> {
        Ok(input.to_path_buf())
    }
}

#[derive(Debug)]
struct CannedTranscriber;

#[async_trait]
impl SpeechToText for CannedTranscriber {
    fn name(&self) -> &'static str {
        "canned"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(&self, _audio_path: &Path) -> Result<RawTranscript> {
        Ok(RawTranscript {
            text: "Hello there. Thanks, goodbye.".to_string(),
            segments: vec![
                RawSegment {
                    start: 0.0,
                    end: Some(1.5),
                    speaker: Some("SPEAKER_00".to_string()),
                    text: "Hello there.".to_string(),
                },
                RawSegment {
                    start: 2.0,
                    end: Some(3.0),
                    speaker: Some("SPEAKER_01".to_string()),
                    text: "Thanks, goodbye.".to_string(),
                },
            ],
        })
    }
}

#[derive(Default)]
struct MemoryStore {
    records: Mutex<Vec<NewConversation>>,
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn insert(&self, conversation: NewConversation) -> Result<i64> {
        let mut records = self.records.lock().unwrap();
        records.push(conversation);
        Ok(records.len() as i64)
    }
}

struct TestHarness {
    router: axum::Router,
    progress: ProgressTracker,
    store: Arc<MemoryStore>,
    _uploads: tempfile::TempDir,
}

fn harness() -> TestHarness {
    let uploads = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());

    let settings = PipelineSettings {
        uploads_dir: uploads.path().join("uploads"),
        max_concurrent_tasks: 4,
        silence_threshold: 5.0,
        convert_timeout: Duration::from_secs(5),
        transcribe_timeout: Duration::from_secs(5),
        classify_timeout: Duration::from_secs(5),
    };
    let pipeline = Arc::new(
        ConversationPipeline::new(
            Arc::new(PassthroughConverter),
            Arc::new(CannedTranscriber),
            Arc::new(KeywordClassifier::new()),
            Arc::clone(&store) as Arc<dyn ConversationStore>,
            Arc::new(FirstSpeakerPolicy),
            ProgressTracker::default(),
            settings,
        )
        .unwrap(),
    );
    let progress = pipeline.progress();

    let mut tokens = HashMap::new();
    tokens.insert("test-token".to_string(), 1);
    let auth = Arc::new(TokenAuthenticator::new(tokens));

    let router = ApiServer::new(pipeline, auth, &Config::default()).router();

    TestHarness {
        router,
        progress,
        store,
        _uploads: uploads,
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// One multipart part per (field name, file name, content type, payload).
fn multipart_body(parts: &[(&str, &str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content_type, payload) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(payload);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload(uri: &str, parts: &[(&str, &str, &str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, "Bearer test-token")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

#[tokio::test]
async fn test_service_info_needs_no_token() {
    let harness = harness();

    let response = harness.router.clone().oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness.router.oneshot(get("/version", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let harness = harness();

    let response = harness
        .router
        .oneshot(get("/progress/some-task", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let harness = harness();

    let response = harness
        .router
        .oneshot(get("/conversations/stats", Some("wrong-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let harness = harness();

    let response = harness
        .router
        .oneshot(get("/progress/no-such-task", Some("test-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registered_task_is_visible() {
    let harness = harness();
    harness.progress.create("known-task").unwrap();

    let response = harness
        .router
        .oneshot(get("/progress/known-task", Some("test-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_single_upload_is_accepted_and_processed() {
    let harness = harness();

    let response = harness
        .router
        .oneshot(upload(
            "/upload/single",
            &[("file", "call.wav", "audio/wav", &[0u8; 32])],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(harness.progress.len(), 1);

    // Background processing lands the record in the store.
    for _ in 0..500 {
        if harness.store.records.lock().unwrap().len() == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("uploaded recording was never persisted");
}

#[tokio::test]
async fn test_upload_with_wrong_media_type_is_rejected() {
    let harness = harness();

    let response = harness
        .router
        .oneshot(upload(
            "/upload/single",
            &[("file", "notes.txt", "text/plain", b"hello")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(harness.progress.is_empty());
    assert!(harness.store.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let harness = harness();

    let response = harness
        .router
        .oneshot(upload(
            "/upload/single",
            &[("attachment", "call.wav", "audio/wav", &[0u8; 16])],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_batch_is_rejected_with_no_tasks() {
    let harness = harness();

    let payload = [0u8; 16];
    let parts: Vec<(&str, &str, &str, &[u8])> = (0..11)
        .map(|_| ("files", "call.wav", "audio/wav", payload.as_slice()))
        .collect();

    let response = harness
        .router
        .oneshot(upload("/upload/batch", &parts))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(harness.progress.is_empty());
}

#[tokio::test]
async fn test_batch_upload_is_accepted() {
    let harness = harness();

    let payload = [0u8; 16];
    let parts: Vec<(&str, &str, &str, &[u8])> = vec![
        ("files", "a.wav", "audio/wav", payload.as_slice()),
        ("files", "b.mp3", "audio/mp3", payload.as_slice()),
    ];

    let response = harness
        .router
        .oneshot(upload("/upload/batch", &parts))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(harness.progress.len(), 2);
}

#[tokio::test]
async fn test_export_with_unknown_format_is_rejected() {
    let harness = harness();

    // Format validation happens before any record lookup.
    let response = harness
        .router
        .oneshot(get("/conversations/1/export?format=xml", Some("test-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
