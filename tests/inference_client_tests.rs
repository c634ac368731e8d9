//! Mock HTTP tests for InferenceClient.
//!
//! These tests cover:
//! - Request shape (method, path, multipart field and file name)
//! - Response parsing of the first prediction
//! - Error handling for non-2xx, malformed bodies and unreachable servers

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use symbol_detect::inference::{
    Dispatch, InferenceClient, InferenceError, InferenceResult, PREDICT_PATH, UPLOAD_FILE_NAME,
};
use symbol_detect::sampler::{DispatchTag, EncodedFrame};

// Multipart bodies are matched as text, so the upload stays ASCII.
const FAKE_JPEG: &[u8] = b"fake-jpeg-payload";

fn wav_bytes() -> Vec<u8> {
    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(&36u32.to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes
}

/// URI of a local port with nothing listening on it.
fn closed_port_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn test_predict_posts_multipart_jpeg() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains(format!("filename=\"{}\"", UPLOAD_FILE_NAME)))
        .and(body_string_contains("image/jpeg"))
        .and(body_string_contains("fake-jpeg-payload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([{"name": "yield"}])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = InferenceClient::new(&mock_server.uri()).unwrap();
    let result = client.predict(Bytes::from_static(FAKE_JPEG)).await.unwrap();

    assert_eq!(result.label.as_deref(), Some("yield"));
    assert!(result.audio.is_none());
}

#[tokio::test]
async fn test_predict_decodes_label_and_audio() {
    let mock_server = MockServer::start().await;
    let wav = wav_bytes();

    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "stop_sign", "audio": STANDARD.encode(&wav), "confidence": 0.88},
            {"name": "yield"}
        ])))
        .mount(&mock_server)
        .await;

    let client = InferenceClient::new(&mock_server.uri()).unwrap();
    let result = client.predict(Bytes::from_static(FAKE_JPEG)).await.unwrap();

    assert_eq!(result.label.as_deref(), Some("stop_sign"));
    let audio = result.audio.unwrap();
    assert_eq!(audio.as_bytes(), wav.as_slice());
    assert!(audio.is_wav());
    assert_eq!(result.detection.unwrap().confidence, Some(0.88));
}

#[tokio::test]
async fn test_predict_empty_prediction() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{}])))
        .mount(&mock_server)
        .await;

    let client = InferenceClient::new(&mock_server.uri()).unwrap();
    let result = client.predict(Bytes::from_static(FAKE_JPEG)).await.unwrap();

    assert_eq!(result, InferenceResult::default());
}

#[tokio::test]
async fn test_predict_server_error_is_status_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&mock_server)
        .await;

    let client = InferenceClient::new(&mock_server.uri()).unwrap();
    let err = client.predict(Bytes::from_static(FAKE_JPEG)).await.unwrap_err();

    match err {
        InferenceError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "model crashed");
        }
        other => panic!("Expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_predict_not_found_is_status_error() {
    let mock_server = MockServer::start().await;

    let client = InferenceClient::new(&mock_server.uri()).unwrap();
    let err = client.predict(Bytes::from_static(FAKE_JPEG)).await.unwrap_err();

    assert!(matches!(err, InferenceError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_predict_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&mock_server)
        .await;

    let client = InferenceClient::new(&mock_server.uri()).unwrap();
    let err = client.predict(Bytes::from_static(FAKE_JPEG)).await.unwrap_err();

    assert!(matches!(err, InferenceError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_predict_unreachable_server_is_http_error() {
    let client = InferenceClient::new(&closed_port_uri()).unwrap();
    let err = client.predict(Bytes::from_static(FAKE_JPEG)).await.unwrap_err();

    assert!(matches!(err, InferenceError::Http(_)));
}

#[tokio::test]
async fn test_predict_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"name": "late"}]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = InferenceClient::with_timeouts(
        &mock_server.uri(),
        Duration::from_millis(100),
        Duration::from_secs(1),
    )
    .unwrap();
    let err = client.predict(Bytes::from_static(FAKE_JPEG)).await.unwrap_err();

    match err {
        InferenceError::Http(e) => assert!(e.is_timeout()),
        other => panic!("Expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_dispatch_sends_encoded_frame() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PREDICT_PATH))
        .and(body_string_contains("fake-jpeg-payload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([{"name": "stop_sign"}])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = InferenceClient::new(&mock_server.uri()).unwrap();
    let frame = EncodedFrame {
        tag: DispatchTag { epoch: 0, seq: 0 },
        bytes: Bytes::from_static(FAKE_JPEG),
        width: 4,
        height: 4,
    };
    let result = client.dispatch(frame).await.unwrap();

    assert_eq!(result.label.as_deref(), Some("stop_sign"));
}
