//! InferenceClient - uploads sampled frames to the prediction endpoint.

use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use reqwest::Url;

use super::types::{parse_predictions, InferenceError, InferenceResult};
use crate::sampler::{EncodedFrame, JPEG_MIME};

/// Environment variable overriding the endpoint base URL.
pub const ENDPOINT_ENV: &str = "SYMBOL_DETECT_ENDPOINT";

/// Default base URL of the prediction service.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Path of the prediction route under the base URL.
pub const PREDICT_PATH: &str = "/api/predict/";

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "file";

/// File name sent with each upload.
pub const UPLOAD_FILE_NAME: &str = "captured-image.jpeg";

/// Default timeout for a whole request (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends one frame per request. Anything that can answer a frame with an
/// [`InferenceResult`] can stand in for the HTTP client.
pub trait Dispatch: Send + Sync {
    fn dispatch(
        &self,
        frame: EncodedFrame,
    ) -> BoxFuture<'static, Result<InferenceResult, InferenceError>>;
}

/// HTTP client for `POST {base_url}/api/predict/`.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    predict_url: Url,
    http_client: reqwest::Client,
}

impl InferenceClient {
    /// Create a client with the default timeouts.
    pub fn new(base_url: &str) -> Result<Self, InferenceError> {
        Self::with_timeouts(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a client with explicit timeouts.
    ///
    /// # Errors
    /// `InferenceError::InvalidEndpoint` if `base_url` is not an http(s) URL,
    /// `InferenceError::Build` if the HTTP client cannot be constructed.
    pub fn with_timeouts(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let predict_url = predict_url(base_url)?;
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(InferenceError::Build)?;

        Ok(Self {
            predict_url,
            http_client,
        })
    }

    /// Full URL requests are posted to.
    pub fn predict_url(&self) -> &str {
        self.predict_url.as_str()
    }

    /// Upload one JPEG and parse the first prediction.
    ///
    /// # Errors
    ///
    /// `InferenceError::Status` for a non-2xx response,
    /// `InferenceError::MalformedResponse` if the body is not a JSON array,
    /// `InferenceError::Http` if the request itself fails.
    pub async fn predict(&self, jpeg: Bytes) -> Result<InferenceResult, InferenceError> {
        let part = Part::bytes(jpeg.to_vec())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(JPEG_MIME)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http_client
            .post(self.predict_url.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_predictions(&body)
    }
}

impl Dispatch for InferenceClient {
    fn dispatch(
        &self,
        frame: EncodedFrame,
    ) -> BoxFuture<'static, Result<InferenceResult, InferenceError>> {
        let client = self.clone();
        Box::pin(async move { client.predict(frame.bytes).await })
    }
}

fn predict_url(base_url: &str) -> Result<Url, InferenceError> {
    let invalid = |reason: String| InferenceError::InvalidEndpoint {
        url: base_url.to_string(),
        reason,
    };

    let base = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
    }

    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), PREDICT_PATH);
    Url::parse(&joined).map_err(|e| invalid(e.to_string()))
}
