//! Prediction endpoint response model.

use serde_json::Value;
use thiserror::Error;

use crate::presentation::AudioClip;

/// One entry of the endpoint's JSON array.
///
/// Only `name` and `audio` drive the presentation; the detector also reports
/// a bounding box and confidence which are kept when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prediction {
    pub name: Option<String>,
    /// Base64-encoded WAV of the spoken label
    pub audio: Option<String>,
    pub confidence: Option<f64>,
    pub class: Option<i64>,
    pub xmin: Option<f64>,
    pub ymin: Option<f64>,
    pub xmax: Option<f64>,
    pub ymax: Option<f64>,
}

impl Prediction {
    /// Read the known fields of one array entry.
    ///
    /// A field of the wrong JSON type is treated as absent, and a non-object
    /// entry yields an empty prediction.
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let number = |key: &str| value.get(key).and_then(Value::as_f64);

        Self {
            name: text("name"),
            audio: text("audio"),
            confidence: number("confidence"),
            class: value.get("class").and_then(Value::as_i64),
            xmin: number("xmin"),
            ymin: number("ymin"),
            xmax: number("xmax"),
            ymax: number("ymax"),
        }
    }
}

/// Where and how sure the detector was about the first prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub confidence: Option<f64>,
    pub class: Option<i64>,
    /// `[xmin, ymin, xmax, ymax]` in source pixels, when all four are present
    pub bbox: Option<[f64; 4]>,
}

/// What the presentation layer receives for one successful request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceResult {
    pub label: Option<String>,
    pub audio: Option<AudioClip>,
    pub detection: Option<Detection>,
}

impl InferenceResult {
    /// A result with only a label.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Build from the first prediction; an absent entry means "nothing seen".
    ///
    /// Undecodable audio is dropped with a warning; the label still applies.
    pub fn from_prediction(prediction: Option<Prediction>) -> Self {
        let Some(prediction) = prediction else {
            return Self::default();
        };

        let audio = prediction
            .audio
            .as_deref()
            .filter(|encoded| !encoded.is_empty())
            .and_then(|encoded| match AudioClip::from_base64(encoded) {
                Ok(clip) => Some(clip),
                Err(e) => {
                    log::warn!("Ignoring undecodable audio in prediction: {}", e);
                    None
                }
            });

        let bbox = match (prediction.xmin, prediction.ymin, prediction.xmax, prediction.ymax) {
            (Some(x0), Some(y0), Some(x1), Some(y1)) => Some([x0, y0, x1, y1]),
            _ => None,
        };
        let detection = (prediction.confidence.is_some() || prediction.class.is_some() || bbox.is_some())
            .then_some(Detection {
                confidence: prediction.confidence,
                class: prediction.class,
                bbox,
            });

        Self {
            label: prediction.name.filter(|name| !name.is_empty()),
            audio,
            detection,
        }
    }
}

/// Errors from one inference request. None of them are retried.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("prediction endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed prediction response: {0}")]
    MalformedResponse(String),

    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Parse a response body into the result for its first entry.
///
/// The body must be a JSON array; entries after the first are not inspected.
pub fn parse_predictions(body: &str) -> Result<InferenceResult, InferenceError> {
    let predictions: Vec<Value> =
        serde_json::from_str(body).map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;
    Ok(InferenceResult::from_prediction(
        predictions.first().map(Prediction::from_value),
    ))
}
