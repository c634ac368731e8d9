//! Inference dispatch: one multipart upload per sampled frame.
//!
//! The remote service answers with a JSON array of detections; only the first
//! entry's label and spoken audio are used.

mod client;
mod types;

pub use client::{
    Dispatch, InferenceClient, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT,
    ENDPOINT_ENV, PREDICT_PATH, UPLOAD_FIELD, UPLOAD_FILE_NAME,
};
pub use types::{parse_predictions, Detection, InferenceError, InferenceResult, Prediction};
