//! Still-image encoding for sampled frames.

use std::fmt;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use thiserror::Error;

use crate::camera::Frame;

/// MIME type of every encoded frame.
pub const JPEG_MIME: &str = "image/jpeg";

/// Default JPEG quality for sampled frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Identity of one dispatch: the camera epoch it was captured in and its
/// position within that epoch. Orders by epoch first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DispatchTag {
    pub epoch: u64,
    pub seq: u64,
}

impl fmt::Display for DispatchTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.epoch, self.seq)
    }
}

/// Compressed bytes of one sampled frame, ready to upload.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub tag: DispatchTag,
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Displayable form of a sampled frame. Shares its bytes with the
/// [`EncodedFrame`] produced on the same tick.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tag: DispatchTag,
    pub jpeg: Bytes,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame buffer is {actual} bytes, expected {expected} for its dimensions")]
    BufferSize { expected: usize, actual: usize },

    #[error("JPEG encode failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// Encode `frame` as JPEG and return the snapshot/upload pair for `tag`.
pub fn encode_frame(
    frame: Frame,
    quality: u8,
    tag: DispatchTag,
) -> Result<(Snapshot, EncodedFrame), EncodeError> {
    let expected = frame.expected_len();
    if frame.data.len() != expected {
        return Err(EncodeError::BufferSize {
            expected,
            actual: frame.data.len(),
        });
    }

    let (width, height) = (frame.width, frame.height);
    let rgb = RgbImage::from_raw(width, height, frame.data).ok_or(EncodeError::BufferSize {
        expected,
        actual: 0,
    })?;

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(&rgb)?;
    let jpeg = Bytes::from(buffer);

    let snapshot = Snapshot {
        tag,
        jpeg: jpeg.clone(),
        width,
        height,
    };
    let encoded = EncodedFrame {
        tag,
        bytes: jpeg,
        width,
        height,
    };
    Ok((snapshot, encoded))
}
