//! ASCII previews of snapshots for terminal display.
//!
//! The JPEG is decoded, converted to luminance, averaged into a character
//! grid and mapped onto a density ramp.

use serde::{Deserialize, Serialize};

use crate::sampler::Snapshot;

/// Standard ASCII density ramp (10 levels), darkest first.
pub const STANDARD_CHARSET: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Unicode block ramp (5 levels).
pub const BLOCKS_CHARSET: &[char] = &[' ', '░', '▒', '▓', '█'];

/// Minimal ramp (4 levels).
pub const MINIMAL_CHARSET: &[char] = &[' ', '.', ':', '#'];

/// Terminal cells are roughly twice as tall as they are wide.
pub const CHAR_ASPECT_RATIO: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CharSet {
    #[default]
    Standard,
    Blocks,
    Minimal,
}

impl CharSet {
    pub fn chars(&self) -> &'static [char] {
        match self {
            CharSet::Standard => STANDARD_CHARSET,
            CharSet::Blocks => BLOCKS_CHARSET,
            CharSet::Minimal => MINIMAL_CHARSET,
        }
    }
}

/// Render `snapshot` as lines of text `width` characters wide.
pub fn render_preview(
    snapshot: &Snapshot,
    width: u16,
    charset: CharSet,
) -> Result<Vec<String>, image::ImageError> {
    let luma = image::load_from_memory(&snapshot.jpeg)?.to_luma8();
    let (img_w, img_h) = luma.dimensions();
    let (cols, rows) = grid_size(img_w, img_h, width);

    let brightness = downsample(luma.as_raw(), img_w, img_h, cols, rows);
    let chars = map_to_chars(&brightness, charset.chars());

    Ok(chars
        .chunks(cols.max(1) as usize)
        .map(|row| row.iter().collect())
        .collect())
}

/// Character grid for an image, keeping its aspect ratio.
fn grid_size(img_width: u32, img_height: u32, cols: u16) -> (u16, u16) {
    if img_width == 0 || img_height == 0 || cols == 0 {
        return (0, 0);
    }
    let rows = (cols as f32 * img_height as f32 / img_width as f32 * CHAR_ASPECT_RATIO).round();
    (cols, (rows as u16).max(1))
}

/// Average the brightness of every pixel under each character cell.
fn downsample(gray: &[u8], img_width: u32, img_height: u32, cols: u16, rows: u16) -> Vec<u8> {
    if cols == 0 || rows == 0 || img_width == 0 || img_height == 0 || gray.is_empty() {
        return Vec::new();
    }

    let cell_w = img_width as f32 / cols as f32;
    let cell_h = img_height as f32 / rows as f32;
    let mut result = Vec::with_capacity(cols as usize * rows as usize);

    for cy in 0..rows {
        for cx in 0..cols {
            let start_x = (cx as f32 * cell_w) as u32;
            let end_x = (((cx + 1) as f32 * cell_w) as u32).max(start_x + 1);
            let start_y = (cy as f32 * cell_h) as u32;
            let end_y = (((cy + 1) as f32 * cell_h) as u32).max(start_y + 1);

            let mut sum = 0u32;
            let mut count = 0u32;
            for py in start_y..end_y.min(img_height) {
                for px in start_x..end_x.min(img_width) {
                    if let Some(&v) = gray.get((py * img_width + px) as usize) {
                        sum += v as u32;
                        count += 1;
                    }
                }
            }
            result.push(if count > 0 { (sum / count) as u8 } else { 0 });
        }
    }

    result
}

fn map_to_chars(brightness: &[u8], charset: &[char]) -> Vec<char> {
    if charset.is_empty() {
        return vec![' '; brightness.len()];
    }
    let levels = charset.len();
    brightness
        .iter()
        .map(|&b| charset[(b as usize * (levels - 1)) / 255])
        .collect()
}
