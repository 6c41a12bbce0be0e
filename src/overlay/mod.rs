// Timestamp overlay
//
// Text size scales with the frame diagonal so the stamp reads the same on a
// phone snapshot and a 4K frame. Photos are drawn here; videos hand the same
// geometry to ffmpeg's drawtext filter (see `drawtext`).

pub mod drawtext;

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, RgbImage};

use crate::config::TextColor;
use crate::constants::{FONT_SIZE_DIVISOR, PHOTO_INSET_X_FACTOR, PHOTO_INSET_Y_FACTOR};
use crate::error::{CamStampError, Result};
use crate::photo::Photo;

/// round(sqrt(w² + h²) / 40)
pub fn font_size(width: u32, height: u32) -> u32 {
    let (w, h) = (width as f64, height as f64);
    ((w * w + h * h).sqrt() / FONT_SIZE_DIVISOR).round() as u32
}

/// Top-left corner of the photo stamp, inset from the bottom-right by
/// 10 and 1.2 font sizes. May be negative on very narrow images.
pub fn photo_anchor(width: u32, height: u32, font_size: u32) -> (i32, i32) {
    let size = font_size as f64;
    let x = width as i64 - (PHOTO_INSET_X_FACTOR * size) as i64;
    let y = height as i64 - (PHOTO_INSET_Y_FACTOR * size) as i64;
    (x as i32, y as i32)
}

/// Something that can rasterize a line of text onto an RGB canvas.
pub trait TextPainter {
    fn paint(&self, canvas: &mut RgbImage, origin: (i32, i32), size: u32, color: TextColor, text: &str);
}

/// TrueType/OpenType font loaded once per batch.
pub struct OverlayFont {
    font: FontVec,
}

impl OverlayFont {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            CamStampError::Font(format!("Cannot read font {}: {}", path.display(), e))
        })?;
        let font = FontVec::try_from_vec(data).map_err(|e| {
            CamStampError::Font(format!("Cannot parse font {}: {}", path.display(), e))
        })?;
        Ok(Self { font })
    }
}

impl TextPainter for OverlayFont {
    fn paint(&self, canvas: &mut RgbImage, origin: (i32, i32), size: u32, color: TextColor, text: &str) {
        imageproc::drawing::draw_text_mut(
            canvas,
            image::Rgb(color.0),
            origin.0,
            origin.1,
            PxScale::from(size as f32),
            &self.font,
            text,
        );
    }
}

/// Burn `text` into the bottom-right of the photo.
pub fn render_photo(photo: &mut Photo, text: &str, painter: &dyn TextPainter, color: TextColor) {
    let (width, height) = (photo.image.width(), photo.image.height());
    let size = font_size(width, height);
    let origin = photo_anchor(width, height, size);

    let mut canvas = photo.image.to_rgb8();
    painter.paint(&mut canvas, origin, size, color, text);
    photo.image = DynamicImage::ImageRgb8(canvas);

    log::debug!(
        "{}: drew {:?} at {:?}, size {}",
        photo.display_name(),
        text,
        origin,
        size
    );
}
