// EXIF orientation normalization
//
// Bakes the orientation tag into the pixels and resets the tag to 1, so
// viewers that ignore the tag show the same picture as viewers that honor it.
// Rotations below are clockwise, matching the image crate.

use image::{DynamicImage, ImageFormat};

use super::Photo;
use crate::error::{CamStampError, Result};
use crate::metadata::MetadataCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Normal,
    MirrorHorizontal,
    Rotate180,
    MirrorVertical,
    /// Mirror across the top-left to bottom-right diagonal.
    Transpose,
    Rotate90,
    /// Mirror across the top-right to bottom-left diagonal.
    Transverse,
    Rotate270,
}

impl Orientation {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Orientation::Normal),
            2 => Some(Orientation::MirrorHorizontal),
            3 => Some(Orientation::Rotate180),
            4 => Some(Orientation::MirrorVertical),
            5 => Some(Orientation::Transpose),
            6 => Some(Orientation::Rotate90),
            7 => Some(Orientation::Transverse),
            8 => Some(Orientation::Rotate270),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Orientation::Normal => 1,
            Orientation::MirrorHorizontal => 2,
            Orientation::Rotate180 => 3,
            Orientation::MirrorVertical => 4,
            Orientation::Transpose => 5,
            Orientation::Rotate90 => 6,
            Orientation::Transverse => 7,
            Orientation::Rotate270 => 8,
        }
    }

    /// True for the four codes that swap width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Orientation::Transpose
                | Orientation::Rotate90
                | Orientation::Transverse
                | Orientation::Rotate270
        )
    }

    /// Pixels as they should be displayed.
    pub fn apply(self, image: &DynamicImage) -> DynamicImage {
        match self {
            Orientation::Normal => image.clone(),
            Orientation::MirrorHorizontal => image.fliph(),
            Orientation::Rotate180 => image.rotate180(),
            Orientation::MirrorVertical => image.flipv(),
            Orientation::Transpose => image.rotate90().fliph(),
            Orientation::Rotate90 => image.rotate90(),
            Orientation::Transverse => image.rotate270().fliph(),
            Orientation::Rotate270 => image.rotate270(),
        }
    }
}

/// Normalize a JPEG's orientation in place. Returns true if the pixels changed.
///
/// The new pixels and the reset metadata are committed together, and only
/// after the metadata has been shown to serialize; on failure the photo is
/// left exactly as it was and the error carries a full tag dump.
pub fn normalize(photo: &mut Photo, codec: &dyn MetadataCodec) -> Result<bool> {
    if photo.format != ImageFormat::Jpeg {
        return Ok(false);
    }

    let code = photo.metadata.orientation();
    let orientation = match Orientation::from_code(code) {
        Some(Orientation::Normal) => return Ok(false),
        Some(o) => o,
        None => {
            log::warn!(
                "{}: ignoring out-of-range orientation {}",
                photo.display_name(),
                code
            );
            return Ok(false);
        }
    };

    let mut metadata = photo.metadata.clone();
    metadata.reset_orientation();
    if metadata.coerce_scene_type() {
        log::debug!("{}: rewrote integer SceneType as a byte", photo.display_name());
    }

    if let Err(e) = codec.dump(&metadata) {
        return Err(CamStampError::MetadataCorrupt {
            file: photo.display_name(),
            message: e.to_string(),
            dump: metadata.dump_text(),
        });
    }

    photo.image = orientation.apply(&photo.image);
    photo.metadata = metadata;
    log::debug!(
        "{}: applied orientation {} ({:?})",
        photo.display_name(),
        code,
        orientation
    );
    Ok(true)
}
