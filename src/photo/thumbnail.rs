// Embedded thumbnail regeneration
//
// After rotation and drawing, the EXIF thumbnail no longer matches the
// picture. It is rebuilt from the final pixels at the old thumbnail's size.
// This step is best effort: a failure is logged and the old thumbnail stays.

use image::imageops::FilterType;
use image::GenericImageView;

use super::{encode_image, Photo};
use crate::error::{CamStampError, Result};
use crate::metadata::{MetadataCodec, MetadataStore};

/// Outcome of a thumbnail resync.
#[derive(Debug, Clone, PartialEq)]
pub enum ThumbnailSync {
    /// The photo has no embedded thumbnail.
    Unchanged,
    Updated { width: u32, height: u32 },
    /// The old thumbnail was kept.
    Failed(String),
}

pub fn resync(photo: &mut Photo, codec: &dyn MetadataCodec) -> ThumbnailSync {
    if photo.metadata.thumbnail().is_none() {
        return ThumbnailSync::Unchanged;
    }

    match regenerate(photo, codec) {
        Ok((metadata, width, height)) => {
            photo.metadata = metadata;
            ThumbnailSync::Updated { width, height }
        }
        Err(e) => {
            log::warn!(
                "{}: could not regenerate thumbnail, keeping the original: {}",
                photo.display_name(),
                e
            );
            ThumbnailSync::Failed(e.to_string())
        }
    }
}

/// Build the updated tag set without touching the photo.
fn regenerate(photo: &Photo, codec: &dyn MetadataCodec) -> Result<(MetadataStore, u32, u32)> {
    let existing = photo.metadata.thumbnail().unwrap_or_default();
    let (bound_w, bound_h) = image::load_from_memory(existing)
        .map_err(|e| CamStampError::Thumbnail(format!("cannot decode embedded thumbnail: {}", e)))?
        .dimensions();

    // Fits inside the old bounds, aspect ratio preserved; never enlarged
    let (width, height) = photo.image.dimensions();
    let thumb = photo
        .image
        .resize(bound_w.min(width), bound_h.min(height), FilterType::Lanczos3);
    let bytes = encode_image(&thumb, photo.format)?;

    let mut metadata = photo.metadata.clone();
    metadata.set_thumbnail(Some(bytes));
    codec.dump(&metadata)?;

    Ok((metadata, thumb.width(), thumb.height()))
}
