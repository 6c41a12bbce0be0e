// Photo pipeline
//
// load -> resolve timestamp -> fix orientation -> burn timestamp ->
// resync thumbnail -> save. Each photo is processed independently; any error
// fails that photo only.

pub mod orientation;
pub mod thumbnail;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use crate::config::TextColor;
use crate::constants::JPEG_QUALITY;
use crate::error::{CamStampError, Result};
use crate::metadata::exif_codec::embed_exif;
use crate::metadata::{MetadataCodec, MetadataStore};
use crate::overlay::{self, TextPainter};
use crate::timestamp::{self, CaptureTime};

/// A photo being processed: decoded pixels plus its embedded tag set.
#[derive(Debug, Clone)]
pub struct Photo {
    source_path: PathBuf,
    pub image: DynamicImage,
    pub format: ImageFormat,
    pub metadata: MetadataStore,
    resolved_timestamp: Option<CaptureTime>,
}

impl Photo {
    /// Decode the image and load its metadata. Only JPEG carries EXIF here;
    /// other formats get an empty tag set.
    pub fn open(path: &Path, codec: &dyn MetadataCodec) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let format = image::guess_format(&bytes)?;
        let image = image::load_from_memory_with_format(&bytes, format)?;
        let metadata = if format == ImageFormat::Jpeg {
            codec.load(path)?
        } else {
            MetadataStore::new()
        };
        Ok(Self::from_parts(path, image, format, metadata))
    }

    pub fn from_parts(
        path: &Path,
        image: DynamicImage,
        format: ImageFormat,
        metadata: MetadataStore,
    ) -> Self {
        Self {
            source_path: path.to_path_buf(),
            image,
            format,
            metadata,
            resolved_timestamp: None,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn display_name(&self) -> String {
        self.source_path.display().to_string()
    }

    /// Resolve the capture time once. Later calls return the cached value even
    /// if the metadata has changed since; only `reset_timestamp` clears it.
    pub fn resolve_timestamp(&mut self) -> Result<CaptureTime> {
        if let Some(t) = self.resolved_timestamp {
            return Ok(t);
        }
        let t = timestamp::resolve_photo(&self.metadata, &self.display_name())?;
        self.resolved_timestamp = Some(t);
        Ok(t)
    }

    pub fn timestamp(&self) -> Option<CaptureTime> {
        self.resolved_timestamp
    }

    pub fn reset_timestamp(&mut self) {
        self.resolved_timestamp = None;
    }

    /// Encode pixels and metadata and write them to `dest` through a temp file.
    pub fn save(&self, dest: &Path, codec: &dyn MetadataCodec) -> Result<()> {
        let encoded = encode_image(&self.image, self.format)?;
        let bytes = if self.format == ImageFormat::Jpeg {
            let tiff = codec.dump(&self.metadata).map_err(|e| CamStampError::MetadataCorrupt {
                file: self.display_name(),
                message: e.to_string(),
                dump: self.metadata.dump_text(),
            })?;
            embed_exif(encoded, tiff)?
        } else {
            encoded
        };

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = dest.with_extension("tmp");
        std::fs::write(&tmp_path, &bytes)?;
        std::fs::rename(&tmp_path, dest).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            CamStampError::Io(e)
        })?;
        Ok(())
    }
}

/// Encode an image in the given container format.
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    if format == ImageFormat::Jpeg {
        let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
        DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
    } else {
        image.write_to(&mut buf, format)?;
    }
    Ok(buf.into_inner())
}

/// A photo that made it to the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedPhoto {
    pub path: PathBuf,
    pub timestamp: CaptureTime,
}

/// Everything a photo needs besides its own file.
pub struct PhotoContext<'a> {
    pub codec: &'a dyn MetadataCodec,
    pub painter: &'a dyn TextPainter,
    pub color: TextColor,
    pub output_dir: &'a Path,
}

/// Run one photo through the pipeline and save it as `<output_dir>/<file name>`.
pub fn process_photo(path: &Path, ctx: &PhotoContext) -> Result<ProcessedPhoto> {
    let file_name = path
        .file_name()
        .ok_or_else(|| CamStampError::InvalidPath(path.display().to_string()))?;

    let mut photo = Photo::open(path, ctx.codec)?;
    let captured = photo.resolve_timestamp()?;

    if orientation::normalize(&mut photo, ctx.codec)? {
        log::debug!("{}: orientation normalized", photo.display_name());
    }

    overlay::render_photo(&mut photo, &captured.canonical(), ctx.painter, ctx.color);

    if let thumbnail::ThumbnailSync::Updated { width, height } =
        thumbnail::resync(&mut photo, ctx.codec)
    {
        log::debug!("{}: thumbnail regenerated at {}x{}", photo.display_name(), width, height);
    }

    let dest = ctx.output_dir.join(file_name);
    photo.save(&dest, ctx.codec)?;
    log::info!("{} -> {} [{}]", path.display(), dest.display(), captured);

    Ok(ProcessedPhoto {
        path: dest,
        timestamp: captured,
    })
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
