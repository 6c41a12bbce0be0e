// EXIF codec backed by kamadak-exif and img-parts
//
// img-parts pulls the APP1 segment out of (and back into) the JPEG; it hands
// over the bare TIFF structure without the "Exif\0\0" header. kamadak-exif
// parses that structure and writes it back through its experimental Writer.
// Pointer and offset tags are owned by the Writer, so they never enter the
// MetadataStore; the thumbnail travels as raw bytes instead.

use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

use exif::experimental::Writer;
use exif::{Context, Field, In, Rational, Reader, SRational, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

use super::{tags, Ifd, MetadataCodec, MetadataStore, TagValue};
use crate::error::{CamStampError, Result};

/// Tags whose value is a single UNDEFINED byte in the EXIF standard.
const SINGLE_BYTE_UNDEFINED: [u16; 2] = [tags::SCENE_TYPE, tags::FILE_SOURCE];

/// APP1 length field (u16) minus itself and the "Exif\0\0" header.
const MAX_APP1_PAYLOAD: usize = 65535 - 2 - 6;

/// EXIF codec for JPEG files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifCodec;

impl ExifCodec {
    pub fn new() -> Self {
        ExifCodec
    }

    /// Load the tag set from an in-memory JPEG. A JPEG without an APP1 EXIF
    /// segment yields an empty store.
    pub fn load_jpeg(&self, bytes: &[u8]) -> Result<MetadataStore> {
        let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes))
            .map_err(|e| CamStampError::Encode(format!("Not a readable JPEG: {}", e)))?;

        match jpeg.exif() {
            Some(tiff) => self.parse_tiff(tiff.to_vec()),
            None => Ok(MetadataStore::new()),
        }
    }

    /// Parse a bare TIFF/EXIF structure.
    pub fn parse_tiff(&self, tiff: Vec<u8>) -> Result<MetadataStore> {
        let exif = Reader::new()
            .read_raw(tiff)
            .map_err(|e| CamStampError::Encode(format!("Failed to parse EXIF: {}", e)))?;

        let mut store = MetadataStore::new();
        store.set_little_endian(exif.little_endian());

        for field in exif.fields() {
            if is_writer_owned(field.tag) {
                continue;
            }
            let Some(ifd) = ifd_of(field.tag, field.ifd_num) else {
                log::debug!("Skipping tag {} in IFD {:?}", field.tag, field.ifd_num);
                continue;
            };
            match from_exif_value(&field.value) {
                Some(value) => store.set(ifd, field.tag.number(), value),
                None => log::debug!("Skipping tag {} with unknown value type", field.tag),
            }
        }

        let offset = exif
            .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)
            .and_then(|f| f.value.get_uint(0));
        let length = exif
            .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)
            .and_then(|f| f.value.get_uint(0));
        if let (Some(offset), Some(length)) = (offset, length) {
            let start = offset as usize;
            let end = start.saturating_add(length as usize);
            match exif.buf().get(start..end) {
                Some(thumb) => store.set_thumbnail(Some(thumb.to_vec())),
                None => log::warn!("Thumbnail offset {}+{} lies outside the EXIF block", offset, length),
            }
        }

        Ok(store)
    }

    /// Check that every value can be written with its standard field type.
    fn validate(&self, store: &MetadataStore) -> Result<()> {
        for tag in SINGLE_BYTE_UNDEFINED {
            if let Some(value) = store.get(Ifd::Exif, tag) {
                if !matches!(value, TagValue::Undefined(_)) {
                    return Err(CamStampError::Encode(format!(
                        "Tag 0x{:04X} must be a byte sequence, found {} {:?}",
                        tag,
                        value.type_name(),
                        value
                    )));
                }
            }
        }
        Ok(())
    }
}

impl MetadataCodec for ExifCodec {
    fn load(&self, path: &Path) -> Result<MetadataStore> {
        let bytes = std::fs::read(path)?;
        self.load_jpeg(&bytes).map_err(|e| CamStampError::MetadataCorrupt {
            file: path.display().to_string(),
            message: e.to_string(),
            dump: String::from("<undecodable>"),
        })
    }

    fn dump(&self, store: &MetadataStore) -> Result<Vec<u8>> {
        if store.is_empty() {
            return Ok(Vec::new());
        }
        // Some cameras store SceneType as an integer; the writer needs the byte form
        let mut store = Cow::Borrowed(store);
        if store.scene_type().is_some_and(|v| !matches!(v, TagValue::Undefined(_)))
            && store.to_mut().coerce_scene_type()
        {
            log::debug!("Rewrote integer SceneType as a byte");
        }
        let store: &MetadataStore = &store;
        self.validate(store)?;

        let fields: Vec<Field> = store
            .iter()
            .map(|(ifd, tag, value)| Field {
                tag: Tag(context_of(ifd), tag),
                ifd_num: if ifd == Ifd::Thumbnail { In::THUMBNAIL } else { In::PRIMARY },
                value: to_exif_value(value),
            })
            .collect();

        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        if let Some(thumb) = store.thumbnail() {
            writer.set_jpeg(thumb, In::THUMBNAIL);
        }

        let mut out = Cursor::new(Vec::new());
        writer
            .write(&mut out, store.is_little_endian())
            .map_err(|e| CamStampError::Encode(format!("Failed to write EXIF: {}", e)))?;
        let tiff = out.into_inner();
        if tiff.len() > MAX_APP1_PAYLOAD {
            return Err(CamStampError::Encode(format!(
                "EXIF block of {} bytes does not fit in a JPEG APP1 segment",
                tiff.len()
            )));
        }
        Ok(tiff)
    }
}

/// Replace the EXIF segment of a JPEG. Empty `tiff` removes it.
pub fn embed_exif(jpeg_bytes: Vec<u8>, tiff: Vec<u8>) -> Result<Vec<u8>> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(jpeg_bytes))
        .map_err(|e| CamStampError::Encode(format!("Not a readable JPEG: {}", e)))?;

    let segment = if tiff.is_empty() { None } else { Some(Bytes::from(tiff)) };
    jpeg.set_exif(segment);

    let mut out = Vec::new();
    jpeg.encoder().write_to(&mut out)?;
    Ok(out)
}

/// Pointer and data-offset tags are regenerated by the Writer on every dump.
fn is_writer_owned(tag: Tag) -> bool {
    tag == Tag::ExifIFDPointer
        || tag == Tag::GPSInfoIFDPointer
        || tag == Tag::InteropIFDPointer
        || tag == Tag::JPEGInterchangeFormat
        || tag == Tag::JPEGInterchangeFormatLength
        || tag == Tag::StripOffsets
        || tag == Tag::StripByteCounts
        || tag == Tag::TileOffsets
        || tag == Tag::TileByteCounts
}

fn ifd_of(tag: Tag, ifd_num: In) -> Option<Ifd> {
    let primary = ifd_num == In::PRIMARY;
    #[allow(unreachable_patterns)]
    match tag.context() {
        Context::Tiff if primary => Some(Ifd::Primary),
        Context::Tiff if ifd_num == In::THUMBNAIL => Some(Ifd::Thumbnail),
        Context::Exif if primary => Some(Ifd::Exif),
        Context::Gps if primary => Some(Ifd::Gps),
        Context::Interop if primary => Some(Ifd::Interop),
        _ => None,
    }
}

fn context_of(ifd: Ifd) -> Context {
    match ifd {
        Ifd::Primary | Ifd::Thumbnail => Context::Tiff,
        Ifd::Exif => Context::Exif,
        Ifd::Gps => Context::Gps,
        Ifd::Interop => Context::Interop,
    }
}

fn from_exif_value(value: &Value) -> Option<TagValue> {
    let converted = match value {
        Value::Byte(v) => TagValue::Byte(v.clone()),
        Value::Ascii(parts) => {
            let first = parts.first().map(|p| p.as_slice()).unwrap_or(&[]);
            TagValue::Ascii(
                String::from_utf8_lossy(first)
                    .trim_end_matches('\0')
                    .to_string(),
            )
        }
        Value::Short(v) => TagValue::Short(v.clone()),
        Value::Long(v) => TagValue::Long(v.clone()),
        Value::Rational(v) => TagValue::Rational(v.iter().map(|r| (r.num, r.denom)).collect()),
        Value::SByte(v) => TagValue::SByte(v.clone()),
        Value::Undefined(v, _) => TagValue::Undefined(v.clone()),
        Value::SShort(v) => TagValue::SShort(v.clone()),
        Value::SLong(v) => TagValue::SLong(v.clone()),
        Value::SRational(v) => TagValue::SRational(v.iter().map(|r| (r.num, r.denom)).collect()),
        Value::Float(v) => TagValue::Float(v.clone()),
        Value::Double(v) => TagValue::Double(v.clone()),
        _ => return None,
    };
    Some(converted)
}

fn to_exif_value(value: &TagValue) -> Value {
    match value {
        TagValue::Byte(v) => Value::Byte(v.clone()),
        TagValue::Ascii(s) => Value::Ascii(vec![s.clone().into_bytes()]),
        TagValue::Short(v) => Value::Short(v.clone()),
        TagValue::Long(v) => Value::Long(v.clone()),
        TagValue::Rational(v) => Value::Rational(
            v.iter().map(|&(num, denom)| Rational { num, denom }).collect(),
        ),
        TagValue::SByte(v) => Value::SByte(v.clone()),
        TagValue::Undefined(v) => Value::Undefined(v.clone(), 0),
        TagValue::SShort(v) => Value::SShort(v.clone()),
        TagValue::SLong(v) => Value::SLong(v.clone()),
        TagValue::SRational(v) => Value::SRational(
            v.iter().map(|&(num, denom)| SRational { num, denom }).collect(),
        ),
        TagValue::Float(v) => Value::Float(v.clone()),
        TagValue::Double(v) => Value::Double(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};

    fn sample_store() -> MetadataStore {
        let mut store = MetadataStore::new();
        store.set(Ifd::Primary, tags::ORIENTATION, TagValue::Short(vec![6]));
        store.set(Ifd::Primary, 0x010F, TagValue::Ascii("CamCo".to_string()));
        store.set(
            Ifd::Exif,
            tags::DATE_TIME_ORIGINAL,
            TagValue::Ascii("2023:07:04 10:20:30".to_string()),
        );
        store.set(Ifd::Exif, tags::SCENE_TYPE, TagValue::Undefined(vec![1]));
        store.set(Ifd::Thumbnail, tags::ORIENTATION, TagValue::Short(vec![6]));
        store
    }

    fn tiny_jpeg() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 4, image::Rgb([10, 20, 30])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_dump_and_parse_preserves_tags_and_thumbnail() {
        let codec = ExifCodec::new();
        let mut store = sample_store();
        let thumb = tiny_jpeg();
        store.set_thumbnail(Some(thumb.clone()));

        let tiff = codec.dump(&store).unwrap();
        let parsed = codec.parse_tiff(tiff).unwrap();

        assert_eq!(parsed.orientation(), 6);
        assert_eq!(parsed.date_time_original(), Some("2023:07:04 10:20:30"));
        assert_eq!(parsed.scene_type(), Some(&TagValue::Undefined(vec![1])));
        assert_eq!(parsed.thumbnail(), Some(thumb.as_slice()));
        assert_eq!(
            parsed.get(Ifd::Thumbnail, tags::ORIENTATION).and_then(|v| v.as_integer()),
            Some(6)
        );
        // Offsets are regenerated, never stored
        assert!(parsed.get(Ifd::Thumbnail, 0x0201).is_none());
    }

    #[test]
    fn test_integer_scene_type_is_written_as_byte() {
        let codec = ExifCodec::new();
        for value in [TagValue::Byte(vec![1]), TagValue::Short(vec![1]), TagValue::Long(vec![1])] {
            let mut store = sample_store();
            store.set(Ifd::Exif, tags::SCENE_TYPE, value.clone());

            let parsed = codec.parse_tiff(codec.dump(&store).unwrap()).unwrap();
            assert_eq!(parsed.scene_type(), Some(&TagValue::Undefined(vec![1])), "{:?}", value);
            // The caller's store is left alone
            assert_eq!(store.scene_type(), Some(&value));
        }
    }

    #[test]
    fn test_wide_scene_type_fails_dump() {
        let mut store = sample_store();
        store.set(Ifd::Exif, tags::SCENE_TYPE, TagValue::Long(vec![300]));

        let err = ExifCodec::new().dump(&store).unwrap_err();
        assert!(err.to_string().contains("0xA301"), "unexpected error: {}", err);
    }

    #[test]
    fn test_embed_then_load_jpeg() {
        let codec = ExifCodec::new();
        let tiff = codec.dump(&sample_store()).unwrap();
        let jpeg = embed_exif(tiny_jpeg(), tiff).unwrap();

        let loaded = codec.load_jpeg(&jpeg).unwrap();
        assert_eq!(loaded.orientation(), 6);
        assert_eq!(loaded.date_time_original(), Some("2023:07:04 10:20:30"));

        // The image itself still decodes
        let img = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((img.width(), img.height()), (8, 4));
    }

    #[test]
    fn test_jpeg_without_exif_loads_empty() {
        let codec = ExifCodec::new();
        let loaded = codec.load_jpeg(&tiny_jpeg()).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.orientation(), 1);
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        match ExifCodec::new().load(&path) {
            Err(CamStampError::MetadataCorrupt { file, .. }) => assert!(file.ends_with("broken.jpg")),
            other => panic!("expected MetadataCorrupt, got {:?}", other),
        }
    }
}
