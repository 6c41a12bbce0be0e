// Metadata module
//
// MetadataStore is the in-memory tag set of a single photo. The codec that
// moves it in and out of a file sits behind MetadataCodec; the concrete
// implementation lives in exif_codec. exiftool and ffprobe wrap the external
// probes used for videos.

pub mod exif_codec;
pub mod exiftool;
pub mod ffprobe;

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;

/// Tag numbers the pipeline reads or writes.
pub mod tags {
    pub const ORIENTATION: u16 = 0x0112;
    pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
    pub const SCENE_TYPE: u16 = 0xA301;
    pub const FILE_SOURCE: u16 = 0xA300;
}

/// Metadata block a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ifd {
    /// 0th IFD: primary image description
    Primary,
    Exif,
    Gps,
    Interop,
    /// 1st IFD: describes the embedded thumbnail
    Thumbnail,
}

impl Ifd {
    pub fn name(&self) -> &'static str {
        match self {
            Ifd::Primary => "0th",
            Ifd::Exif => "Exif",
            Ifd::Gps => "GPS",
            Ifd::Interop => "Interop",
            Ifd::Thumbnail => "1st",
        }
    }
}

/// A tag value, typed after the TIFF field types.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(Vec<u8>),
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl TagValue {
    /// The value as a single unsigned integer, if it is one (count 1, integer type).
    pub fn as_integer(&self) -> Option<u32> {
        match self {
            TagValue::Byte(v) if v.len() == 1 => Some(v[0] as u32),
            TagValue::Short(v) if v.len() == 1 => Some(v[0] as u32),
            TagValue::Long(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_ascii(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TagValue::Byte(_) => "BYTE",
            TagValue::Ascii(_) => "ASCII",
            TagValue::Short(_) => "SHORT",
            TagValue::Long(_) => "LONG",
            TagValue::Rational(_) => "RATIONAL",
            TagValue::SByte(_) => "SBYTE",
            TagValue::Undefined(_) => "UNDEFINED",
            TagValue::SShort(_) => "SSHORT",
            TagValue::SLong(_) => "SLONG",
            TagValue::SRational(_) => "SRATIONAL",
            TagValue::Float(_) => "FLOAT",
            TagValue::Double(_) => "DOUBLE",
        }
    }
}

/// In-memory tag set of one media item.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataStore {
    tags: BTreeMap<(Ifd, u16), TagValue>,
    thumbnail: Option<Vec<u8>>,
    little_endian: bool,
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self {
            tags: BTreeMap::new(),
            thumbnail: None,
            little_endian: false,
        }
    }
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ifd: Ifd, tag: u16) -> Option<&TagValue> {
        self.tags.get(&(ifd, tag))
    }

    pub fn set(&mut self, ifd: Ifd, tag: u16, value: TagValue) {
        self.tags.insert((ifd, tag), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ifd, u16, &TagValue)> {
        self.tags.iter().map(|((ifd, tag), v)| (*ifd, *tag, v))
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.thumbnail.is_none()
    }

    /// True if any tag is stored in the given block.
    pub fn has_section(&self, ifd: Ifd) -> bool {
        self.tags.keys().any(|(i, _)| *i == ifd)
    }

    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    pub fn set_little_endian(&mut self, little_endian: bool) {
        self.little_endian = little_endian;
    }

    /// Orientation code from the primary block; 1 (normal) when absent or unreadable.
    pub fn orientation(&self) -> u16 {
        self.get(Ifd::Primary, tags::ORIENTATION)
            .and_then(|v| v.as_integer())
            .map(|v| v as u16)
            .unwrap_or(1)
    }

    /// Force the orientation to normal in the primary block, and in the
    /// thumbnail block when the item has one.
    pub fn reset_orientation(&mut self) {
        self.set(Ifd::Primary, tags::ORIENTATION, TagValue::Short(vec![1]));
        if self.has_section(Ifd::Thumbnail) || self.thumbnail.is_some() {
            self.set(Ifd::Thumbnail, tags::ORIENTATION, TagValue::Short(vec![1]));
        }
    }

    /// Raw original-capture-time string, e.g. "2023:07:04 10:20:30".
    pub fn date_time_original(&self) -> Option<&str> {
        self.get(Ifd::Exif, tags::DATE_TIME_ORIGINAL)
            .and_then(|v| v.as_ascii())
    }

    pub fn scene_type(&self) -> Option<&TagValue> {
        self.get(Ifd::Exif, tags::SCENE_TYPE)
    }

    /// Some encoders store the one-byte scene type as a bare integer instead of
    /// a length-1 byte sequence, which cannot be re-serialized. Rewrites that
    /// case in place; returns true if a rewrite happened.
    pub fn coerce_scene_type(&mut self) -> bool {
        let coerced = match self.scene_type() {
            Some(TagValue::Undefined(_)) | None => None,
            Some(v) => v
                .as_integer()
                .and_then(|n| u8::try_from(n).ok())
                .map(|b| TagValue::Undefined(vec![b])),
        };
        match coerced {
            Some(value) => {
                self.set(Ifd::Exif, tags::SCENE_TYPE, value);
                true
            }
            None => false,
        }
    }

    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    pub fn set_thumbnail(&mut self, bytes: Option<Vec<u8>>) {
        self.thumbnail = bytes;
    }

    /// Human readable dump of every tag, attached to corrupt-metadata errors.
    pub fn dump_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "byte order: {}",
            if self.little_endian { "II" } else { "MM" }
        );
        let mut current: Option<Ifd> = None;
        for ((ifd, tag), value) in &self.tags {
            if current != Some(*ifd) {
                let _ = writeln!(out, "[{}]", ifd.name());
                current = Some(*ifd);
            }
            let _ = writeln!(out, "  0x{:04X} {}: {:?}", tag, value.type_name(), value);
        }
        if let Some(ref thumb) = self.thumbnail {
            let _ = writeln!(out, "[thumbnail] {} bytes", thumb.len());
        }
        out
    }
}

/// Reads and writes the tag set of a media file.
pub trait MetadataCodec {
    /// Load the tag set embedded in the file at `path`.
    fn load(&self, path: &Path) -> Result<MetadataStore>;

    /// Serialize a tag set into the bytes that get embedded back into the file.
    fn dump(&self, store: &MetadataStore) -> Result<Vec<u8>>;
}
