// Capture timestamp resolution
//
// Photos carry their capture time in EXIF as local wall-clock time. Videos get
// theirs from the container: CreateDate is UTC and, on the cameras this tool
// targets, marks the end of the recording, so the duration is subtracted.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::error::{CamStampError, Result};
use crate::metadata::MetadataStore;

const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static EXIF_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{4}):(\d{2}):(\d{2})[ T](\d{2}:\d{2}:\d{2})")
        .expect("EXIF date pattern compiles")
});

/// Capture instant in local wall-clock time, displayed as "YYYY-MM-DD HH:MM:SS".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureTime(NaiveDateTime);

impl CaptureTime {
    pub fn new(datetime: NaiveDateTime) -> Self {
        CaptureTime(datetime)
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Parse the EXIF form "YYYY:MM:DD HH:MM:SS". The date's colons become
    /// hyphens; the time is kept as written. Sub-second suffixes and trailing
    /// NULs are ignored.
    pub fn from_exif(raw: &str, file: &str) -> Result<Self> {
        let corrupt = |message: String| CamStampError::MetadataCorrupt {
            file: file.to_string(),
            message,
            dump: format!("DateTimeOriginal = {:?}", raw),
        };

        let caps = EXIF_DATETIME
            .captures(raw.trim_end_matches('\0'))
            .ok_or_else(|| corrupt("capture time is not in YYYY:MM:DD HH:MM:SS form".to_string()))?;

        let canonical = format!("{}-{}-{} {}", &caps[1], &caps[2], &caps[3], &caps[4]);
        NaiveDateTime::parse_from_str(&canonical, CANONICAL_FORMAT)
            .map(CaptureTime)
            .map_err(|e| corrupt(format!("invalid capture time {}: {}", canonical, e)))
    }

    /// "YYYY-MM-DD HH:MM:SS"
    pub fn canonical(&self) -> String {
        self.0.format(CANONICAL_FORMAT).to_string()
    }

    /// Directory stamp "YYMMDD-HHMM": separators stripped from the canonical
    /// form, one hyphen between date and time, century digits dropped.
    pub fn dir_stamp(&self) -> String {
        let compact: String = self
            .canonical()
            .chars()
            .filter(|c| *c != '-' && *c != ':')
            .collect();
        let hyphenated = compact.replacen(' ', "-", 1);
        // "20230704-102030" -> "230704-1020"
        hyphenated[2..13].to_string()
    }
}

impl fmt::Display for CaptureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Photo strategy: the original-capture-time tag. Missing tag is fatal.
pub fn resolve_photo(metadata: &MetadataStore, file: &str) -> Result<CaptureTime> {
    let raw = metadata
        .date_time_original()
        .ok_or_else(|| CamStampError::MetadataMissing {
            file: file.to_string(),
            tag: "DateTimeOriginal".to_string(),
        })?;
    CaptureTime::from_exif(raw, file)
}

/// Creation time and duration reported by the container.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureInfo {
    pub created_utc: NaiveDateTime,
    pub duration_secs: f64,
}

/// Source of container capture metadata for videos.
pub trait CaptureProbe {
    fn capture_info(&self, path: &Path) -> Result<CaptureInfo>;
}

/// Start of the recording in `tz`: the UTC creation time converted, minus the
/// duration. None when the duration is unusable or reaches outside chrono's range.
pub fn recording_start<Tz: TimeZone>(info: &CaptureInfo, tz: &Tz) -> Option<DateTime<Tz>> {
    if !info.duration_secs.is_finite() || info.duration_secs < 0.0 {
        return None;
    }
    let millis = (info.duration_secs * 1000.0).round();
    if millis >= i64::MAX as f64 {
        return None;
    }
    let created = Utc.from_utc_datetime(&info.created_utc).with_timezone(tz);
    created.checked_sub_signed(Duration::try_milliseconds(millis as i64)?)
}

/// Video strategy: probe the container and back-date its end-of-recording stamp.
pub fn resolve_video(probe: &dyn CaptureProbe, path: &Path) -> Result<DateTime<Local>> {
    let info = probe.capture_info(path)?;
    let start = recording_start(&info, &Local).ok_or_else(|| CamStampError::MetadataCorrupt {
        file: path.display().to_string(),
        message: format!("invalid duration {}", info.duration_secs),
        dump: format!("{:?}", info),
    })?;
    log::debug!(
        "{}: created {} UTC, {:.3}s long, starts {}",
        path.display(),
        info.created_utc,
        info.duration_secs,
        start
    );
    Ok(start)
}
