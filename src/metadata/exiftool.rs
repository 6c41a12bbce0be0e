// ExifTool wrapper for video capture metadata
//
// Video containers record CreateDate in UTC; Duration is read in seconds (-n).

use std::path::Path;
use std::process::Command;

use chrono::NaiveDateTime;

use crate::error::{CamStampError, Result};
use crate::timestamp::{CaptureInfo, CaptureProbe};

/// Capture probe backed by the exiftool binary.
#[derive(Debug, Clone, Default)]
pub struct ExifToolProbe;

impl ExifToolProbe {
    pub fn new() -> Self {
        ExifToolProbe
    }
}

impl CaptureProbe for ExifToolProbe {
    fn capture_info(&self, path: &Path) -> Result<CaptureInfo> {
        let output = Command::new(crate::tools::exiftool_path())
            .args(["-j", "-n", "-CreateDate", "-Duration"])
            .arg(path)
            .output()
            .map_err(|e| CamStampError::ExifTool(format!("Failed to run exiftool: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CamStampError::ExifTool(format!(
                "exiftool failed on {}: {}",
                path.display(),
                stderr.trim()
            )));
        }

        parse_capture_json(&output.stdout, path)
    }
}

/// Parse `exiftool -j -n -CreateDate -Duration` output.
pub fn parse_capture_json(stdout: &[u8], path: &Path) -> Result<CaptureInfo> {
    let raw: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| CamStampError::ExifTool(format!("Failed to parse exiftool JSON: {}", e)))?;

    // exiftool returns an array; take the first element
    let entry = raw
        .as_array()
        .and_then(|a| a.first())
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    let file = path.display().to_string();

    let created_utc = entry
        .get("CreateDate")
        .and_then(value_to_string)
        .and_then(|s| parse_exif_datetime(&s))
        .ok_or_else(|| CamStampError::MetadataMissing {
            file: file.clone(),
            tag: "CreateDate".to_string(),
        })?;

    let duration_secs = entry
        .get("Duration")
        .and_then(value_to_f64)
        .ok_or_else(|| CamStampError::MetadataMissing {
            file,
            tag: "Duration".to_string(),
        })?;

    Ok(CaptureInfo {
        created_utc,
        duration_secs,
    })
}

/// Convert a JSON value to string (handles both string and numeric values).
fn value_to_string(val: &serde_json::Value) -> Option<String> {
    match val {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_f64(val: &serde_json::Value) -> Option<f64> {
    match val {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('s').trim().parse().ok(),
        _ => None,
    }
}

/// "YYYY:MM:DD HH:MM:SS"; the all-zero placeholder some cameras write counts as absent.
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y:%m:%d %H:%M:%S").ok()
}
