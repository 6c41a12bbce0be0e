// FFprobe wrapper for stream bitrate and container duration

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::{CamStampError, Result};

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    streams: Option<Vec<FFprobeStream>>,
    format: Option<FFprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
}

/// What the encoder needs to know about an input.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Bits per second of the first audio stream; None when there is no audio
    /// stream or it does not report a bitrate.
    pub audio_bitrate: Option<f64>,
    /// Container duration in seconds.
    pub duration_secs: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Run ffprobe on a file and extract stream info
pub fn probe(path: &Path) -> Result<StreamInfo> {
    let output = Command::new(crate::tools::ffprobe_path())
        .args([
            "-v", "error",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| CamStampError::FFprobe(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CamStampError::FFprobe(format!(
            "ffprobe failed on {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    parse_probe_json(&output.stdout)
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_json(stdout: &[u8]) -> Result<StreamInfo> {
    let probe_output: FFprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| CamStampError::FFprobe(format!("Failed to parse ffprobe output: {}", e)))?;

    let mut audio_bitrate = None;
    let mut width = None;
    let mut height = None;

    if let Some(ref streams) = probe_output.streams {
        for stream in streams {
            match stream.codec_type.as_deref() {
                Some("audio") if audio_bitrate.is_none() => {
                    audio_bitrate = stream.bit_rate.as_ref().and_then(|s| s.parse().ok());
                }
                Some("video") if width.is_none() => {
                    width = stream.width;
                    height = stream.height;
                }
                _ => {}
            }
        }
    }

    let duration_secs = probe_output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| CamStampError::FFprobe("ffprobe reported no container duration".to_string()))?;

    Ok(StreamInfo {
        audio_bitrate,
        duration_secs,
        width,
        height,
    })
}
