// External transcoder seam
//
// Everything the video pipeline asks of ffmpeg/ffprobe goes through the
// Transcoder trait so the pipeline can be exercised without the binaries.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{CamStampError, Result};
use crate::metadata::ffprobe::{self, StreamInfo};
use crate::tools::ffmpeg_path;

/// Number of trailing stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

pub trait Transcoder {
    /// Audio bitrate and duration of an input.
    fn probe(&self, input: &Path) -> Result<StreamInfo>;

    /// Run one transcode with the given ffmpeg arguments.
    fn run(&self, args: &[String]) -> Result<()>;
}

/// The real thing: ffprobe and ffmpeg child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegTranscoder;

impl FfmpegTranscoder {
    pub fn new() -> Self {
        FfmpegTranscoder
    }
}

impl Transcoder for FfmpegTranscoder {
    fn probe(&self, input: &Path) -> Result<StreamInfo> {
        ffprobe::probe(input)
    }

    fn run(&self, args: &[String]) -> Result<()> {
        let ffmpeg = ffmpeg_path();
        log::debug!("{} {}", ffmpeg.display(), args.join(" "));

        let mut child = Command::new(&ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CamStampError::FFmpeg(format!("Failed to start FFmpeg: {}", e)))?;

        // ffmpeg rewrites its progress line with '\r', so split on that too
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        if let Some(stderr) = child.stderr.take() {
            for chunk in BufReader::new(stderr).split(b'\r').map_while(|c| c.ok()) {
                for line in String::from_utf8_lossy(&chunk).lines() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Some(secs) = parse_ffmpeg_time(line) {
                        log::trace!("ffmpeg progress: {:.1}s", secs);
                    }
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| CamStampError::FFmpeg(format!("FFmpeg process error: {}", e)))?;

        if !status.success() {
            let lines: Vec<String> = tail.into_iter().collect();
            return Err(CamStampError::FFmpeg(format!(
                "FFmpeg exited with code {}:\n{}",
                status.code().unwrap_or(-1),
                lines.join("\n")
            )));
        }
        Ok(())
    }
}

/// Seconds from a "time=HH:MM:SS.ms" progress line.
pub fn parse_ffmpeg_time(line: &str) -> Option<f64> {
    let idx = line.find("time=")?;
    let after = &line[idx + 5..];
    let end = after.find(|c: char| c.is_whitespace()).unwrap_or(after.len());
    let time_str = &after[..end];

    // "N/A" and negative start offsets
    if time_str.starts_with('-') || time_str.starts_with('N') {
        return None;
    }

    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
