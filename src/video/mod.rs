// Video pipeline
//
// resolve recording start -> draw running clock (and scale) -> two-pass
// compress to the size target -> drop the drawn intermediate unless asked to
// keep it.

pub mod encoder;
pub mod transcode;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use self::encoder::BitrateTargetEncoder;
use self::transcode::Transcoder;
use crate::config::VideoOptions;
use crate::constants::{DRAWN_SUFFIX, VIDEO_CODEC};
use crate::error::{CamStampError, Result};
use crate::overlay::drawtext;
use crate::timestamp::{self, CaptureProbe};

/// A video being processed. Only the path and the resolved start are held;
/// frames stay with ffmpeg.
#[derive(Debug, Clone)]
pub struct Video {
    source_path: PathBuf,
    resolved_start: Option<DateTime<Local>>,
}

impl Video {
    pub fn new(path: &Path) -> Self {
        Self {
            source_path: path.to_path_buf(),
            resolved_start: None,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn file_name(&self) -> Result<String> {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CamStampError::InvalidPath(self.source_path.display().to_string()))
    }

    /// Resolve the recording start once; later calls return the cached value.
    pub fn resolve_start(&mut self, probe: &dyn CaptureProbe) -> Result<DateTime<Local>> {
        if let Some(start) = self.resolved_start {
            return Ok(start);
        }
        let start = timestamp::resolve_video(probe, &self.source_path)?;
        self.resolved_start = Some(start);
        Ok(start)
    }

    pub fn start(&self) -> Option<DateTime<Local>> {
        self.resolved_start
    }

    pub fn reset_start(&mut self) {
        self.resolved_start = None;
    }
}

/// ffmpeg arguments for the drawing transcode.
pub fn draw_args(input: &Path, output: &Path, filter: &str, preset: &str) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(), input.to_string_lossy().into_owned(),
        "-vf".into(), filter.into(),
        "-c:v".into(), VIDEO_CODEC.into(),
        "-preset".into(), preset.into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// What a processed video produced.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOutcome {
    /// The final file: compressed output, or the drawn file in draw-only mode.
    pub output: PathBuf,
    /// The drawn intermediate, if it was kept.
    pub drawn: Option<PathBuf>,
    pub start: DateTime<Local>,
    pub video_bitrate: Option<f64>,
}

/// Everything a video needs besides its own file.
pub struct VideoContext<'a> {
    pub probe: &'a dyn CaptureProbe,
    pub transcoder: &'a dyn Transcoder,
    pub options: &'a VideoOptions,
}

/// Burn the running clock into `video`, writing `output`.
pub fn draw_timestamp(
    video: &mut Video,
    output: &Path,
    ctx: &VideoContext,
) -> Result<DateTime<Local>> {
    let start = video.resolve_start(ctx.probe)?;
    let filter = drawtext::video_filter(
        ctx.options.resolution,
        &ctx.options.style.font_path,
        start.timestamp(),
        ctx.options.style.color,
    );
    let args = draw_args(video.source_path(), output, &filter, &ctx.options.draw_preset);
    ctx.transcoder.run(&args)?;
    log::info!("Drew {} from {} into {}", video.source_path().display(), start, output.display());
    Ok(start)
}

/// Run one video through the pipeline.
pub fn process_video(path: &Path, ctx: &VideoContext) -> Result<VideoOutcome> {
    let mut video = Video::new(path);
    let name = video.file_name()?;
    let options = ctx.options;

    let drawn = options.output_dir.join(format!("{}{}", name, DRAWN_SUFFIX));
    let start = draw_timestamp(&mut video, &drawn, ctx)?;

    if options.draw_only {
        return Ok(VideoOutcome {
            output: drawn.clone(),
            drawn: Some(drawn),
            start,
            video_bitrate: None,
        });
    }

    let output = options.output_dir.join(&name);
    let bitrate = BitrateTargetEncoder::new(ctx.transcoder).encode(
        &drawn,
        &output,
        options.target_size_bytes(),
    )?;

    let kept = if options.keeps_uncompressed() {
        Some(drawn)
    } else {
        std::fs::remove_file(&drawn)?;
        None
    };

    Ok(VideoOutcome {
        output,
        drawn: kept,
        start,
        video_bitrate: Some(bitrate),
    })
}
