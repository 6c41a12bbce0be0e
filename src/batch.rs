// Batch runners
//
// One pass over the discovered inputs. A failing item is logged with its
// filename and counted; it never stops the batch.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{PhotoOptions, VideoOptions};
use crate::constants::{PHOTO_EXTENSIONS, VIDEO_EXTENSIONS, VIDEO_TOOLS};
use crate::discover::{discover, Discovery};
use crate::error::{CamStampError, Result};
use crate::metadata::exif_codec::ExifCodec;
use crate::metadata::exiftool::ExifToolProbe;
use crate::overlay::OverlayFont;
use crate::photo::{process_photo, PhotoContext, ProcessedPhoto};
use crate::plate::alpr::AlprEngine;
use crate::plate::{self, PlateRecognizer};
use crate::tools;
use crate::video::transcode::FfmpegTranscoder;
use crate::video::{process_video, VideoContext};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Photos moved into a plate directory.
    pub clustered: usize,
}

/// Stamp every photo among `inputs`, then cluster by plate unless
/// `single_directory` is set.
pub fn run_photo_batch(inputs: &[PathBuf], options: &PhotoOptions) -> Result<BatchResult> {
    std::fs::create_dir_all(&options.output_dir)?;
    let font = OverlayFont::load(&options.style.font_path)?;
    let codec = ExifCodec::new();
    let discovery = discover(inputs, &PHOTO_EXTENSIONS);

    let ctx = PhotoContext {
        codec: &codec,
        painter: &font,
        color: options.style.color,
        output_dir: &options.output_dir,
    };

    let mut engine = if options.single_directory || discovery.files.is_empty() {
        None
    } else {
        match AlprEngine::init(&options.alpr_config, &options.alpr_country) {
            Ok(engine) => Some(engine),
            Err(e) => {
                log::error!("Plate recognition unavailable, photos stay in {}: {}", options.output_dir.display(), e);
                None
            }
        }
    };

    let result = run_photos(
        &discovery,
        &ctx,
        engine.as_mut().map(|e| e as &mut dyn PlateRecognizer),
    );

    if let Some(engine) = engine {
        engine.unload();
    }
    Ok(result)
}

/// Photo loop with the collaborators supplied by the caller.
pub fn run_photos(
    discovery: &Discovery,
    ctx: &PhotoContext,
    recognizer: Option<&mut dyn PlateRecognizer>,
) -> BatchResult {
    let mut result = BatchResult {
        total: discovery.files.len() + discovery.skipped.len(),
        skipped: discovery.skipped.len(),
        ..BatchResult::default()
    };

    let mut processed: Vec<ProcessedPhoto> = Vec::new();
    for (idx, path) in discovery.files.iter().enumerate() {
        log::info!("[{}/{}] {}", idx + 1, discovery.files.len(), path.display());
        match process_photo(path, ctx) {
            Ok(photo) => {
                result.processed += 1;
                processed.push(photo);
            }
            Err(e) => {
                result.failed += 1;
                log::error!("Failed to process {}: {}", path.display(), e);
            }
        }
    }

    if let Some(recognizer) = recognizer {
        result.clustered = cluster_into_dirs(processed, recognizer, ctx.output_dir);
    }
    result
}

/// Recognize, group and move. Returns the number of photos moved.
fn cluster_into_dirs(
    photos: Vec<ProcessedPhoto>,
    recognizer: &mut dyn PlateRecognizer,
    output_dir: &Path,
) -> usize {
    if photos.is_empty() {
        return 0;
    }
    let outcome = plate::cluster(photos, recognizer);
    for c in &outcome.clusters {
        log::info!("Plate {}: {} photos", c.plate, c.items.len());
    }
    if !outcome.unclustered.is_empty() {
        log::info!("{} photos without a plate stay in {}", outcome.unclustered.len(), output_dir.display());
    }

    let assignments = plate::assignments(&outcome.clusters);
    let report = plate::dispatch_clusters(output_dir, &assignments);
    report.moved
}

/// Stamp and compress every video among `inputs`.
pub fn run_video_batch(inputs: &[PathBuf], options: &VideoOptions) -> Result<BatchResult> {
    if !options.style.font_path.is_file() {
        return Err(CamStampError::Font(format!(
            "Font {} not found",
            options.style.font_path.display()
        )));
    }
    std::fs::create_dir_all(&options.output_dir)?;

    let discovery = discover(inputs, &VIDEO_EXTENSIONS);
    if !discovery.files.is_empty() {
        let missing = tools::missing_tools(&VIDEO_TOOLS);
        if !missing.is_empty() {
            log::error!("Cannot process videos without {}", missing.join(", "));
            return Err(CamStampError::ToolMissing(missing.join(", ")));
        }
    }

    let probe = ExifToolProbe::new();
    let transcoder = FfmpegTranscoder::new();
    let ctx = VideoContext {
        probe: &probe,
        transcoder: &transcoder,
        options,
    };
    Ok(run_videos(&discovery, &ctx))
}

/// Video loop with the collaborators supplied by the caller.
pub fn run_videos(discovery: &Discovery, ctx: &VideoContext) -> BatchResult {
    let mut result = BatchResult {
        total: discovery.files.len() + discovery.skipped.len(),
        skipped: discovery.skipped.len(),
        ..BatchResult::default()
    };

    for (idx, path) in discovery.files.iter().enumerate() {
        log::info!("[{}/{}] {}", idx + 1, discovery.files.len(), path.display());
        match process_video(path, ctx) {
            Ok(outcome) => {
                result.processed += 1;
                log::info!("{} -> {}", path.display(), outcome.output.display());
            }
            Err(e) => {
                result.failed += 1;
                log::error!("Failed to process {}: {}", path.display(), e);
            }
        }
    }
    result
}
