// camstamp Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CamStampError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// A tag the pipeline cannot do without is absent (e.g. no capture time).
    #[error("Metadata missing in {file}: {tag}")]
    MetadataMissing { file: String, tag: String },

    /// Metadata could not be decoded or re-serialized. `dump` holds the full tag set.
    #[error("Metadata corrupt in {file}: {message}\n{dump}")]
    MetadataCorrupt {
        file: String,
        message: String,
        dump: String,
    },

    #[error("Thumbnail error: {0}")]
    Thumbnail(String),

    #[error("ExifTool error: {0}")]
    ExifTool(String),

    #[error("FFprobe error: {0}")]
    FFprobe(String),

    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("OpenALPR error: {0}")]
    Alpr(String),

    #[error("Required tools not found: {0}")]
    ToolMissing(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

impl CamStampError {
    /// True for failures reported by an external process (probe, transcode, recognition).
    pub fn is_external_tool_failure(&self) -> bool {
        matches!(
            self,
            CamStampError::ExifTool(_)
                | CamStampError::FFprobe(_)
                | CamStampError::FFmpeg(_)
                | CamStampError::Alpr(_)
                | CamStampError::ToolMissing(_)
        )
    }
}

impl From<anyhow::Error> for CamStampError {
    fn from(err: anyhow::Error) -> Self {
        CamStampError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CamStampError>;
