// camstamp library
//
// Burns capture timestamps into dash-cam style photos and videos. Photos are
// upright-corrected, stamped, and optionally grouped by license plate; videos
// get a running clock and are compressed to a size target.

pub mod batch;
pub mod config;
pub mod constants;
pub mod discover;
pub mod error;
pub mod metadata;
pub mod overlay;
pub mod photo;
pub mod plate;
pub mod timestamp;
pub mod tools;
pub mod video;

pub use batch::{run_photo_batch, run_video_batch, BatchResult};
pub use error::{CamStampError, Result};
