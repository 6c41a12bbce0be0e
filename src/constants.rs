// camstamp Constants

// Input filtering
pub const PHOTO_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "m4v"];

/// External programs the video pipeline runs.
pub const VIDEO_TOOLS: [&str; 3] = ["exiftool", "ffprobe", "ffmpeg"];

// Output
pub const DEFAULT_OUTPUT_DIR: &str = "out";
pub const JPEG_QUALITY: u8 = 95;

// Overlay
pub const DEFAULT_FONT_PATH: &str = "TaipeiSansTCBeta-Bold.ttf";
pub const DEFAULT_TEXT_COLOR: [u8; 3] = [255, 0, 0];
pub const FONT_SIZE_DIVISOR: f64 = 40.0; // font size = frame diagonal / 40
pub const PHOTO_INSET_X_FACTOR: f64 = 10.0; // x = w - 10 * font size
pub const PHOTO_INSET_Y_FACTOR: f64 = 1.2; // y = h - 1.2 * font size
pub const VIDEO_MARGIN_PX: u32 = 20;

// Video
pub const DEFAULT_RESOLUTION: u32 = 1080; // short side; 0 keeps source resolution
pub const DEFAULT_TARGET_SIZE_MB: u64 = 28;
pub const BYTES_PER_MB: u64 = 1024 * 1024;
pub const VIDEO_CODEC: &str = "libx264";
pub const DRAW_PRESET: &str = "ultrafast";
pub const COMPRESS_PRESET: &str = "medium";
pub const DRAWN_SUFFIX: &str = ".drawn.mp4";
pub const PASS_TMP_SUFFIX: &str = "tmp.mp4";
pub const PASS_LOG_SUFFIX: &str = "pass";

// x264 preset names accepted by --preset
pub const X264_PRESETS: [&str; 10] = [
    "ultrafast", "superfast", "veryfast", "faster", "fast",
    "medium", "slow", "slower", "veryslow", "placebo",
];

// Plate recognition (OpenALPR linux defaults)
pub const ALPR_CONFIG_PATH: &str = "/etc/openalpr/openalpr.conf";
pub const ALPR_COUNTRY: &str = "us";
