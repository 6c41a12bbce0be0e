// Pipeline configuration
//
// Populated from CLI flags; Default carries the documented defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{
    ALPR_CONFIG_PATH, ALPR_COUNTRY, BYTES_PER_MB, DEFAULT_FONT_PATH, DEFAULT_OUTPUT_DIR,
    DEFAULT_RESOLUTION, DEFAULT_TARGET_SIZE_MB, DEFAULT_TEXT_COLOR, DRAW_PRESET,
};
use crate::error::CamStampError;

/// RGB text color for the burned-in timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextColor(pub [u8; 3]);

impl Default for TextColor {
    fn default() -> Self {
        TextColor(DEFAULT_TEXT_COLOR)
    }
}

impl TextColor {
    /// `0xRRGGBB` form understood by ffmpeg's drawtext.
    pub fn to_ffmpeg(&self) -> String {
        let [r, g, b] = self.0;
        format!("0x{:02X}{:02X}{:02X}", r, g, b)
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02X}{:02X}{:02X}", r, g, b)
    }
}

impl FromStr for TextColor {
    type Err = CamStampError;

    /// Accepts a color name, `#RRGGBB`, or `R,G,B`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let named = match s.to_lowercase().as_str() {
            "red" => Some([255, 0, 0]),
            "green" => Some([0, 255, 0]),
            "blue" => Some([0, 0, 255]),
            "white" => Some([255, 255, 255]),
            "black" => Some([0, 0, 0]),
            "yellow" => Some([255, 255, 0]),
            "orange" => Some([255, 165, 0]),
            _ => None,
        };
        if let Some(rgb) = named {
            return Ok(TextColor(rgb));
        }

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() == 6 && hex.is_ascii() {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
                if let (Ok(r), Ok(g), Ok(b)) = (channel(0), channel(2), channel(4)) {
                    return Ok(TextColor([r, g, b]));
                }
            }
        }

        let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
        if parts.len() == 3 {
            let parsed: Vec<u8> = parts.iter().filter_map(|p| p.parse().ok()).collect();
            if parsed.len() == 3 {
                return Ok(TextColor([parsed[0], parsed[1], parsed[2]]));
            }
        }

        Err(CamStampError::Other(format!("Unrecognized color: {}", s)))
    }
}

/// Font and color of the timestamp overlay.
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub font_path: PathBuf,
    pub color: TextColor,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            color: TextColor::default(),
        }
    }
}

/// Options for a photo batch.
#[derive(Debug, Clone)]
pub struct PhotoOptions {
    pub output_dir: PathBuf,
    /// Skip plate clustering and leave every photo in `output_dir`.
    pub single_directory: bool,
    pub style: OverlayStyle,
    pub alpr_config: PathBuf,
    pub alpr_country: String,
}

impl Default for PhotoOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            single_directory: false,
            style: OverlayStyle::default(),
            alpr_config: PathBuf::from(ALPR_CONFIG_PATH),
            alpr_country: ALPR_COUNTRY.to_string(),
        }
    }
}

/// Options for a video batch.
#[derive(Debug, Clone)]
pub struct VideoOptions {
    pub output_dir: PathBuf,
    /// Short-side resolution of the output; None keeps the source resolution.
    pub resolution: Option<u32>,
    pub target_size_mb: u64,
    pub save_uncompressed: bool,
    pub draw_only: bool,
    pub style: OverlayStyle,
    pub draw_preset: String,
}

impl VideoOptions {
    /// Saturates instead of overflowing on absurd sizes.
    pub fn target_size_bytes(&self) -> u64 {
        self.target_size_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Draw-only runs never compress, so the drawn file is the result and must be kept.
    pub fn keeps_uncompressed(&self) -> bool {
        self.save_uncompressed || self.draw_only
    }
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            resolution: Some(DEFAULT_RESOLUTION),
            target_size_mb: DEFAULT_TARGET_SIZE_MB,
            save_uncompressed: false,
            draw_only: false,
            style: OverlayStyle::default(),
            draw_preset: DRAW_PRESET.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!("red".parse::<TextColor>().unwrap(), TextColor([255, 0, 0]));
        assert_eq!("White".parse::<TextColor>().unwrap(), TextColor([255, 255, 255]));
        assert_eq!("#10A0ff".parse::<TextColor>().unwrap(), TextColor([0x10, 0xA0, 0xFF]));
        assert_eq!("1, 2,3".parse::<TextColor>().unwrap(), TextColor([1, 2, 3]));
        assert!("chartreuse-ish".parse::<TextColor>().is_err());
        assert!("300,0,0".parse::<TextColor>().is_err());
        assert!("#12345".parse::<TextColor>().is_err());
    }

    #[test]
    fn test_color_formats() {
        let c = TextColor([255, 0, 16]);
        assert_eq!(c.to_ffmpeg(), "0xFF0010");
        assert_eq!(c.to_string(), "#FF0010");
        assert_eq!(TextColor::default(), TextColor([255, 0, 0]));
    }

    #[test]
    fn test_video_defaults() {
        let opts = VideoOptions::default();
        assert_eq!(opts.resolution, Some(1080));
        assert_eq!(opts.target_size_bytes(), 28 * 1024 * 1024);
        assert!(!opts.keeps_uncompressed());

        let draw_only = VideoOptions { draw_only: true, ..VideoOptions::default() };
        assert!(draw_only.keeps_uncompressed());

        let huge = VideoOptions { target_size_mb: u64::MAX / 2, ..VideoOptions::default() };
        assert_eq!(huge.target_size_bytes(), u64::MAX);
    }
}
