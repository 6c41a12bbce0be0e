// ffmpeg filter strings for the video timestamp
//
// The clock is ffmpeg's own: `%{pts:localtime:<epoch>}` renders the recording
// start plus the frame's presentation time, so the stamp ticks with the video.

use std::path::Path;

use crate::config::TextColor;
use crate::constants::{FONT_SIZE_DIVISOR, VIDEO_MARGIN_PX};

/// Escape a value for use inside a drawtext option.
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// Same diagonal rule as photos, evaluated by ffmpeg on the scaled frame.
pub fn font_size_expr() -> String {
    format!("round(sqrt(w*w+h*h)/{})", FONT_SIZE_DIVISOR)
}

/// Scale so the short side becomes `resolution`, keeping the aspect ratio
/// with an even long side.
pub fn scale_filter(resolution: u32) -> String {
    format!("scale='iw*{r}/min(iw,ih)':-2", r = resolution)
}

/// Running wall-clock stamp in the bottom-right corner.
pub fn timestamp_filter(font_path: &Path, start_epoch: i64, color: TextColor) -> String {
    format!(
        "drawtext=fontfile={font}:fontsize={size}:\
         text='%{{pts\\:localtime\\:{start}}}':\
         x=w-tw-{margin}:y=h-lh-{margin}:fontcolor={color}:box=0",
        font = escape_filter_value(&font_path.to_string_lossy()),
        size = font_size_expr(),
        start = start_epoch,
        margin = VIDEO_MARGIN_PX,
        color = color.to_ffmpeg(),
    )
}

/// Full `-vf` chain: optional scale, then the stamp.
pub fn video_filter(
    resolution: Option<u32>,
    font_path: &Path,
    start_epoch: i64,
    color: TextColor,
) -> String {
    let stamp = timestamp_filter(font_path, start_epoch, color);
    match resolution {
        Some(r) => format!("{},{}", scale_filter(r), stamp),
        None => stamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("plain.ttf"), "plain.ttf");
        assert_eq!(escape_filter_value("C:\\Fonts\\a.ttf"), "C\\:\\\\Fonts\\\\a.ttf");
        assert_eq!(escape_filter_value("it's"), "it\\'s");
    }

    #[test]
    fn test_font_size_expr() {
        assert_eq!(font_size_expr(), "round(sqrt(w*w+h*h)/40)");
    }

    #[test]
    fn test_timestamp_filter() {
        let f = timestamp_filter(Path::new("/fonts/a.ttf"), 1688428800, TextColor([255, 0, 0]));
        assert_eq!(
            f,
            "drawtext=fontfile=/fonts/a.ttf:fontsize=round(sqrt(w*w+h*h)/40):\
             text='%{pts\\:localtime\\:1688428800}':\
             x=w-tw-20:y=h-lh-20:fontcolor=0xFF0000:box=0"
        );
    }

    #[test]
    fn test_video_filter_with_and_without_scale() {
        let font = Path::new("a.ttf");
        let color = TextColor::default();

        let scaled = video_filter(Some(1080), font, 0, color);
        assert!(scaled.starts_with("scale='iw*1080/min(iw,ih)':-2,drawtext="));

        let native = video_filter(None, font, 0, color);
        assert!(native.starts_with("drawtext="));
        assert!(!native.contains("scale="));
    }
}
