// External tool resolver for ffmpeg/ffprobe/exiftool/alpr
//
// Resolution order:
// 1) Environment variable override (CAMSTAMP_FFMPEG_PATH, etc.)
// 2) Binary next to the executable
// 3) bin/ subdirectory next to the executable
// 4) PATH fallback

use std::env;
use std::path::PathBuf;
use std::process::Command;

/// Get the directory containing the current executable
fn exe_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
}

/// Resolve a tool path from an env override, the install directory, or PATH.
fn resolve_tool(env_key: &str, default_name: &str) -> PathBuf {
    if let Ok(v) = env::var(env_key) {
        let p = PathBuf::from(&v);
        if p.exists() {
            return p;
        }
        log::warn!("{} points to missing file {}, ignoring", env_key, v);
    }

    let mut filename = default_name.to_string();
    if cfg!(windows) && !filename.to_lowercase().ends_with(".exe") {
        filename.push_str(".exe");
    }

    if let Some(dir) = exe_dir() {
        let candidate = dir.join(&filename);
        if candidate.exists() {
            return candidate;
        }

        let bin_candidate = dir.join("bin").join(&filename);
        if bin_candidate.exists() {
            return bin_candidate;
        }
    }

    PathBuf::from(default_name)
}

/// Get path to ffprobe binary
pub fn ffprobe_path() -> PathBuf {
    resolve_tool("CAMSTAMP_FFPROBE_PATH", "ffprobe")
}

/// Get path to ffmpeg binary
pub fn ffmpeg_path() -> PathBuf {
    resolve_tool("CAMSTAMP_FFMPEG_PATH", "ffmpeg")
}

/// Get path to exiftool binary
pub fn exiftool_path() -> PathBuf {
    resolve_tool("CAMSTAMP_EXIFTOOL_PATH", "exiftool")
}

/// Get path to the OpenALPR command line recognizer
pub fn alpr_path() -> PathBuf {
    resolve_tool("CAMSTAMP_ALPR_PATH", "alpr")
}

/// Check if a tool is available at the resolved path.
/// `version_flag` differs per tool (`-version` for ffmpeg, `-ver` for exiftool, `--version` for alpr).
pub fn is_tool_available(tool: &str) -> bool {
    let (path, version_flag) = match tool {
        "ffprobe" => (ffprobe_path(), "-version"),
        "ffmpeg" => (ffmpeg_path(), "-version"),
        "exiftool" => (exiftool_path(), "-ver"),
        "alpr" => (alpr_path(), "--version"),
        _ => return false,
    };

    Command::new(&path)
        .arg(version_flag)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Names from `tools` that cannot be run.
pub fn missing_tools<'a>(tools: &[&'a str]) -> Vec<&'a str> {
    tools
        .iter()
        .copied()
        .filter(|tool| !is_tool_available(tool))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_tool_fallback() {
        let path = resolve_tool("CAMSTAMP_TEST_NONEXISTENT", "testcmd");
        assert_eq!(path, PathBuf::from("testcmd"));
    }

    #[test]
    fn test_env_override() {
        let tmp = tempfile::TempDir::new().unwrap();
        let tool = tmp.path().join("camstamp_test_tool");
        std::fs::write(&tool, "test").unwrap();

        std::env::set_var("CAMSTAMP_TEST_TOOL", tool.to_str().unwrap());
        let path = resolve_tool("CAMSTAMP_TEST_TOOL", "default");
        assert_eq!(path, tool);
        std::env::remove_var("CAMSTAMP_TEST_TOOL");
    }

    #[test]
    fn test_env_override_missing_file_falls_back() {
        std::env::set_var("CAMSTAMP_TEST_MISSING", "/definitely/not/here/tool");
        let path = resolve_tool("CAMSTAMP_TEST_MISSING", "fallback");
        assert_eq!(path, PathBuf::from("fallback"));
        std::env::remove_var("CAMSTAMP_TEST_MISSING");
    }

    #[test]
    fn test_unknown_tool_unavailable() {
        assert!(!is_tool_available("not-a-tool"));
        assert_eq!(missing_tools(&["not-a-tool", "also-not"]), vec!["not-a-tool", "also-not"]);
        assert!(missing_tools(&[]).is_empty());
    }
}
