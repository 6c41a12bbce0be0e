// Input discovery
//
// Command line inputs are files or directories. Files are kept in argument
// order; directories are walked recursively and their matches sorted.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::constants::{PHOTO_EXTENSIONS, VIDEO_EXTENSIONS};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    /// Explicit inputs that are missing or have an unsupported extension.
    pub skipped: Vec<PathBuf>,
}

/// Collect the inputs whose extension is one of `extensions`.
pub fn discover(inputs: &[PathBuf], extensions: &[&str]) -> Discovery {
    let mut discovery = Discovery::default();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && has_extension(p, extensions))
                .collect();
            found.sort();
            log::debug!("{}: {} matching files", input.display(), found.len());
            discovery.files.extend(found);
        } else if input.is_file() && has_extension(input, extensions) {
            discovery.files.push(input.clone());
        } else {
            log::warn!("Skipping {}: not a supported file", input.display());
            discovery.skipped.push(input.clone());
        }
    }

    discovery
}

/// Case-insensitive extension check
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_lowercase(),
        None => return false,
    };
    extensions.contains(&ext.as_str())
}

pub fn is_photo_file(path: &Path) -> bool {
    has_extension(path, &PHOTO_EXTENSIONS)
}

pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, &VIDEO_EXTENSIONS)
}
