// OpenALPR command line engine
//
// The engine handle is created once per batch and released exactly once,
// either explicitly through `unload` or when it goes out of scope.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use super::{PlateCandidate, PlateRecognizer};
use crate::error::{CamStampError, Result};
use crate::tools::alpr_path;

#[derive(Debug, Deserialize)]
struct AlprOutput {
    #[serde(default)]
    results: Vec<AlprResult>,
}

#[derive(Debug, Deserialize)]
struct AlprResult {
    plate: String,
    #[serde(default)]
    confidence: f32,
}

/// Parse `alpr -j` output. Results are already ordered best first.
pub fn parse_alpr_json(stdout: &[u8]) -> Result<Vec<PlateCandidate>> {
    let output: AlprOutput = serde_json::from_slice(stdout)
        .map_err(|e| CamStampError::Alpr(format!("Failed to parse alpr output: {}", e)))?;
    Ok(output
        .results
        .into_iter()
        .map(|r| PlateCandidate {
            plate: r.plate,
            confidence: r.confidence,
        })
        .collect())
}

pub struct AlprEngine {
    binary: PathBuf,
    config: PathBuf,
    country: String,
    loaded: bool,
}

impl AlprEngine {
    /// Check that the recognizer runs and its configuration exists.
    pub fn init(config: &Path, country: &str) -> Result<Self> {
        if !config.exists() {
            return Err(CamStampError::Alpr(format!(
                "Error loading OpenALPR: config {} not found",
                config.display()
            )));
        }

        let binary = alpr_path();
        let output = Command::new(&binary)
            .arg("--version")
            .output()
            .map_err(|e| CamStampError::Alpr(format!("Failed to run {}: {}", binary.display(), e)))?;
        if !output.status.success() {
            return Err(CamStampError::Alpr(format!(
                "Error loading OpenALPR: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        log::info!("OpenALPR loaded ({}, country {})", config.display(), country);
        Ok(Self {
            binary,
            config: config.to_path_buf(),
            country: country.to_string(),
            loaded: true,
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Release the engine now instead of at end of scope.
    pub fn unload(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.loaded {
            self.loaded = false;
            log::info!("OpenALPR unloaded");
        }
    }
}

impl Drop for AlprEngine {
    fn drop(&mut self) {
        self.release();
    }
}

impl PlateRecognizer for AlprEngine {
    fn recognize_file(&mut self, path: &Path) -> Result<Vec<PlateCandidate>> {
        if !self.loaded {
            return Err(CamStampError::Alpr("OpenALPR is not loaded".to_string()));
        }

        let output = Command::new(&self.binary)
            .arg("-c")
            .arg(&self.country)
            .arg("--config")
            .arg(&self.config)
            .arg("-j")
            .arg(path)
            .output()
            .map_err(|e| CamStampError::Alpr(format!("Failed to run alpr: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CamStampError::Alpr(format!(
                "alpr failed on {}: {}",
                path.display(),
                stderr.trim()
            )));
        }

        parse_alpr_json(&output.stdout)
    }
}
