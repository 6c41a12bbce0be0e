// License plate clustering
//
// Photos are grouped by the plate recognized in them and moved into one
// directory per plate, named after the earliest capture in the group.

pub mod alpr;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::photo::ProcessedPhoto;
use crate::timestamp::CaptureTime;

/// One recognition candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateCandidate {
    pub plate: String,
    pub confidence: f32,
}

/// Plate recognition engine. Candidates come back best first.
pub trait PlateRecognizer {
    fn recognize_file(&mut self, path: &Path) -> Result<Vec<PlateCandidate>>;
}

/// Insert the conventional hyphen into a raw plate string.
///
/// Five characters: `XXX-YY` when the first three are digits, else `XX-XXX`.
/// Six or more: first three, hyphen, rest. Shorter strings are unchanged.
pub fn format_plate(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let split_at = match chars.len() {
        5 if chars[..3].iter().all(|c| c.is_numeric()) => 3,
        5 => 2,
        n if n >= 6 => 3,
        _ => return raw.to_string(),
    };
    let head: String = chars[..split_at].iter().collect();
    let tail: String = chars[split_at..].iter().collect();
    format!("{}-{}", head, tail)
}

/// Photos sharing a plate, in processing order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateCluster {
    pub plate: String,
    pub items: Vec<ProcessedPhoto>,
}

impl PlateCluster {
    pub fn earliest(&self) -> Option<CaptureTime> {
        self.items.iter().map(|p| p.timestamp).min()
    }

    /// `<YYMMDD-HHMM>_<plate>` from the earliest capture.
    pub fn dir_name(&self) -> Option<String> {
        self.earliest()
            .map(|t| format!("{}_{}", t.dir_stamp(), self.plate))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterOutcome {
    /// Sorted by plate.
    pub clusters: Vec<PlateCluster>,
    /// Photos with no plate, or whose recognition failed.
    pub unclustered: Vec<ProcessedPhoto>,
}

/// Recognize every photo and group by formatted plate.
pub fn cluster(items: Vec<ProcessedPhoto>, recognizer: &mut dyn PlateRecognizer) -> ClusterOutcome {
    let mut groups: BTreeMap<String, Vec<ProcessedPhoto>> = BTreeMap::new();
    let mut unclustered = Vec::new();

    for item in items {
        let plate = match recognizer.recognize_file(&item.path) {
            Ok(candidates) => candidates
                .first()
                .map(|c| format_plate(c.plate.trim()))
                .unwrap_or_default(),
            Err(e) => {
                log::error!("Plate recognition failed for {}: {}", item.path.display(), e);
                String::new()
            }
        };

        if plate.is_empty() {
            log::debug!("{}: no plate", item.path.display());
            unclustered.push(item);
            continue;
        }
        log::info!("{}: plate {}", item.path.display(), plate);
        groups.entry(plate).or_default().push(item);
    }

    ClusterOutcome {
        clusters: groups
            .into_iter()
            .map(|(plate, items)| PlateCluster { plate, items })
            .collect(),
        unclustered,
    }
}

/// A photo's destination: (plate, item, destination directory name).
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub plate: String,
    pub source: PathBuf,
    pub dir_name: String,
}

pub fn assignments(clusters: &[PlateCluster]) -> Vec<Assignment> {
    clusters
        .iter()
        .filter_map(|c| c.dir_name().map(|dir| (c, dir)))
        .flat_map(|(c, dir)| {
            c.items.iter().map(move |item| Assignment {
                plate: c.plate.clone(),
                source: item.path.clone(),
                dir_name: dir.clone(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub moved: usize,
    pub failed: usize,
}

/// Move each assigned photo into `<output_dir>/<dir_name>/`. A failed move
/// leaves the photo where it was.
pub fn dispatch_clusters(output_dir: &Path, assignments: &[Assignment]) -> DispatchReport {
    let mut report = DispatchReport::default();

    for a in assignments {
        let Some(file_name) = a.source.file_name() else {
            log::error!("Cannot move {}: no file name", a.source.display());
            report.failed += 1;
            continue;
        };
        let dir = output_dir.join(&a.dir_name);
        let dest = dir.join(file_name);

        let moved = std::fs::create_dir_all(&dir).and_then(|_| std::fs::rename(&a.source, &dest));
        match moved {
            Ok(()) => {
                log::debug!("{} -> {}", a.source.display(), dest.display());
                report.moved += 1;
            }
            Err(e) => {
                log::error!("Failed to move {} to {}: {}", a.source.display(), dir.display(), e);
                report.failed += 1;
            }
        }
    }

    report
}
