//! Stage B: keep only tiles whose every detection is a classified crater.
//!
//! Tiles also containing craters from other catalogs, craters missing from
//! catalog v2, or unclassified v2 craters would teach the classifier that
//! those are background. The clean filter drops such tiles entirely.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::TileFailure;
use crate::crater::ClassifiedCrater;
use crate::labels::LabelLine;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleanOutcome {
    pub clean: Vec<String>,
    /// Tiles whose label file could not be read.
    pub failures: Vec<TileFailure>,
}

/// `true` if the label file is non-empty and every line is a traceable
/// detection of a classified crater.
pub fn is_clean(contents: &str, classified: &HashMap<&str, &ClassifiedCrater>) -> bool {
    let mut any = false;
    for line in contents.lines() {
        let known = LabelLine::parse(line)
            .and_then(|l| l.source_id)
            .is_some_and(|id| classified.contains_key(id.as_str()));
        if !known {
            return false;
        }
        any = true;
    }
    any
}

/// Filter `tiles` down to clean ones, reading labels from `labels_dir`.
pub fn clean_tiles(
    tiles: &[String],
    labels_dir: &Path,
    classified: &HashMap<&str, &ClassifiedCrater>,
) -> CleanOutcome {
    let mut outcome = CleanOutcome::default();
    for tile in tiles {
        let path = labels_dir.join(format!("{}.txt", tile));
        match fs::read_to_string(&path) {
            Ok(contents) if is_clean(&contents, classified) => outcome.clean.push(tile.clone()),
            Ok(_) => debug!("{} has unclassified detections", tile),
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                outcome.failures.push(TileFailure {
                    tile: tile.clone(),
                    reason: format!("reading {}: {}", path.display(), e),
                });
            }
        }
    }
    info!("{} of {} tiles are clean", outcome.clean.len(), tiles.len());
    outcome
}
