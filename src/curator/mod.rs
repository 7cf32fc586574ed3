//! Dataset curation for the degradation-state classifier.
//!
//! Starting from the crater dictionary and a detector loss table, a run:
//!
//! 1. **Selects** tiles holding classified craters whose objectness loss ranks
//!    below a quantile threshold (`select`).
//! 2. Optionally **cleans** the selection down to tiles whose every detection
//!    is a classified crater (`clean`).
//! 3. **Materializes** the surviving tiles: images are copied and labels are
//!    rewritten with zero-indexed degradation-state classes (`materialize`).
//!
//! All output goes through a staging directory (`staging`) that replaces the
//! destination only when the run completes.
//!
//! Output layout:
//!
//! ```text
//! <dest>/images/<tile>.png
//! <dest>/labels/<tile>.txt
//! <dest>/image_list.txt
//! <dest>/clean_image_list.txt      (clean mode)
//! <dest>/classified_craters.csv
//! ```

pub mod clean;
pub mod materialize;
pub mod select;
pub mod staging;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::crater::ClassifiedCrater;
use crate::dictionary::DictionaryTable;
use crate::lists::write_image_list;

use self::clean::clean_tiles;
use self::materialize::{materialize, tile_classes};
use self::select::{implicated_tiles, select_tiles, LossTable};
use self::staging::{StagingDir, IMAGES_DIR, LABELS_DIR};

pub const IMAGE_LIST: &str = "image_list.txt";
pub const CLEAN_IMAGE_LIST: &str = "clean_image_list.txt";
pub const CLASSIFIED_CRATERS: &str = "classified_craters.csv";

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CurateError {
    #[error("threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("source directory {0} has no {1}/ subdirectory")]
    MissingSource(PathBuf, &'static str),
}

// ── Configuration ───────────────────────────────────────────────────────────

/// Parameters of a curation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurateConfig {
    /// Crater dictionary CSV produced by `build_dictionary`.
    pub dictionary: PathBuf,
    /// Per-tile loss table (`img`, `obj` columns). Unused when `threshold` is 1.
    pub loss_table: PathBuf,
    /// Quantile of lowest-loss tiles to keep, in `(0, 1]`.
    pub threshold: f64,
    /// Unfiltered dataset with `images/` and `labels/`.
    pub source_dir: PathBuf,
    /// Output directory. Replaced as a whole by each run.
    pub dest: PathBuf,
    /// Keep only tiles whose every detection is a classified crater.
    pub clean: bool,
}

impl Default for CurateConfig {
    fn default() -> Self {
        Self {
            dictionary: PathBuf::from("crater_dictionary.csv"),
            loss_table: PathBuf::from("loss_rank.csv"),
            threshold: 0.5,
            source_dir: PathBuf::from("data"),
            dest: PathBuf::from("classifier"),
            clean: false,
        }
    }
}

impl CurateConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), CurateError> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(CurateError::InvalidThreshold(self.threshold));
        }
        for sub in [IMAGES_DIR, LABELS_DIR] {
            if !self.source_dir.join(sub).is_dir() {
                return Err(CurateError::MissingSource(self.source_dir.clone(), sub));
            }
        }
        Ok(())
    }
}

// ── Summary ─────────────────────────────────────────────────────────────────

/// A tile dropped from the run because its files could not be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFailure {
    pub tile: String,
    pub reason: String,
}

/// End-of-run counts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurationSummary {
    /// Distinct classified craters in the dictionary.
    pub classified_craters: usize,
    /// Tiles holding at least one classified crater.
    pub processed: usize,
    /// Tiles absent from the loss table.
    pub missed: usize,
    pub selected: usize,
    /// Tiles passing the clean filter; `None` outside clean mode.
    pub cleaned: Option<usize>,
    pub materialized: usize,
    pub failures: Vec<TileFailure>,
    /// Lines across the rewritten label files.
    pub label_lines: usize,
    /// Lines across the source label files of the materialized tiles.
    pub source_label_lines: usize,
    pub dest: PathBuf,
}

// ── Run ─────────────────────────────────────────────────────────────────────

/// Run the full curation pipeline described by `config`.
pub fn curate(config: &CurateConfig) -> anyhow::Result<CurationSummary> {
    let dictionary = DictionaryTable::load_csv(&config.dictionary)?;
    curate_table(&dictionary, config)
}

/// Curation over an already loaded dictionary.
pub fn curate_table(
    dictionary: &DictionaryTable,
    config: &CurateConfig,
) -> anyhow::Result<CurationSummary> {
    config.validate()?;

    let craters = dictionary.classified();
    let tiles = implicated_tiles(&craters);
    info!(
        "{} classified craters on {} tiles",
        craters.len(),
        tiles.len()
    );

    let selection = select_tiles(&tiles, config.threshold, || {
        LossTable::load_csv(&config.loss_table)
    })?;

    let staging = StagingDir::new(&config.dest)
        .with_context(|| format!("staging output for {}", config.dest.display()))?;
    write_image_list(staging.path().join(IMAGE_LIST), &selection.selected)?;
    write_classified_craters(staging.path().join(CLASSIFIED_CRATERS), &craters)?;

    let mut failures = Vec::new();
    let (final_tiles, cleaned) = if config.clean {
        let by_id: HashMap<&str, &ClassifiedCrater> =
            craters.iter().map(|c| (c.v1_id.as_str(), c)).collect();
        let outcome = clean_tiles(
            &selection.selected,
            &config.source_dir.join(LABELS_DIR),
            &by_id,
        );
        write_image_list(staging.path().join(CLEAN_IMAGE_LIST), &outcome.clean)?;
        failures.extend(outcome.failures);
        let count = outcome.clean.len();
        (outcome.clean, Some(count))
    } else {
        (selection.selected.clone(), None)
    };

    let classes = tile_classes(&craters);
    let outcome = materialize(&final_tiles, &config.source_dir, &staging, &classes);
    failures.extend(outcome.failures);

    let dest = staging
        .commit()
        .with_context(|| format!("committing output to {}", config.dest.display()))?;

    let summary = CurationSummary {
        classified_craters: craters.len(),
        processed: tiles.len(),
        missed: selection.missed,
        selected: selection.selected.len(),
        cleaned,
        materialized: outcome.written.len(),
        failures,
        label_lines: outcome.label_lines,
        source_label_lines: outcome.source_label_lines,
        dest,
    };
    info!(
        "Curated {} images ({} labels kept of {}), {} failures",
        summary.materialized,
        summary.label_lines,
        summary.source_label_lines,
        summary.failures.len()
    );
    Ok(summary)
}

#[derive(Serialize)]
struct ClassifiedRow<'a> {
    v1: &'a str,
    v2: &'a str,
    latitude: f64,
    longitude: f64,
    degradation_state: u32,
    filename: &'a str,
}

fn write_classified_craters(path: PathBuf, craters: &[ClassifiedCrater]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    for c in craters {
        wtr.serialize(ClassifiedRow {
            v1: &c.v1_id,
            v2: &c.v2_id,
            latitude: c.latitude,
            longitude: c.longitude,
            degradation_state: c.degradation_state,
            filename: &c.tile,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
