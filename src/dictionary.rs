//! The crater dictionary: one row per crater identifier found in a label
//! corpus, carrying its catalog v2 identity and degradation state.
//!
//! Building the dictionary is the expensive, once-per-corpus step. The
//! result is persisted as CSV (`v1,v2,latitude,longitude,degradation_state`,
//! unresolved fields left empty) and reloaded by the curator.

use std::path::Path;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalogs::parse_degradation_state;
use crate::crater::{ClassifiedCrater, CraterEntry};
use crate::labels::scan_corpus;
use crate::resolver::{IdentityResolver, ResolveError, ResolveStatus};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DictionaryTable {
    pub entries: Vec<CraterEntry>,
}

/// A dictionary row whose position had no catalog v2 counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct MissedCrater {
    /// Row index in the dictionary table.
    pub row: usize,
    pub v1_id: String,
}

/// Diagnostics gathered while building a dictionary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildReport {
    pub processed: usize,
    pub classified: usize,
    pub unclassified: usize,
    pub missed: Vec<MissedCrater>,
}

impl BuildReport {
    pub fn missed_count(&self) -> usize {
        self.missed.len()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DictionaryRow {
    v1: String,
    #[serde(default)]
    v2: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    degradation_state: Option<String>,
}

impl DictionaryTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Classified craters, first row per v1 identifier, in table order.
    pub fn classified(&self) -> Vec<ClassifiedCrater> {
        let mut seen = std::collections::HashSet::new();
        self.entries
            .iter()
            .filter_map(CraterEntry::classified)
            .filter(|c| seen.insert(c.v1_id.clone()))
            .collect()
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("creating dictionary {}", path.display()))?;
        for entry in &self.entries {
            wtr.serialize(DictionaryRow {
                v1: entry.v1_id.clone(),
                v2: entry.v2_id.clone(),
                latitude: entry.latitude,
                longitude: entry.longitude,
                degradation_state: entry.degradation_state.map(|s| s.to_string()),
            })?;
        }
        wtr.flush()?;
        info!("Saved {} dictionary rows to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::Reader::from_path(path)
            .with_context(|| format!("opening dictionary {}", path.display()))?;
        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let row: DictionaryRow =
                result.with_context(|| format!("reading dictionary {}", path.display()))?;
            let raw_state = row.degradation_state.unwrap_or_default();
            let degradation_state = parse_degradation_state(&raw_state).with_context(|| {
                format!(
                    "dictionary {}: crater {} has invalid degradation state {:?}",
                    path.display(),
                    row.v1,
                    raw_state
                )
            })?;
            entries.push(CraterEntry {
                v1_id: row.v1,
                v2_id: row.v2,
                latitude: row.latitude,
                longitude: row.longitude,
                degradation_state,
            });
        }
        info!("Loaded {} dictionary rows from {}", entries.len(), path.display());
        Ok(Self { entries })
    }
}

/// Resolve every identifier, one dictionary row each.
///
/// Misses are recorded in the report and their rows kept. An identifier
/// absent from catalog v1 aborts the build.
pub fn build_from_ids(
    ids: Vec<String>,
    resolver: &IdentityResolver,
) -> Result<(DictionaryTable, BuildReport), ResolveError> {
    let pb = ProgressBar::new(ids.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut report = BuildReport::default();
    let mut entries = Vec::with_capacity(ids.len());
    for (row, id) in ids.into_iter().enumerate() {
        let (entry, status) = resolver.resolve(CraterEntry::new(id))?;
        match status {
            ResolveStatus::Classified => report.classified += 1,
            ResolveStatus::Unclassified => report.unclassified += 1,
            ResolveStatus::Missed => report.missed.push(MissedCrater {
                row,
                v1_id: entry.v1_id.clone(),
            }),
        }
        entries.push(entry);
        pb.inc(1);
    }
    pb.finish_and_clear();

    report.processed = entries.len();
    Ok((DictionaryTable { entries }, report))
}

/// Scan a label corpus and resolve every crater identifier in it.
pub fn build_dictionary(
    labels_dir: &Path,
    resolver: &IdentityResolver,
) -> anyhow::Result<(DictionaryTable, BuildReport)> {
    let ids = scan_corpus(labels_dir)?;
    let (table, report) = build_from_ids(ids, resolver)?;

    info!(
        "{} craters saved: {} classified, {} unclassified, {} missed",
        report.processed,
        report.classified,
        report.unclassified,
        report.missed_count()
    );
    for missed in &report.missed {
        warn!("No catalog v2 match for {} (row {})", missed.v1_id, missed.row);
    }
    Ok((table, report))
}
