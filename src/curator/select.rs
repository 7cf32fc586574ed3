//! Stage A: rank tiles by objectness loss and keep a low-loss quantile.
//!
//! The loss table comes from the detector's evaluation pass: one row per
//! image with columns `img` (tile name) and `obj` (objectness loss), among
//! others. Tiles whose detections the current model already explains well
//! have low loss; the selection keeps those.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, info};

use crate::crater::ClassifiedCrater;

/// Loss assigned to tiles absent from the loss table.
pub const MISSING_LOSS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    pub filename: String,
    pub obj_loss: f64,
}

/// Per-tile objectness loss, keyed by tile name.
#[derive(Debug, Clone, Default)]
pub struct LossTable {
    losses: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct LossRow {
    img: String,
    obj: f64,
}

impl LossTable {
    pub fn load_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::Reader::from_path(path)
            .with_context(|| format!("opening loss table {}", path.display()))?;
        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            let row: LossRow =
                result.with_context(|| format!("reading loss table {}", path.display()))?;
            rows.push((row.img, row.obj));
        }
        let table = Self::from_rows(rows);
        info!("Loaded {} tile losses from {}", table.len(), path.display());
        Ok(table)
    }

    /// Build from `(image, loss)` pairs. The first row for an image wins;
    /// a trailing `.png` on the image name is ignored.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut losses = HashMap::new();
        for (img, loss) in rows {
            let img = img.as_ref().trim();
            let stem = img.strip_suffix(".png").unwrap_or(img);
            losses.entry(stem.to_string()).or_insert(loss);
        }
        Self { losses }
    }

    pub fn get(&self, tile: &str) -> Option<f64> {
        self.losses.get(tile).copied()
    }

    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }
}

/// Outcome of stage A.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    /// Every implicated tile, ascending by loss. Empty when threshold is 1.
    pub ranked: Vec<TileRecord>,
    /// Loss cut-off; tiles strictly below it were selected.
    pub threshold_loss: Option<f64>,
    /// Selected tile names, in rank order (first-seen order when threshold is 1).
    pub selected: Vec<String>,
    /// Tiles missing from the loss table.
    pub missed: usize,
}

/// Distinct tiles holding at least one classified crater, in first-seen order.
pub fn implicated_tiles(craters: &[ClassifiedCrater]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    craters
        .iter()
        .filter(|c| seen.insert(c.tile.as_str()))
        .map(|c| c.tile.clone())
        .collect()
}

/// Select the tiles whose loss ranks below the `threshold` quantile.
///
/// `threshold` is in `(0, 1]`. At 1 every tile is selected and the loss
/// table is never loaded. Otherwise the cut-off is the loss at rank
/// `floor(len * threshold)` and only tiles with a strictly lower loss are kept,
/// so ties with the cut-off are dropped.
pub fn select_tiles<F>(tiles: &[String], threshold: f64, load_losses: F) -> anyhow::Result<Selection>
where
    F: FnOnce() -> anyhow::Result<LossTable>,
{
    if threshold >= 1.0 {
        return Ok(Selection {
            selected: tiles.to_vec(),
            ..Default::default()
        });
    }

    let losses = load_losses()?;
    let mut missed = 0;
    let mut ranked: Vec<TileRecord> = tiles
        .iter()
        .map(|tile| {
            let obj_loss = losses.get(tile).unwrap_or_else(|| {
                debug!("Cannot find {} in loss table", tile);
                missed += 1;
                MISSING_LOSS
            });
            TileRecord {
                filename: tile.clone(),
                obj_loss,
            }
        })
        .collect();
    ranked.sort_by(|a, b| a.obj_loss.total_cmp(&b.obj_loss));

    let rank = (ranked.len() as f64 * threshold).floor() as usize;
    let threshold_loss = ranked.get(rank).map(|r| r.obj_loss);
    let selected = match threshold_loss {
        Some(cut) => ranked
            .iter()
            .filter(|r| r.obj_loss < cut)
            .map(|r| r.filename.clone())
            .collect(),
        None => Vec::new(),
    };

    info!(
        "Selected {} of {} tiles below loss {:?} ({} not in loss table)",
        selected.len(),
        ranked.len(),
        threshold_loss,
        missed
    );
    Ok(Selection {
        ranked,
        threshold_loss,
        selected,
        missed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}_{}", i, -(i as i64))).collect()
    }

    #[test]
    fn quantile_cut_is_strict() {
        let tiles = names(5);
        let losses = LossTable::from_rows(
            tiles
                .iter()
                .zip([0.5, 0.1, 0.3, 0.3, 0.9])
                .map(|(t, l)| (t.clone(), l)),
        );
        // Sorted: 0.1, 0.3, 0.3, 0.5, 0.9; rank floor(5 * 0.4) = 2 -> 0.3.
        let selection = select_tiles(&tiles, 0.4, || Ok(losses)).unwrap();
        assert_eq!(selection.threshold_loss, Some(0.3));
        assert_eq!(selection.selected, vec![tiles[1].clone()]);
        assert_eq!(selection.missed, 0);
    }

    #[test]
    fn threshold_one_skips_loss_lookup() {
        let tiles = names(3);
        let selection =
            select_tiles(&tiles, 1.0, || panic!("loss table must not be loaded")).unwrap();
        assert_eq!(selection.selected, tiles);
        assert!(selection.ranked.is_empty());
    }

    #[test]
    fn missing_tiles_rank_last() {
        let tiles = names(4);
        let losses = LossTable::from_rows(vec![
            (format!("{}.png", tiles[0]), 0.2),
            (tiles[1].clone(), 0.4),
        ]);
        let selection = select_tiles(&tiles, 0.75, || Ok(losses)).unwrap();
        assert_eq!(selection.missed, 2);
        assert_eq!(selection.threshold_loss, Some(MISSING_LOSS));
        assert_eq!(selection.selected, vec![tiles[0].clone(), tiles[1].clone()]);
    }

    #[test]
    fn empty_tile_set_selects_nothing() {
        let selection = select_tiles(&[], 0.5, || Ok(LossTable::default())).unwrap();
        assert!(selection.selected.is_empty());
        assert_eq!(selection.threshold_loss, None);
    }

    #[test]
    fn first_loss_row_wins() {
        let table = LossTable::from_rows(vec![("1_2", 0.1), ("1_2", 0.9)]);
        assert_eq!(table.get("1_2"), Some(0.1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn raising_threshold_never_drops_tiles() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let n = rng.random_range(1..40);
            let tiles = names(n);
            // Coarse losses so that ties are common.
            let rows: Vec<(String, f64)> = tiles
                .iter()
                .filter_map(|t| {
                    if rng.random_bool(0.9) {
                        Some((t.clone(), (rng.random_range(0..10) as f64) / 10.0))
                    } else {
                        None
                    }
                })
                .collect();
            let table = LossTable::from_rows(rows);

            let mut t1: f64 = rng.random_range(0.01..1.0);
            let mut t2: f64 = rng.random_range(0.01..=1.0);
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            let low = select_tiles(&tiles, t1, || Ok(table.clone())).unwrap();
            let high = select_tiles(&tiles, t2, || Ok(table.clone())).unwrap();
            for tile in &low.selected {
                assert!(
                    high.selected.contains(tile),
                    "{} selected at {} but not at {}",
                    tile,
                    t1,
                    t2
                );
            }
        }
    }
}
