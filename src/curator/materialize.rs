//! Stage C: copy selected tiles and rewrite their labels for classification.
//!
//! Each rewritten label file holds only the detections of classified craters
//! on that tile, with the class replaced by the zero-indexed degradation
//! state and the crater identifier dropped. Everything else is removed.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use super::staging::{StagingDir, IMAGES_DIR, LABELS_DIR};
use super::TileFailure;
use crate::crater::ClassifiedCrater;
use crate::labels::LabelLine;

/// Class ids of the classified craters on each tile, keyed by tile then v1 id.
pub type TileClasses<'a> = HashMap<&'a str, HashMap<&'a str, u32>>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterializeOutcome {
    /// Tiles whose image and label were written.
    pub written: Vec<String>,
    pub failures: Vec<TileFailure>,
    /// Lines across all rewritten label files.
    pub label_lines: usize,
    /// Lines across the source label files of written tiles.
    pub source_label_lines: usize,
}

/// Group classified craters by tile.
pub fn tile_classes(craters: &[ClassifiedCrater]) -> TileClasses<'_> {
    let mut by_tile: TileClasses = HashMap::new();
    for crater in craters {
        by_tile
            .entry(crater.tile.as_str())
            .or_default()
            .entry(crater.v1_id.as_str())
            .or_insert(crater.class_id());
    }
    by_tile
}

/// Rewrite a source label file. Returns the new contents and its line count.
pub fn rewrite_label(contents: &str, classes: &HashMap<&str, u32>) -> (String, usize) {
    let mut out = String::new();
    let mut lines = 0;
    for line in contents.lines().filter_map(LabelLine::parse) {
        let Some(&class_id) = line.crater_id().and_then(|id| classes.get(id)) else {
            continue;
        };
        out.push_str(&line.reclassified(class_id));
        out.push('\n');
        lines += 1;
    }
    (out, lines)
}

/// Copy one tile into the staging tree. Returns the source and rewritten line counts.
fn materialize_tile(
    tile: &str,
    source_dir: &Path,
    staging: &StagingDir,
    classes: &HashMap<&str, u32>,
) -> anyhow::Result<(usize, usize)> {
    let label_src = source_dir.join(LABELS_DIR).join(format!("{}.txt", tile));
    let image_src = source_dir.join(IMAGES_DIR).join(format!("{}.png", tile));

    let contents = fs::read_to_string(&label_src)
        .with_context(|| format!("reading {}", label_src.display()))?;
    let image_dst = staging.images().join(format!("{}.png", tile));
    fs::copy(&image_src, &image_dst)
        .with_context(|| format!("copying {}", image_src.display()))?;

    let (rewritten, lines) = rewrite_label(&contents, classes);
    let label_dst = staging.labels().join(format!("{}.txt", tile));
    if let Err(e) = fs::write(&label_dst, rewritten) {
        // An image without its label must not reach the output.
        let _ = fs::remove_file(&image_dst);
        return Err(e).with_context(|| format!("writing {}", label_dst.display()));
    }
    Ok((contents.lines().count(), lines))
}

/// Materialize every tile. A failing tile is recorded and skipped.
pub fn materialize(
    tiles: &[String],
    source_dir: &Path,
    staging: &StagingDir,
    classes: &TileClasses,
) -> MaterializeOutcome {
    let pb = ProgressBar::new(tiles.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let empty = HashMap::new();
    let mut outcome = MaterializeOutcome::default();
    for tile in tiles {
        pb.set_message(tile.clone());
        let tile_classes = classes.get(tile.as_str()).unwrap_or(&empty);
        match materialize_tile(tile, source_dir, staging, tile_classes) {
            Ok((source_lines, lines)) => {
                outcome.written.push(tile.clone());
                outcome.source_label_lines += source_lines;
                outcome.label_lines += lines;
            }
            Err(e) => {
                warn!("Skipping tile {}: {:#}", tile, e);
                outcome.failures.push(TileFailure {
                    tile: tile.clone(),
                    reason: format!("{:#}", e),
                });
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crater(id: &str, state: u32, tile: &str) -> ClassifiedCrater {
        ClassifiedCrater {
            v1_id: id.into(),
            v2_id: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            degradation_state: state,
            tile: tile.into(),
        }
    }

    #[test]
    fn rewrite_keeps_every_classified_line() {
        let craters = vec![crater("A1", 3, "11_-6"), crater("A2", 1, "11_-6")];
        let classes = tile_classes(&craters);
        let contents = "\
0 0.5 0.5 0.1 0.1 A1
0 0.2 0.2 0.05 0.05
0 0.7 0.3 0.2 0.2 A2
0 0.9 0.9 0.1 0.1 A9
";
        let (out, lines) = rewrite_label(contents, &classes["11_-6"]);
        assert_eq!(out, "2 0.5 0.5 0.1 0.1\n0 0.7 0.3 0.2 0.2\n");
        assert_eq!(lines, 2);
    }

    #[test]
    fn craters_of_other_tiles_are_not_rewritten() {
        let craters = vec![crater("A1", 2, "11_-6"), crater("B1", 2, "12_-6")];
        let classes = tile_classes(&craters);
        let contents = "0 0.5 0.5 0.1 0.1 A1\n0 0.9 0.9 0.1 0.1 B1\n";
        let (out, _) = rewrite_label(contents, &classes["11_-6"]);
        assert_eq!(out, "1 0.5 0.5 0.1 0.1\n");
    }

    #[test]
    fn missing_files_fail_only_their_tile() {
        let source = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(source.path().join(IMAGES_DIR)).unwrap();
        fs::create_dir_all(source.path().join(LABELS_DIR)).unwrap();
        fs::write(source.path().join("images/11_-6.png"), b"png").unwrap();
        fs::write(
            source.path().join("labels/11_-6.txt"),
            "0 0.5 0.5 0.1 0.1 A1\n",
        )
        .unwrap();
        // Label without image.
        fs::write(source.path().join("labels/12_-6.txt"), "0 0.5 0.5 0.1 0.1 B1\n").unwrap();

        let out = tempfile::TempDir::new().unwrap();
        let staging = StagingDir::new(&out.path().join("dest")).unwrap();
        let craters = vec![crater("A1", 3, "11_-6"), crater("B1", 2, "12_-6")];
        let classes = tile_classes(&craters);
        let tiles = vec!["11_-6".to_string(), "12_-6".to_string(), "13_-6".to_string()];

        let outcome = materialize(&tiles, source.path(), &staging, &classes);
        assert_eq!(outcome.written, vec!["11_-6".to_string()]);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.label_lines, 1);
        assert!(!staging.labels().join("12_-6.txt").exists());
        assert_eq!(
            fs::read_to_string(staging.labels().join("11_-6.txt")).unwrap(),
            "2 0.5 0.5 0.1 0.1\n"
        );
    }

    #[test]
    fn unwritable_label_drops_the_copied_image() {
        let source = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(source.path().join(IMAGES_DIR)).unwrap();
        fs::create_dir_all(source.path().join(LABELS_DIR)).unwrap();
        fs::write(source.path().join("images/11_-6.png"), b"png").unwrap();
        fs::write(source.path().join("labels/11_-6.txt"), "0 0.5 0.5 0.1 0.1 A1\n").unwrap();

        let out = tempfile::TempDir::new().unwrap();
        let staging = StagingDir::new(&out.path().join("dest")).unwrap();
        // A directory in place of the label file makes the write fail.
        fs::create_dir(staging.labels().join("11_-6.txt")).unwrap();

        let craters = vec![crater("A1", 3, "11_-6")];
        let classes = tile_classes(&craters);
        let outcome = materialize(&["11_-6".to_string()], source.path(), &staging, &classes);

        assert!(outcome.written.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].tile, "11_-6");
        assert!(!staging.images().join("11_-6.png").exists());
    }
}
