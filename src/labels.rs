//! YOLO label lines and label corpora.
//!
//! A label file holds one detection per line, whitespace separated:
//!
//! ```text
//! <class> <x_center> <y_center> <width> <height> [<crater_id>]
//! ```
//!
//! Lines carrying the sixth field are detections traced back to a catalog v1
//! crater. Geometry is kept as the original text so that rewritten labels
//! reproduce it byte for byte.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

/// Field count of a detection traceable to a catalog crater.
pub const TRACEABLE_FIELDS: usize = 6;

/// Extension of label files inside a corpus directory.
pub const LABEL_EXTENSION: &str = "txt";

#[derive(Debug, Clone, PartialEq)]
pub struct LabelLine {
    pub class_or_id: String,
    /// `x_center y_center width height`, normalized to the tile size.
    pub geometry: [String; 4],
    pub source_id: Option<String>,
}

impl LabelLine {
    /// Parse a 5- or 6-field label line. Any other shape yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != TRACEABLE_FIELDS && fields.len() != TRACEABLE_FIELDS - 1 {
            return None;
        }
        Some(Self {
            class_or_id: fields[0].to_string(),
            geometry: [
                fields[1].to_string(),
                fields[2].to_string(),
                fields[3].to_string(),
                fields[4].to_string(),
            ],
            source_id: fields.get(5).map(|s| s.to_string()),
        })
    }

    /// Catalog v1 identifier, for traceable lines only.
    pub fn crater_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    /// The same box with `class_id` as its class and no source identifier.
    pub fn reclassified(&self, class_id: u32) -> String {
        format!("{} {}", class_id, self.geometry.join(" "))
    }
}

/// Catalog v1 identifiers of all traceable lines, in file order.
pub fn crater_ids(contents: &str) -> impl Iterator<Item = String> + '_ {
    contents
        .lines()
        .filter_map(LabelLine::parse)
        .filter_map(|line| line.source_id)
}

/// All label files of a corpus directory, sorted by file name.
pub fn list_label_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("reading label directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == LABEL_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Every crater identifier in a corpus, file by file in sorted order.
///
/// Identifiers repeated across files are kept.
pub fn scan_corpus(dir: &Path) -> anyhow::Result<Vec<String>> {
    let files = list_label_files(dir)?;
    let mut ids = Vec::new();
    for path in &files {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading label file {}", path.display()))?;
        let before = ids.len();
        ids.extend(crater_ids(&contents));
        debug!("{}: {} crater ids", path.display(), ids.len() - before);
    }
    info!("Scanned {} label files, {} crater ids", files.len(), ids.len());
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_traceable_and_plain_lines() {
        let traced = LabelLine::parse("0 0.5 0.5 0.1 0.1 A1").unwrap();
        assert_eq!(traced.crater_id(), Some("A1"));
        assert_eq!(traced.reclassified(2), "2 0.5 0.5 0.1 0.1");

        let plain = LabelLine::parse("0 0.25 0.75 0.05 0.05").unwrap();
        assert_eq!(plain.crater_id(), None);

        assert_eq!(LabelLine::parse(""), None);
        assert_eq!(LabelLine::parse("0 0.5 0.5"), None);
        assert_eq!(LabelLine::parse("0 0.5 0.5 0.1 0.1 A1 extra"), None);
    }

    #[test]
    fn geometry_text_is_preserved() {
        let line = LabelLine::parse("0 0.500000 0.1250 1e-2 0.01 X").unwrap();
        assert_eq!(line.reclassified(0), "0 0.500000 0.1250 1e-2 0.01");
    }

    #[test]
    fn ids_skip_untraceable_lines() {
        let contents = "0 0.1 0.1 0.1 0.1 A1\n0 0.2 0.2 0.1 0.1 \n0 0.3 0.3 0.1 0.1 A1\n";
        let ids: Vec<String> = crater_ids(contents).collect();
        assert_eq!(ids, vec!["A1", "A1"]);
    }

    #[test]
    fn scans_only_label_files_in_sorted_order() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "0 0.1 0.1 0.1 0.1 B\n").unwrap();
        fs::write(dir.path().join("a.txt"), "0 0.1 0.1 0.1 0.1 A\n").unwrap();
        fs::write(dir.path().join("notes.md"), "0 0.1 0.1 0.1 0.1 N\n").unwrap();
        let ids = scan_corpus(dir.path()).unwrap();
        assert_eq!(ids, vec!["A", "B"]);
    }
}
