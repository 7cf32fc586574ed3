//! Newline-delimited image lists, as consumed by the training framework.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;

pub const IMAGE_EXTENSION: &str = ".png";

/// Write one `"<tile>.png"` line per tile.
pub fn write_image_list<P: AsRef<Path>>(path: P, tiles: &[String]) -> anyhow::Result<()> {
    write_lines(path, tiles.iter().map(|t| format!("{}{}", t, IMAGE_EXTENSION)))
}

/// Write each entry on its own line.
pub fn write_lines<P, I, S>(path: P, entries: I) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let path = path.as_ref();
    let mut file = std::io::BufWriter::new(
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    for entry in entries {
        writeln!(file, "{}", entry.as_ref())?;
    }
    file.flush()?;
    Ok(())
}

/// Trimmed, non-empty lines of a list file.
pub fn read_image_list<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Tile name of a list entry (`"13_-48.png"` → `"13_-48"`).
pub fn tile_stem(entry: &str) -> &str {
    entry.strip_suffix(IMAGE_EXTENSION).unwrap_or(entry)
}

/// Entries of `all` not present in `exclude`, in their original order.
///
/// Used to derive a training list from the full list and a held-out test list.
pub fn subtract_lists(all: &[String], exclude: &[String]) -> Vec<String> {
    let exclude: HashSet<&str> = exclude.iter().map(String::as_str).collect();
    all.iter()
        .filter(|e| !exclude.contains(e.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("image_list.txt");
        let tiles = vec!["13_-48".to_string(), "-3_10".to_string()];
        write_image_list(&path, &tiles).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "13_-48.png\n-3_10.png\n");

        let read: Vec<String> = read_image_list(&path)
            .unwrap()
            .iter()
            .map(|e| tile_stem(e).to_string())
            .collect();
        assert_eq!(read, tiles);
    }

    #[test]
    fn subtraction_keeps_order() {
        let all: Vec<String> = ["a", "b", "c", "d", "b"].iter().map(|s| s.to_string()).collect();
        let exclude: Vec<String> = ["b", "x"].iter().map(|s| s.to_string()).collect();
        assert_eq!(subtract_lists(&all, &exclude), vec!["a", "c", "d"]);
    }
}
