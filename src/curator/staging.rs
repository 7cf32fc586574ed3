//! Scoped output directory for a curation run.
//!
//! Output is written into a fresh hidden directory next to the destination.
//! `commit` swaps it into place; dropping an uncommitted `StagingDir` deletes
//! it, leaving any previous destination untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

pub const IMAGES_DIR: &str = "images";
pub const LABELS_DIR: &str = "labels";

#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
    dest: PathBuf,
}

impl StagingDir {
    /// Create an empty staging tree (`images/`, `labels/`) for `dest`.
    pub fn new(dest: &Path) -> io::Result<Self> {
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "curated".to_string());
        let dir = tempfile::Builder::new()
            .prefix(&format!(".{}.staging-", name))
            .tempdir_in(parent)?;
        fs::create_dir(dir.path().join(IMAGES_DIR))?;
        fs::create_dir(dir.path().join(LABELS_DIR))?;
        debug!("Staging {} in {}", dest.display(), dir.path().display());
        Ok(Self {
            dir,
            dest: dest.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn images(&self) -> PathBuf {
        self.dir.path().join(IMAGES_DIR)
    }

    pub fn labels(&self) -> PathBuf {
        self.dir.path().join(LABELS_DIR)
    }

    /// Replace the destination with the staged tree.
    ///
    /// A previous destination is first moved aside to a backup sibling and
    /// only deleted once the staged tree is in place. If the swap fails the
    /// backup is moved back, so `dest` is either the old tree or the new one.
    pub fn commit(self) -> io::Result<PathBuf> {
        let staged = self.dir.keep();
        let backup = if self.dest.exists() {
            let mut name = staged.as_os_str().to_os_string();
            name.push(".previous");
            let backup = PathBuf::from(name);
            if let Err(e) = fs::rename(&self.dest, &backup) {
                let _ = fs::remove_dir_all(&staged);
                return Err(e);
            }
            Some(backup)
        } else {
            None
        };

        if let Err(e) = fs::rename(&staged, &self.dest) {
            if let Some(backup) = &backup {
                if let Err(restore) = fs::rename(backup, &self.dest) {
                    warn!(
                        "Cannot restore {} from {}: {}",
                        self.dest.display(),
                        backup.display(),
                        restore
                    );
                }
            }
            let _ = fs::remove_dir_all(&staged);
            return Err(e);
        }

        if let Some(backup) = backup {
            if let Err(e) = fs::remove_dir_all(&backup) {
                warn!("Cannot remove previous output {}: {}", backup.display(), e);
            }
        }
        info!("Wrote curated dataset to {}", self.dest.display());
        Ok(self.dest)
    }
}
