//! Output directory layout.
//!
//! Each format writes into its own subtree directly below the output root
//! (`PixelMap/`, `VOC/`, `COCO/`). Resetting a subtree is a two-phase
//! protocol: [`OutputLayout::validate`] checks that the target really is
//! the expected generated subtree, then [`OutputLayout::reset`] removes and
//! recreates it. Nothing outside the subtree is ever touched.

use std::fs;
use std::path::PathBuf;

use crate::error::LabelforgeError;

/// Names of the generated subtrees; only these may be removed.
pub const SUBTREE_NAMES: &[&str] = &["PixelMap", "VOC", "COCO"];

/// The output subtree of one format.
#[derive(Clone, Debug)]
pub struct OutputLayout {
    root: PathBuf,
    name: &'static str,
    subdirs: &'static [&'static str],
}

impl OutputLayout {
    /// Layout for subtree `name` below `root`, with the given
    /// per-artifact subdirectories.
    pub fn new(root: impl Into<PathBuf>, name: &'static str, subdirs: &'static [&'static str]) -> Self {
        Self {
            root: root.into(),
            name,
            subdirs,
        }
    }

    /// The subtree directory, `<root>/<name>`.
    pub fn dir(&self) -> PathBuf {
        self.root.join(self.name)
    }

    /// Path of an artifact: `<root>/<name>/<subdir>/<base>.<ext>`.
    ///
    /// An empty `subdir` places the file directly in the subtree.
    pub fn artifact(&self, subdir: &str, base: &str, ext: &str) -> PathBuf {
        let mut path = self.dir();
        if !subdir.is_empty() {
            path.push(subdir);
        }
        path.push(format!("{base}.{ext}"));
        path
    }

    /// Whether anything exists at the subtree path.
    pub fn exists(&self) -> bool {
        fs::symlink_metadata(self.dir()).is_ok()
    }

    /// Checks that the subtree may be replaced.
    ///
    /// The root, when present, must be a directory. The subtree, when
    /// present, must be a real directory (not a symlink or file) with one
    /// of the generated names.
    pub fn validate(&self) -> Result<(), LabelforgeError> {
        if !SUBTREE_NAMES.contains(&self.name) {
            return Err(self.unexpected(self.dir(), "not a generated output subtree"));
        }

        if let Ok(meta) = fs::metadata(&self.root) {
            if !meta.is_dir() {
                return Err(self.unexpected(self.root.clone(), "output root is not a directory"));
            }
        }

        let dir = self.dir();
        match fs::symlink_metadata(&dir) {
            Ok(meta) if meta.file_type().is_symlink() => {
                Err(self.unexpected(dir, "subtree is a symbolic link"))
            }
            Ok(meta) if !meta.is_dir() => Err(self.unexpected(dir, "subtree is not a directory")),
            _ => Ok(()),
        }
    }

    /// Validates, removes any existing subtree, and recreates it with its
    /// subdirectories. Returns whether an existing subtree was removed.
    pub fn reset(&self) -> Result<bool, LabelforgeError> {
        self.validate()?;

        let dir = self.dir();
        let existed = self.exists();
        if existed {
            log::warn!("Removing existing output {}", dir.display());
            fs::remove_dir_all(&dir)?;
        }

        fs::create_dir_all(&dir)?;
        for subdir in self.subdirs {
            fs::create_dir_all(dir.join(subdir))?;
        }
        log::debug!("Created output layout under {}", dir.display());
        Ok(existed)
    }

    fn unexpected(&self, path: PathBuf, message: &str) -> LabelforgeError {
        LabelforgeError::UnexpectedOutputTarget {
            path,
            message: message.to_string(),
        }
    }
}
