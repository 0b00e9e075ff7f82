//! Ephemeral scratch-directory guard.
//!
//! Grounded on the teacher's explicit-doc-commented resource-lifecycle
//! discipline in `timeout.rs`/`output.rs` (state the mechanism and why it's
//! the safe one), applied here to filesystem scratch space: a handler that
//! panics, errors, or returns early must never leak its working directory,
//! so cleanup lives in `Drop` rather than at each return site.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Owns one ephemeral working directory under the configured scratch root.
/// Removed automatically when dropped — every exit path of a handler is
/// covered without needing a `finally`-style construct.
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn new(scratch_root: &Path, prefix: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(scratch_root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{prefix}-"))
            .tempdir_in(scratch_root)?;
        Ok(ScratchDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_dir_is_created_under_root() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(root.path(), "compile").unwrap();
        assert!(scratch.path().exists());
        assert!(scratch.path().starts_with(root.path()));
    }

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::new(root.path(), "judge").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn join_builds_path_inside_scratch_dir() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(root.path(), "run").unwrap();
        let joined = scratch.join("input.txt");
        assert_eq!(joined.parent().unwrap(), scratch.path());
    }
}
