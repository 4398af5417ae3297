// FairMine - platform/fs.rs
//
// Filesystem helpers for files owned by the current run.

use std::io;
use std::path::{Path, PathBuf};

/// A file that is removed when the guard goes out of scope.
///
/// Used for the model file the external discovery tool writes: whatever path
/// the run takes after launching the tool (success, parse failure, timeout,
/// panic unwinding), the file does not outlive it.
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    /// Take ownership of `path`. The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file as UTF-8, replacing invalid sequences.
    pub fn read_lossy(&self) -> io::Result<String> {
        let bytes = std::fs::read(&self.path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "Scoped file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove scoped file"
            ),
        }
    }
}

/// Create `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scoped_file_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output");
        {
            let guard = ScopedFile::new(&path);
            std::fs::write(guard.path(), "<definitions/>").unwrap();
            assert_eq!(guard.read_lossy().unwrap(), "<definitions/>");
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_scoped_file_missing_is_fine() {
        let dir = TempDir::new().unwrap();
        let guard = ScopedFile::new(dir.path().join("never-written"));
        assert!(guard.read_lossy().is_err());
        drop(guard);
    }

    #[test]
    fn test_read_lossy_replaces_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let guard = ScopedFile::new(dir.path().join("bin"));
        std::fs::write(guard.path(), [b'o', b'k', 0xff]).unwrap();
        assert_eq!(guard.read_lossy().unwrap(), "ok\u{fffd}");
    }

    #[test]
    fn test_ensure_dir_nested() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(Path::new("")).unwrap();
    }
}
