use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "mediameta";
const LAST_ROOT_FILE: &str = "last_root";

/// Remembers the most recently scanned folder between runs. Owned by the
/// CLI; the scanning core only ever sees an already-resolved root.
#[derive(Debug, Clone)]
pub struct LastRootStore {
    file: PathBuf,
}

impl LastRootStore {
    pub fn at(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    pub fn default_location() -> Self {
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push(APP_DIR);
        path.push(LAST_ROOT_FILE);
        Self::at(path)
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// The remembered folder, if it still exists. A stale entry is removed.
    pub fn load(&self) -> Option<PathBuf> {
        let contents = fs::read_to_string(&self.file).ok()?;
        let trimmed = contents.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(trimmed);
            if path.is_dir() {
                return Some(path);
            }
        }
        tracing::debug!(file = %self.file.display(), "discarding stale last root");
        let _ = fs::remove_file(&self.file);
        None
    }

    /// Stores `root` if it names a directory. Returns whether it was stored.
    pub fn save(&self, root: &Path) -> io::Result<bool> {
        if !root.is_dir() {
            return Ok(false);
        }
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        fs::write(&self.file, root.to_string_lossy().as_bytes())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = LastRootStore::at(dir.path().join("state/last_root"));
        assert_eq!(store.load(), None);

        let media = dir.path().join("media");
        fs::create_dir(&media).unwrap();
        assert!(store.save(&media).unwrap());
        assert_eq!(store.load(), Some(fs::canonicalize(&media).unwrap()));
    }

    #[test]
    fn refuses_to_remember_non_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = LastRootStore::at(dir.path().join("last_root"));
        let file = dir.path().join("clip.mp4");
        fs::write(&file, b"x").unwrap();

        assert!(!store.save(&file).unwrap());
        assert!(!store.save(&dir.path().join("missing")).unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn stale_entry_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = LastRootStore::at(dir.path().join("last_root"));
        fs::write(store.path(), dir.path().join("gone").to_string_lossy().as_bytes()).unwrap();

        assert_eq!(store.load(), None);
        assert!(!store.path().exists());
    }
}
