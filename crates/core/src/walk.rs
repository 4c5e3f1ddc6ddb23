use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, FilterEntry, WalkDir};

use crate::formats::{classify, FileClass};

const HIDDEN_MARKER: char = '.';

#[derive(Debug)]
pub enum WalkEntry {
    File(PathBuf),
    /// An entry that could not be read. The walk carries on past it.
    Failed { path: PathBuf, error: io::Error },
}

impl WalkEntry {
    pub fn path(&self) -> &Path {
        match self {
            WalkEntry::File(path) => path,
            WalkEntry::Failed { path, .. } => path,
        }
    }
}

/// Recursive, lazy enumeration of the non-hidden files under a root.
///
/// Entries within a directory come back sorted by file name, so two walks of
/// an unchanged tree yield the same sequence. Hidden directories are pruned
/// rather than descended. Symlinked directories are not followed.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Starts a fresh traversal. Each call is independent.
    pub fn walk(&self) -> Walk {
        let inner = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(is_visible as fn(&DirEntry) -> bool);
        Walk { inner }
    }

    /// Walk restricted to files the format registry accepts.
    pub fn candidates(&self) -> impl Iterator<Item = WalkEntry> {
        self.walk()
            .filter(|entry| classify(entry.path()) != FileClass::Unsupported)
    }
}

pub fn walk(root: impl Into<PathBuf>) -> Walk {
    DirectoryWalker::new(root).walk()
}

pub struct Walk {
    inner: FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>,
}

impl std::fmt::Debug for Walk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walk").finish_non_exhaustive()
    }
}

impl Iterator for Walk {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
                    return Some(WalkEntry::Failed { path, error });
                }
            };

            if entry.file_type().is_file() {
                return Some(WalkEntry::File(entry.into_path()));
            }

            if entry.file_type().is_symlink() && entry.path().is_file() {
                return Some(WalkEntry::File(entry.into_path()));
            }
        }
    }
}

fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !is_hidden_name(entry.file_name())
}

pub fn is_hidden_name(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with(HIDDEN_MARKER)
}
