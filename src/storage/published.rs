use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::types::StoreError;

/// Record of image URLs already delivered, backed by an append-only text file.
///
/// The in-memory set is loaded once and only ever grows. Every call to
/// [`PublishedImages::record`] writes the URL to disk before it is added to
/// the set, so the file is never behind what the set claims was delivered.
#[derive(Debug)]
pub struct PublishedImages {
    path: PathBuf,
    seen: HashSet<String>,
}

impl PublishedImages {
    /// Load the record from `path`.
    ///
    /// A missing file yields an empty record; its parent directory is created
    /// so the first append cannot fail on a missing directory. Blank lines are
    /// ignored and surrounding whitespace is trimmed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        ensure_parent_dir(&path)?;

        let seen = match std::fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    path = %path.display(),
                    "No published images file yet, starting empty"
                );
                HashSet::new()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        tracing::info!(
            path = %path.display(),
            count = seen.len(),
            "Loaded published images"
        );
        Ok(Self { path, seen })
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Whether `url` survives a write and reload unchanged: non-empty, no
    /// surrounding whitespace, no line breaks.
    pub fn is_storable(url: &str) -> bool {
        !url.is_empty() && url.trim() == url && !url.contains(['\n', '\r'])
    }

    /// Append `url` to the backing file, then remember it in memory.
    ///
    /// The file is opened, written, synced and closed on every call. Must be
    /// called only after a confirmed delivery and before the next attempt.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unstorable`] if `url` fails [`PublishedImages::is_storable`];
    /// nothing is written in that case.
    pub fn record(&mut self, url: &str) -> Result<(), StoreError> {
        if !Self::is_storable(url) {
            return Err(StoreError::Unstorable {
                url: url.to_owned(),
            });
        }
        ensure_parent_dir(&self.path)?;

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        writeln!(file, "{url}").map_err(io_err)?;
        file.sync_data().map_err(io_err)?;
        drop(file);

        self.seen.insert(url.to_owned());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
