use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{LoaderError, ReloadError};

/// Non-static files examined per `poll_once` call, unless changed with
/// [`FileRegistry::with_slice`].
pub const DEFAULT_SLICE: usize = 8;

/// Callback that (re)loads one file.
pub type Loader = Box<dyn FnMut(&Path) -> Result<(), LoaderError>>;

/// Outcome of a pass that did not hit a fatal load failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadStatus {
    Ok,
    /// At least one registered file was missing.
    NotFound,
    /// At least one file could not be applied; the rest of the pass went on.
    NoDynamic,
}

struct WatchedFile {
    path: PathBuf,
    loader: Loader,
    is_static: bool,
    /// `None` until the file has been loaded once.
    modified: Option<SystemTime>,
}

enum Visit {
    Missing,
    Unchanged,
    Reloaded,
    Declined,
}

/// Files whose loaders are re-run when their modification time changes.
///
/// Static files are loaded once at registration and only again through
/// [`reload_all`](FileRegistry::reload_all). Dynamic files are picked up by
/// [`poll_once`](FileRegistry::poll_once), which resumes where the previous
/// call stopped and examines a bounded slice of files each time.
pub struct FileRegistry {
    files: Vec<WatchedFile>,
    cursor: usize,
    slice: usize,
}

impl FileRegistry {
    pub fn new() -> Self {
        FileRegistry {
            files: Vec::new(),
            cursor: 0,
            slice: DEFAULT_SLICE,
        }
    }

    pub fn with_slice(mut self, slice: usize) -> Self {
        self.slice = slice.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }

    /// Add a file. Fails if it does not exist; static files are loaded right away.
    pub fn register<F>(
        &mut self,
        path: impl Into<PathBuf>,
        loader: F,
        is_static: bool,
    ) -> Result<ReloadStatus, ReloadError>
    where
        F: FnMut(&Path) -> Result<(), LoaderError> + 'static,
    {
        let path = path.into();
        tracing::debug!(path = %path.display(), is_static, "registering file");

        let Some(modified) = modification_time(&path) else {
            tracing::warn!(path = %path.display(), "file not found");
            return Err(ReloadError::NotFound(path));
        };

        self.files.push(WatchedFile {
            path,
            loader: Box::new(loader),
            is_static,
            modified: None,
        });
        self.cursor = 0;

        if !is_static {
            return Ok(ReloadStatus::Ok);
        }

        let Some(entry) = self.files.last_mut() else {
            return Ok(ReloadStatus::Ok);
        };
        match (entry.loader)(&entry.path) {
            Ok(()) => {
                entry.modified = Some(modified);
                Ok(ReloadStatus::Ok)
            }
            Err(LoaderError::NoDynamic) => Ok(ReloadStatus::NoDynamic),
            Err(LoaderError::Failed(reason)) => {
                tracing::error!(path = %entry.path.display(), %reason, "load failed");
                Err(ReloadError::LoadFailure {
                    path: entry.path.clone(),
                    reason,
                })
            }
        }
    }

    /// Check the next slice of dynamic files and reload the ones that changed.
    ///
    /// Reloaded files do not count against the slice. A loader failure other
    /// than [`LoaderError::NoDynamic`] stops the pass.
    pub fn poll_once(&mut self) -> Result<ReloadStatus, ReloadError> {
        let mut visited = 0;
        let mut failed = 0;

        while self.cursor < self.files.len() && visited < self.slice {
            let entry = &mut self.files[self.cursor];
            if !entry.is_static {
                match visit(entry, false)? {
                    Visit::Missing => {
                        visited += 1;
                        failed += 1;
                    }
                    Visit::Unchanged => visited += 1,
                    Visit::Reloaded => {}
                    Visit::Declined => failed += 1,
                }
            }
            self.cursor += 1;
        }

        if self.cursor >= self.files.len() {
            self.cursor = 0;
        }

        Ok(if failed > 0 {
            ReloadStatus::NoDynamic
        } else {
            ReloadStatus::Ok
        })
    }

    /// Reload every file, static ones included, whether it changed or not.
    pub fn reload_all(&mut self) -> Result<ReloadStatus, ReloadError> {
        let mut missing = 0;
        let mut failed = 0;

        for entry in &mut self.files {
            match visit(entry, true)? {
                Visit::Missing => missing += 1,
                Visit::Declined => failed += 1,
                Visit::Unchanged | Visit::Reloaded => {}
            }
        }
        self.cursor = 0;

        Ok(if missing > 0 {
            ReloadStatus::NotFound
        } else if failed > 0 {
            ReloadStatus::NoDynamic
        } else {
            ReloadStatus::Ok
        })
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.cursor = 0;
    }
}

impl Default for FileRegistry {
    fn default() -> Self {
        FileRegistry::new()
    }
}

impl fmt::Debug for FileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRegistry")
            .field("files", &self.files.iter().map(|e| &e.path).collect::<Vec<_>>())
            .field("cursor", &self.cursor)
            .field("slice", &self.slice)
            .finish()
    }
}

fn visit(entry: &mut WatchedFile, force: bool) -> Result<Visit, ReloadError> {
    let Some(modified) = modification_time(&entry.path) else {
        tracing::warn!(path = %entry.path.display(), "file not found");
        return Ok(Visit::Missing);
    };
    if !force && entry.modified == Some(modified) {
        return Ok(Visit::Unchanged);
    }
    entry.modified = Some(modified);

    tracing::debug!(path = %entry.path.display(), "reloading file");
    match (entry.loader)(&entry.path) {
        Ok(()) => Ok(Visit::Reloaded),
        Err(LoaderError::NoDynamic) => {
            tracing::warn!(path = %entry.path.display(), "change cannot be applied while running");
            Ok(Visit::Declined)
        }
        Err(LoaderError::Failed(reason)) => {
            tracing::error!(path = %entry.path.display(), %reason, "load failed");
            Err(ReloadError::LoadFailure {
                path: entry.path.clone(),
                reason,
            })
        }
    }
}

/// `None` when the file cannot be found.
fn modification_time(path: &Path) -> Option<SystemTime> {
    let metadata = std::fs::metadata(path).ok()?;
    Some(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH))
}
