use std::fmt;
use std::path::PathBuf;

use grammar::TokenizeError;

/// Why a line could not be tried against the templates at all.
///
/// A well-formed line that matches nothing is not an error; `parse_line`
/// returns `Ok(None)` for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    Empty,
    Tokenize(TokenizeError),
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Empty => write!(f, "empty line"),
            LineError::Tokenize(err) => write!(f, "malformed line: {}", err),
        }
    }
}

impl std::error::Error for LineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LineError::Empty => None,
            LineError::Tokenize(err) => Some(err),
        }
    }
}

impl From<TokenizeError> for LineError {
    fn from(err: TokenizeError) -> Self {
        LineError::Tokenize(err)
    }
}

/// What a loader callback reports back to the [`FileRegistry`](crate::reload::FileRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// The file changed, but the change cannot be applied while running.
    NoDynamic,
    /// The file could not be loaded at all.
    Failed(String),
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::NoDynamic => write!(f, "changes cannot be applied while running"),
            LoaderError::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for LoaderError {}

/// Fatal outcomes of registering or reloading files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadError {
    NotFound(PathBuf),
    LoadFailure { path: PathBuf, reason: String },
}

impl fmt::Display for ReloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadError::NotFound(path) => write!(f, "file not found: {}", path.display()),
            ReloadError::LoadFailure { path, reason } => {
                write!(f, "failed to load {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ReloadError {}
