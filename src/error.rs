// =============================================================================
// error.rs — EVERYTHING THAT CAN GO WRONG BETWEEN A DIRECTORY AND A DATASET
// =============================================================================
//
// Three ways to die, one way to merely complain:
//
//   DirectoryRead  — a directory refused to be listed
//   FileRead       — an accounts.json refused to be read
//   Parse          — an accounts.json was read, and it was not what we hoped
//
// An explorer directory we don't recognize is NOT an error. Those records
// just ship without a chain ID and a warning in the logs.
//
// Every variant carries the offending path, because "failed to parse JSON"
// without a path is how you end up grepping 400 files at 2am.
// =============================================================================

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for the combine pipeline.
pub type Result<T> = std::result::Result<T, CombineError>;

/// The fatal error taxonomy of a combine run.
#[derive(Debug, Error)]
pub enum CombineError {
    /// A directory could not be listed (missing, permissions, not a directory).
    #[error("failed to read directory {}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An accounts.json file could not be read as UTF-8 text.
    #[error("failed to read {}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file content is not valid JSON.
    #[error("invalid JSON in {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON, but the top level is not an array.
    #[error("expected a JSON array in {}, found {found}", path.display())]
    NotAnArray { path: PathBuf, found: &'static str },

    /// An array element has no fields to copy.
    #[error("expected an object at index {index} in {}, found {found}", path.display())]
    ElementNotObject {
        path: PathBuf,
        index: usize,
        found: &'static str,
    },
}

impl CombineError {
    /// The path the error is about.
    pub fn path(&self) -> &PathBuf {
        match self {
            CombineError::DirectoryRead { path, .. }
            | CombineError::FileRead { path, .. }
            | CombineError::Parse { path, .. }
            | CombineError::NotAnArray { path, .. }
            | CombineError::ElementNotObject { path, .. } => path,
        }
    }

    /// True for the parse family (bad JSON, wrong shape).
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            CombineError::Parse { .. }
                | CombineError::NotAnArray { .. }
                | CombineError::ElementNotObject { .. }
        )
    }

    /// Builds a `DirectoryRead` out of a walkdir failure. walkdir errors that
    /// are not I/O errors (symlink loops) can't happen without following links,
    /// but they still get mapped to something sensible.
    pub(crate) fn from_walk(fallback: PathBuf, err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or(fallback);
        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("directory walk failed"));
        CombineError::DirectoryRead { path, source }
    }
}

/// Short name of a JSON value's kind for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
