//! Reading, merging and writing configuration sources.
//!
//! [`ConfigLoader`] reads every present scope and folds them with
//! [`deep_merge`]; [`ConfigWriter`] patches a single source in place and
//! registers the write with the shared self-write tracker.

mod loader;
mod merge;
mod writer;

pub use loader::{ConfigLoader, parse_document};
pub use merge::{CONCAT_KEYS, MergedConfig, ScopedConfig, deep_merge, lookup};
pub use writer::{ConfigWriter, WriteReport};

use std::path::PathBuf;

use thiserror::Error;

use crate::jsonc::JsoncError;
use crate::types::Scope;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse {scope} config{}: {message}", display_path(.path))]
    Parse {
        scope: Scope,
        path: Option<PathBuf>,
        message: String,
    },

    #[error("{scope} config{} must be a JSON object", display_path(.path))]
    NotAnObject { scope: Scope, path: Option<PathBuf> },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{scope} scope has no writable location")]
    NotWritable { scope: Scope },

    #[error("cannot patch {}: {source}", .path.display())]
    Patch {
        path: PathBuf,
        #[source]
        source: JsoncError,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" at {}", p.display()))
        .unwrap_or_default()
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
