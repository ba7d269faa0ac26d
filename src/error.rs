//! Error taxonomy for the pruning pipeline.
//!
//! Every fatal condition the core can raise (spec §7) is a variant here.
//! `CacheMiss` is deliberately absent: a cache miss is recovered locally by
//! the cache layer and never surfaces past it.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The front end could not parse the sources.
    #[error("parsing failed: {0}")]
    ParseFatal(String),

    /// Front-end diagnostics were not successfully reported.
    #[error("failed to report compiler diagnostics: {0}")]
    DiagnosticsFatal(String),

    /// Zero or more than one top instance was found.
    #[error("exactly one top module is required, found {0}")]
    TopModuleCountInvalid(usize),

    /// A back-edge was found during the dependency DFS.
    #[error("cycle detected at buffer {buffer}: {}", path.display())]
    CycleDetected { buffer: String, path: PathBuf },

    /// Cache write failed after a successful run; does not change the
    /// pipeline's own exit status, but is reported to the user.
    #[error("failed to write cache to {}: {source}", path.display())]
    CacheWriteFailed { path: PathBuf, #[source] source: std::io::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

impl Error {
    pub fn msg(msg: impl std::fmt::Display) -> Self {
        Error::Message(msg.to_string())
    }
}
