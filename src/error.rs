//! Error type shared by every persistence operation.

use std::io;

/// Result alias used across the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any failure reported by SQLite. The original error is kept intact so
    /// callers can inspect the extended error code.
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// Creating or dropping a schema object failed.
    #[error("failed to set up {object}: {source}")]
    Schema {
        object: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("artist \"{0}\" already exists")]
    DuplicateArtist(String),

    #[error("invalid tag color \"{0}\", expected #rgb or #rrggbb")]
    InvalidColor(String),

    #[error("{0} name must not be empty")]
    EmptyName(&'static str),

    /// An imported link points at an id the document never defined.
    #[error("imported document references unknown {kind} #{id}")]
    UnknownReference { kind: &'static str, id: i64 },
}

impl Error {
    pub(crate) fn schema(object: impl Into<String>, source: rusqlite::Error) -> Self {
        Error::Schema {
            object: object.into(),
            source,
        }
    }
}
