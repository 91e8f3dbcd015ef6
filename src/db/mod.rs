//! Persistence layer split per table. Each repository module owns the SQL of
//! its table; operations that must span several statements take a
//! `&Transaction` so they can only run inside [`Database::write`].

mod connection;

pub mod artists;
pub mod filter;
pub mod schema;
pub mod search;
pub mod sheets;
pub mod song_artists;
pub mod song_tags;
pub mod songs;
pub mod tags;

pub use connection::Database;

use rusqlite::{Error as SqlError, ErrorCode};

/// True when `err` is a UNIQUE / NOT NULL / FOREIGN KEY violation.
pub(crate) fn is_constraint_violation(err: &SqlError) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    )
}
