//! Embedded persistence for a song-lyrics and chord-sheet manager.
//!
//! Songs own sheets (pages of lyrics or chords), are linked many-to-many to
//! artists and to tags (repertoires), and can be searched accent-insensitively.
//! Everything lives in a single SQLite file reached through one
//! [`Database`] handle; each repository in [`db`] owns the SQL of its table.
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod text;
pub mod transfer;

pub use db::Database;
pub use error::{Error, Result};

pub use models::{
    Artist, ArtistRef, ResultKind, SearchFilter, SearchItem, Sheet, Song, SongArtist,
    SongListing, SongTag, Tag,
};
pub use transfer::{ImportSummary, Snapshot};
