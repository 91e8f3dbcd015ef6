//! Records that mirror the SQLite schema. They stay plain data holders; the
//! repositories in `db` own every query that produces them.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: i64,
    pub name: String,
    /// Folded copy of `name` used only for matching.
    #[serde(default)]
    pub unaccented_name: String,
    pub insert_date: NaiveDateTime,
    pub update_date: Option<NaiveDateTime>,
}

/// One row of a song listing: the song plus its artist names joined with
/// `", "`. `artists` is `None` when the song has no artist linked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongListing {
    pub id: i64,
    pub name: String,
    pub artists: Option<String>,
    pub insert_date: NaiveDateTime,
    pub update_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub unaccented_name: String,
    pub insert_date: NaiveDateTime,
    pub update_date: Option<NaiveDateTime>,
}

/// A titled page of lyrics or chords belonging to a single song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub id: i64,
    pub song_id: i64,
    pub title: String,
    pub content: String,
    pub insert_date: NaiveDateTime,
    pub update_date: Option<NaiveDateTime>,
}

/// A repertoire. `amount` is counted from `song_tag` at read time and never
/// stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    #[serde(default)]
    pub amount: i64,
    pub insert_date: NaiveDateTime,
    pub update_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongArtist {
    pub id: i64,
    pub song_id: i64,
    pub artist_id: i64,
    pub insert_date: NaiveDateTime,
    pub update_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongTag {
    pub id: i64,
    pub song_id: i64,
    pub tag_id: i64,
    pub song_position: Option<i64>,
    pub insert_date: NaiveDateTime,
    pub update_date: Option<NaiveDateTime>,
}

/// Artist attached while creating a song: either a row that already exists
/// or a name to insert first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtistRef {
    Existing(i64),
    New(String),
}

impl ArtistRef {
    pub fn new(name: impl Into<String>) -> Self {
        ArtistRef::New(name.into())
    }
}

/// Which entity types the home search should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchFilter {
    #[default]
    All,
    Songs,
    Artists,
}

impl SearchFilter {
    pub fn includes_songs(self) -> bool {
        matches!(self, SearchFilter::All | SearchFilter::Songs)
    }

    pub fn includes_artists(self) -> bool {
        matches!(self, SearchFilter::All | SearchFilter::Artists)
    }
}

impl FromStr for SearchFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(SearchFilter::All),
            "songs" | "song" => Ok(SearchFilter::Songs),
            "artists" | "artist" => Ok(SearchFilter::Artists),
            other => Err(format!("unknown search filter \"{other}\"")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Song,
    Artist,
}

impl ResultKind {
    pub(crate) fn from_sql(value: &str) -> Option<Self> {
        match value {
            "song" => Some(ResultKind::Song),
            "artist" => Some(ResultKind::Artist),
            _ => None,
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultKind::Song => write!(f, "song"),
            ResultKind::Artist => write!(f, "artist"),
        }
    }
}

/// Uniform search row so songs and artists can be rendered interchangeably.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    #[serde(rename = "type")]
    pub kind: ResultKind,
    pub id: i64,
    pub name: String,
    pub artists: Option<String>,
    pub insert_date: NaiveDateTime,
    pub update_date: Option<NaiveDateTime>,
}

impl SearchItem {
    /// `Name - Artists` for songs with artists, otherwise the bare name.
    pub fn display_title(&self) -> String {
        match self.artists.as_deref() {
            Some(artists) if !artists.trim().is_empty() => format!("{} - {}", self.name, artists),
            _ => self.name.clone(),
        }
    }
}
