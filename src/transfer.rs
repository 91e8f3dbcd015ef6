//! Portable JSON snapshot of the whole store.
//!
//! Export reads every collection through the repositories. Import replays the
//! repository create operations on one transaction, parents before links,
//! and remaps the document's ids to the ids the store hands out. Nothing is
//! merged with existing rows: importing twice duplicates songs, sheets, tags
//! and links. Artist names are unique, so an artist already in the store is
//! reused instead of inserted again.

use std::collections::HashMap;

use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::{artists, sheets, song_artists, song_tags, songs, tags};
use crate::error::{Error, Result};
use crate::models::{Artist, Sheet, Song, SongArtist, SongTag, Tag};

/// A song together with its pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedSong {
    #[serde(flatten)]
    pub song: Song,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub songs: Vec<ExportedSong>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub songs_artists: Vec<SongArtist>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub songs_tags: Vec<SongTag>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Row counts written by [`import`]. `artists` counts inserted rows only;
/// artists matched by name are counted in `reused_artists`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub songs: usize,
    pub sheets: usize,
    pub artists: usize,
    pub reused_artists: usize,
    pub songs_artists: usize,
    pub tags: usize,
    pub songs_tags: usize,
}

/// Read every collection into a snapshot. Not isolated from concurrent
/// writers; call it through `Database::read` to hold the connection.
pub fn export(conn: &Connection) -> Result<Snapshot> {
    let songs = songs::find_all(conn)?
        .into_iter()
        .map(|song| {
            let sheets = sheets::find_by_song_id(conn, song.id)?;
            Ok(ExportedSong { song, sheets })
        })
        .collect::<Result<Vec<_>>>()?;

    let snapshot = Snapshot {
        songs,
        artists: artists::find_all(conn)?,
        songs_artists: song_artists::find_all(conn)?,
        tags: tags::find(conn)?,
        songs_tags: song_tags::find_all(conn)?,
    };

    info!(
        "Exported {} songs, {} artists, {} tags",
        snapshot.songs.len(),
        snapshot.artists.len(),
        snapshot.tags.len()
    );
    Ok(snapshot)
}

/// Old id to newly assigned id for one entity kind.
struct IdMap {
    kind: &'static str,
    ids: HashMap<i64, i64>,
}

impl IdMap {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            ids: HashMap::new(),
        }
    }

    fn insert(&mut self, old: i64, new: i64) {
        self.ids.insert(old, new);
    }

    fn get(&self, old: i64) -> Result<i64> {
        self.ids.get(&old).copied().ok_or(Error::UnknownReference {
            kind: self.kind,
            id: old,
        })
    }
}

/// Replay `snapshot` into the store. Any failure (including a link to an id
/// the document never defined) rolls the whole import back.
pub fn import(tx: &Transaction<'_>, snapshot: &Snapshot) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut song_ids = IdMap::new("song");
    let mut artist_ids = IdMap::new("artist");
    let mut tag_ids = IdMap::new("tag");

    for exported in &snapshot.songs {
        let id = songs::create(tx, &exported.song.name, &[])?;
        song_ids.insert(exported.song.id, id);
        summary.songs += 1;

        for sheet in &exported.sheets {
            sheets::create(tx, id, &sheet.title, &sheet.content)?;
            summary.sheets += 1;
        }
    }

    for artist in &snapshot.artists {
        let id = match artists::find_by_name(tx, &artist.name)? {
            Some(existing) => {
                debug!("Reusing artist #{} {:?}", existing.id, existing.name);
                summary.reused_artists += 1;
                existing.id
            }
            None => {
                summary.artists += 1;
                artists::create(tx, &artist.name)?
            }
        };
        artist_ids.insert(artist.id, id);
    }

    for tag in &snapshot.tags {
        let id = tags::create(tx, &tag.name, tag.color.as_deref())?;
        tag_ids.insert(tag.id, id);
        summary.tags += 1;
    }

    for link in &snapshot.songs_artists {
        song_artists::create(tx, song_ids.get(link.song_id)?, artist_ids.get(link.artist_id)?)?;
        summary.songs_artists += 1;
    }

    for link in &snapshot.songs_tags {
        let song_id = song_ids.get(link.song_id)?;
        let tag_id = tag_ids.get(link.tag_id)?;
        summary.songs_tags += song_tags::create(tx, &[song_id], &[tag_id])?;
        if link.song_position.is_some() {
            song_tags::update_position(tx, song_id, tag_id, link.song_position)?;
        }
    }

    info!(
        "Imported {} songs, {} sheets, {} artists, {} tags",
        summary.songs, summary.sheets, summary.artists, summary.tags
    );
    if summary.reused_artists > 0 {
        info!("Linked {} artists already in the store", summary.reused_artists);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::database;
    use crate::models::ArtistRef;

    #[test]
    fn json_uses_camel_case_collections() {
        let db = database();
        db.write(|tx| songs::create(tx, "Imagine", &[ArtistRef::new("John Lennon")]))
            .unwrap();
        let snapshot = db.read(|conn| export(conn)).unwrap();

        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert!(json["songsArtists"].is_array());
        assert!(json["songsTags"].is_array());
        assert_eq!(json["songs"][0]["name"], "Imagine");
        assert!(json["songs"][0]["insertDate"].is_string());
        assert!(json["songs"][0]["sheets"].is_array());
    }

    #[test]
    fn dangling_link_aborts_import() {
        let json = r#"{
            "songs": [],
            "artists": [],
            "songsArtists": [],
            "tags": [{"id": 1, "name": "Gig", "color": null,
                      "insertDate": "2024-01-01T10:00:00", "updateDate": null}],
            "songsTags": [{"id": 1, "songId": 5, "tagId": 1, "songPosition": null,
                           "insertDate": "2024-01-01T10:00:00", "updateDate": null}]
        }"#;
        let snapshot = Snapshot::from_json(json).unwrap();

        let db = database();
        let result = db.write(|tx| import(tx, &snapshot));
        assert!(matches!(
            result,
            Err(Error::UnknownReference { kind: "song", id: 5 })
        ));
        assert!(db.read(|conn| tags::find(conn)).unwrap().is_empty());
    }

    #[test]
    fn import_keeps_sheets_and_positions() {
        let source = database();
        source
            .write(|tx| {
                let song = songs::create(tx, "Imagine", &[])?;
                sheets::create(tx, song, "Chords", "C Cmaj7 F")?;
                let tag = tags::create(tx, "Set list", Some("#00ff00"))?;
                song_tags::create(tx, &[song], &[tag])?;
                song_tags::update_position(tx, song, tag, Some(2))
            })
            .unwrap();
        let snapshot = source.read(|conn| export(conn)).unwrap();

        let target = database();
        let summary = target.write(|tx| import(tx, &snapshot)).unwrap();
        assert_eq!(summary.sheets, 1);
        assert_eq!(summary.songs_tags, 1);

        let copy = target.read(|conn| export(conn)).unwrap();
        assert_eq!(copy.songs[0].sheets[0].content, "C Cmaj7 F");
        assert_eq!(copy.tags[0].color.as_deref(), Some("#00ff00"));
        assert_eq!(copy.songs_tags[0].song_position, Some(2));
    }

    #[test]
    fn importing_twice_duplicates_songs_but_reuses_artists() {
        let db = database();
        db.write(|tx| songs::create(tx, "Imagine", &[ArtistRef::new("John Lennon")]))
            .unwrap();
        let snapshot = db.read(|conn| export(conn)).unwrap();

        let first = db.write(|tx| import(tx, &snapshot)).unwrap();
        assert_eq!(first.songs, 1);
        assert_eq!(first.artists, 0);
        assert_eq!(first.reused_artists, 1);
        db.write(|tx| import(tx, &snapshot)).unwrap();

        db.read(|conn| {
            let all_songs = songs::find_all(conn)?;
            assert_eq!(all_songs.len(), 3);
            assert_eq!(artists::find_all(conn)?.len(), 1);
            assert_eq!(song_artists::find_all(conn)?.len(), 3);
            for song in &all_songs {
                assert_eq!(artists::find_by_song_id(conn, song.id)?[0].name, "John Lennon");
            }
            Ok(())
        })
        .unwrap();
    }
}
