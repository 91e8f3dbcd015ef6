use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use tracing::debug;

use super::filter::{where_clause, SearchWords};
use super::schema::SONG;
use super::{artists, sheets, song_artists, song_tags};
use crate::error::{Error, Result};
use crate::models::{ArtistRef, Song, SongListing};
use crate::text::{clean_name, unaccent};

/// Correlated subquery joining the names of every artist linked to the outer
/// `song` row, or NULL when there is none.
pub(crate) const ARTISTS_OF_SONG: &str = "(SELECT group_concat(a.name, ', ')
     FROM song_artist sa
     INNER JOIN artist a ON a.id = sa.artist_id
     WHERE sa.song_id = song.id)";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get("song_id")?,
        name: row.get("song_name")?,
        unaccented_name: row.get("song_unaccented_name")?,
        insert_date: row.get("song_insert_date")?,
        update_date: row.get("song_update_date")?,
    })
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<SongListing> {
    Ok(SongListing {
        id: row.get("song_id")?,
        name: row.get("song_name")?,
        artists: row.get("artists")?,
        insert_date: row.get("song_insert_date")?,
        update_date: row.get("song_update_date")?,
    })
}

/// Insert a song and attach `artists` to it. New artists are inserted first,
/// existing ones are linked by id. Runs on the caller's transaction, so a
/// failure on any artist discards the song too.
pub fn create(tx: &Transaction<'_>, name: &str, artists: &[ArtistRef]) -> Result<i64> {
    let name = clean_name(name).ok_or(Error::EmptyName("song"))?;

    tx.execute(
        "INSERT INTO song (name, unaccented_name) VALUES (?1, ?2)",
        params![name, unaccent(name)],
    )?;
    let id = tx.last_insert_rowid();

    artists::create_tx(tx, id, artists)?;

    debug!("Created song #{id} {name:?} with {} artists", artists.len());
    Ok(id)
}

/// List songs with their artist names. Empty `search` lists everything;
/// otherwise a song matches when ANY word appears in its name or in the
/// name of one of its artists.
pub fn find(conn: &Connection, search: &str) -> Result<Vec<SongListing>> {
    let words = SearchWords::parse(search);
    let predicate = words.any_contained_in(&["song.unaccented_name", "artist.unaccented_name"]);

    let mut values = Vec::new();
    let filter = where_clause(predicate.as_ref(), &mut values);
    let sql = format!(
        "SELECT song.id AS song_id, song.name AS song_name, {ARTISTS_OF_SONG} AS artists,
                song.insert_date AS song_insert_date, song.update_date AS song_update_date
         FROM song
         LEFT JOIN song_artist ON song_artist.song_id = song.id
         LEFT JOIN artist ON artist.id = song_artist.artist_id
         {filter}
         GROUP BY song.id
         ORDER BY song.insert_date DESC, song.id DESC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let songs = stmt
        .query_map(params_from_iter(values.iter()), listing_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(songs)
}

/// Load one song, `None` when the id is unknown.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Song>> {
    let sql = format!("SELECT {} FROM song WHERE song.id = ?1", SONG.select_list());
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

/// Every song, oldest first.
pub fn find_all(conn: &Connection) -> Result<Vec<Song>> {
    let sql = format!(
        "SELECT {} FROM song ORDER BY song.insert_date, song.id",
        SONG.select_list()
    );
    let mut stmt = conn.prepare(&sql)?;
    let songs = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(songs)
}

/// Songs of one repertoire, in their explicit position first and then by
/// name for the unpositioned ones.
pub fn find_by_tag_id(conn: &Connection, tag_id: i64) -> Result<Vec<SongListing>> {
    let sql = format!(
        "SELECT song.id AS song_id, song.name AS song_name, {ARTISTS_OF_SONG} AS artists,
                song.insert_date AS song_insert_date, song.update_date AS song_update_date
         FROM song
         INNER JOIN song_tag ON song_tag.song_id = song.id
         WHERE song_tag.tag_id = ?1
         ORDER BY song_tag.song_position IS NULL, song_tag.song_position,
                  song.name COLLATE NOCASE"
    );

    let mut stmt = conn.prepare(&sql)?;
    let songs = stmt
        .query_map([tag_id], listing_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(songs)
}

/// Rename a song, keeping `unaccented_name` in sync. Returns the number of
/// rows touched; 0 means the song does not exist.
pub fn update_name(conn: &Connection, id: i64, name: &str) -> Result<usize> {
    let name = clean_name(name).ok_or(Error::EmptyName("song"))?;
    let updated = conn.execute(
        "UPDATE song SET name = ?1, unaccented_name = ?2 WHERE id = ?3",
        params![name, unaccent(name), id],
    )?;
    Ok(updated)
}

/// Delete a song with everything that references it. Children go first
/// (sheets, artist links, tag links) because the schema has no cascades.
pub fn delete(tx: &Transaction<'_>, id: i64) -> Result<usize> {
    let sheets = sheets::delete_by_song_id(tx, id)?;
    let artist_links = song_artists::delete_by_song_id(tx, id)?;
    let tag_links = song_tags::delete_by_song_id(tx, id)?;
    let deleted = tx.execute("DELETE FROM song WHERE id = ?1", [id])?;

    debug!(
        "Deleted song #{id}: {sheets} sheets, {artist_links} artist links, {tag_links} tag links"
    );
    Ok(deleted)
}
