//! Home-screen search producing one feed of songs and artists.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use tracing::debug;

use super::filter::{where_clause, SearchWords};
use super::songs::ARTISTS_OF_SONG;
use crate::error::Result;
use crate::models::{ResultKind, SearchFilter, SearchItem};

/// Dates leave the query in one fixed ISO-like shape whatever table they
/// come from.
fn iso_date(column: &str) -> String {
    format!("strftime('%Y-%m-%dT%H:%M:%f', {column})")
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<SearchItem> {
    let kind: String = row.get("kind")?;
    let kind = ResultKind::from_sql(&kind).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, kind.clone(), rusqlite::types::Type::Text)
    })?;

    Ok(SearchItem {
        kind,
        id: row.get("id")?,
        name: row.get("name")?,
        artists: row.get("artists")?,
        insert_date: row.get("insert_date")?,
        update_date: row.get("update_date")?,
    })
}

fn songs_query(words: &SearchWords, values: &mut Vec<Value>) -> String {
    let predicate = words.any_contained_in(&["song.unaccented_name", "artist.unaccented_name"]);
    let filter = where_clause(predicate.as_ref(), values);
    format!(
        "SELECT 'song' AS kind, song.id AS id, song.name AS name, {ARTISTS_OF_SONG} AS artists,
                {insert} AS insert_date, {update} AS update_date
         FROM song
         LEFT JOIN song_artist ON song_artist.song_id = song.id
         LEFT JOIN artist ON artist.id = song_artist.artist_id
         {filter}
         GROUP BY song.id",
        insert = iso_date("song.insert_date"),
        update = iso_date("song.update_date"),
    )
}

fn artists_query(words: &SearchWords, values: &mut Vec<Value>) -> String {
    let predicate = words.any_contained_in(&["artist.unaccented_name"]);
    let filter = where_clause(predicate.as_ref(), values);
    format!(
        "SELECT 'artist' AS kind, artist.id AS id, artist.name AS name, NULL AS artists,
                {insert} AS insert_date, {update} AS update_date
         FROM artist
         {filter}",
        insert = iso_date("artist.insert_date"),
        update = iso_date("artist.update_date"),
    )
}

/// Search songs, artists or both. Empty text returns every row of the
/// requested kinds. Otherwise the text is split into words and a row matches
/// when ANY word is found in its folded name (songs also match on their
/// artists' names). Results are newest first.
pub fn search(conn: &Connection, text: &str, filter: SearchFilter) -> Result<Vec<SearchItem>> {
    let words = SearchWords::parse(text);
    let mut values = Vec::new();

    let mut parts = Vec::with_capacity(2);
    if filter.includes_songs() {
        parts.push(songs_query(&words, &mut values));
    }
    if filter.includes_artists() {
        parts.push(artists_query(&words, &mut values));
    }

    let sql = format!(
        "{} ORDER BY insert_date DESC, id DESC",
        parts.join(" UNION ALL ")
    );
    debug!("Searching {:?} for {:?}", filter, words.words());

    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params_from_iter(values.iter()), from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}
