use rusqlite::{params, params_from_iter, Connection, Row, Transaction};
use tracing::{debug, warn};

use super::filter::Predicate;
use super::schema::SONG_TAG;
use crate::error::Result;
use crate::models::SongTag;

fn from_row(row: &Row<'_>) -> rusqlite::Result<SongTag> {
    Ok(SongTag {
        id: row.get("song_tag_id")?,
        song_id: row.get("song_tag_song_id")?,
        tag_id: row.get("song_tag_tag_id")?,
        song_position: row.get("song_tag_song_position")?,
        insert_date: row.get("song_tag_insert_date")?,
        update_date: row.get("song_tag_update_date")?,
    })
}

/// Tag every song in `song_ids` with every tag in `tag_ids`. Each pair is
/// counted first and only inserted when absent, which is the only thing
/// keeping this table free of duplicates. Returns how many rows were added.
pub fn create(tx: &Transaction<'_>, song_ids: &[i64], tag_ids: &[i64]) -> Result<usize> {
    let mut exists =
        tx.prepare("SELECT COUNT(*) FROM song_tag WHERE song_id = ?1 AND tag_id = ?2")?;
    let mut insert = tx.prepare("INSERT INTO song_tag (song_id, tag_id) VALUES (?1, ?2)")?;

    let mut inserted = 0;
    for &song_id in song_ids {
        for &tag_id in tag_ids {
            let count: i64 = exists.query_row(params![song_id, tag_id], |r| r.get(0))?;
            if count > 0 {
                warn!("Song #{song_id} already has tag #{tag_id}, skipping");
                continue;
            }
            insert.execute(params![song_id, tag_id])?;
            inserted += 1;
        }
    }

    debug!("Added {inserted} song-tag links");
    Ok(inserted)
}

/// Every song-tag link in insertion order, as export writes them.
pub fn find_all(conn: &Connection) -> Result<Vec<SongTag>> {
    let sql = format!(
        "SELECT {} FROM song_tag ORDER BY song_tag.id",
        SONG_TAG.select_list()
    );
    let mut stmt = conn.prepare(&sql)?;
    let links = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

/// Links of one repertoire, including each song's position.
pub fn find_by_tag_id(conn: &Connection, tag_id: i64) -> Result<Vec<SongTag>> {
    let sql = format!(
        "SELECT {} FROM song_tag WHERE song_tag.tag_id = ?1 ORDER BY song_tag.id",
        SONG_TAG.select_list()
    );
    let mut stmt = conn.prepare(&sql)?;
    let links = stmt
        .query_map([tag_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

/// Place a song at `position` inside a repertoire; `None` clears it.
pub fn update_position(
    conn: &Connection,
    song_id: i64,
    tag_id: i64,
    position: Option<i64>,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE song_tag SET song_position = ?1 WHERE song_id = ?2 AND tag_id = ?3",
        params![position, song_id, tag_id],
    )?)
}

/// Remove every (song, tag) pair from the two lists. Either list being empty
/// deletes nothing.
pub fn delete(conn: &Connection, song_ids: &[i64], tag_ids: &[i64]) -> Result<usize> {
    if song_ids.is_empty() || tag_ids.is_empty() {
        return Ok(0);
    }

    let mut values = Vec::new();
    let pairs = Predicate::All(vec![
        Predicate::is_in("song_id", song_ids),
        Predicate::is_in("tag_id", tag_ids),
    ])
    .render(&mut values);

    Ok(conn.execute(
        &format!("DELETE FROM song_tag WHERE {pairs}"),
        params_from_iter(values.iter()),
    )?)
}

/// Take a song out of every repertoire ahead of deleting the song.
pub fn delete_by_song_id(conn: &Connection, song_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM song_tag WHERE song_id = ?1", [song_id])?)
}

/// Empty a repertoire ahead of deleting the tag itself.
pub fn delete_by_tag_id(conn: &Connection, tag_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM song_tag WHERE tag_id = ?1", [tag_id])?)
}
