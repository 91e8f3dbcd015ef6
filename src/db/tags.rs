use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::debug;

use super::schema::TAG;
use super::song_tags;
use crate::error::{Error, Result};
use crate::models::Tag;
use crate::text::clean_name;

/// Live count of songs carrying the outer `tag` row.
const SONG_AMOUNT: &str =
    "(SELECT COUNT(*) FROM song_tag st WHERE st.tag_id = tag.id) AS tag_amount";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get("tag_id")?,
        name: row.get("tag_name")?,
        color: row.get("tag_color")?,
        amount: row.get("tag_amount")?,
        insert_date: row.get("tag_insert_date")?,
        update_date: row.get("tag_update_date")?,
    })
}

/// Accept `#rgb` or `#rrggbb`, stored lowercased. Blank means no color.
fn normalize_color(color: Option<&str>) -> Result<Option<String>> {
    let Some(color) = color.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };

    let valid = color
        .strip_prefix('#')
        .filter(|hex| matches!(hex.len(), 3 | 6))
        .is_some_and(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()));

    if valid {
        Ok(Some(color.to_ascii_lowercase()))
    } else {
        Err(Error::InvalidColor(color.to_string()))
    }
}

/// Create a repertoire. The color is optional but must be `#rgb` or
/// `#rrggbb` when given, and is stored lowercase.
pub fn create(conn: &Connection, name: &str, color: Option<&str>) -> Result<i64> {
    let name = clean_name(name).ok_or(Error::EmptyName("tag"))?;
    let color = normalize_color(color)?;

    conn.execute(
        "INSERT INTO tag (name, color) VALUES (?1, ?2)",
        params![name, color],
    )?;
    let id = conn.last_insert_rowid();

    debug!("Created tag #{id} {name:?}");
    Ok(id)
}

/// Every tag with its song count, ordered by name.
pub fn find(conn: &Connection) -> Result<Vec<Tag>> {
    let sql = format!(
        "SELECT {}, {SONG_AMOUNT} FROM tag ORDER BY tag.name COLLATE NOCASE, tag.id",
        TAG.select_list()
    );
    let mut stmt = conn.prepare(&sql)?;
    let tags = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Load one tag with its current song count.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Tag>> {
    let sql = format!(
        "SELECT {}, {SONG_AMOUNT} FROM tag WHERE tag.id = ?1",
        TAG.select_list()
    );
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

/// Tags applied to one song.
pub fn find_by_song_id(conn: &Connection, song_id: i64) -> Result<Vec<Tag>> {
    let sql = format!(
        "SELECT {}, {SONG_AMOUNT} FROM tag
         INNER JOIN song_tag ON song_tag.tag_id = tag.id
         WHERE song_tag.song_id = ?1
         ORDER BY tag.name COLLATE NOCASE, tag.id",
        TAG.select_list()
    );
    let mut stmt = conn.prepare(&sql)?;
    let tags = stmt
        .query_map([song_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Rename and recolor a tag. Returns the number of rows touched.
pub fn update(conn: &Connection, id: i64, name: &str, color: Option<&str>) -> Result<usize> {
    let name = clean_name(name).ok_or(Error::EmptyName("tag"))?;
    let color = normalize_color(color)?;

    Ok(conn.execute(
        "UPDATE tag SET name = ?1, color = ?2 WHERE id = ?3",
        params![name, color, id],
    )?)
}

/// Remove a tag after detaching it from every song.
pub fn delete(tx: &Transaction<'_>, id: i64) -> Result<usize> {
    let detached = song_tags::delete_by_tag_id(tx, id)?;
    let deleted = tx.execute("DELETE FROM tag WHERE id = ?1", [id])?;
    debug!("Deleted tag #{id}, detached from {detached} songs");
    Ok(deleted)
}
