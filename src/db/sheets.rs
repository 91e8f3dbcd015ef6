use rusqlite::{params, Connection, OptionalExtension, Row};

use super::schema::SHEET;
use crate::error::Result;
use crate::models::Sheet;

fn from_row(row: &Row<'_>) -> rusqlite::Result<Sheet> {
    Ok(Sheet {
        id: row.get("sheet_id")?,
        song_id: row.get("sheet_song_id")?,
        title: row.get("sheet_title")?,
        content: row.get("sheet_content")?,
        insert_date: row.get("sheet_insert_date")?,
        update_date: row.get("sheet_update_date")?,
    })
}

/// Add a page to a song. Fails with a foreign-key error when the song does
/// not exist.
pub fn create(conn: &Connection, song_id: i64, title: &str, content: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO sheet (song_id, title, content) VALUES (?1, ?2, ?3)",
        params![song_id, title, content],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Load a single page, e.g. when the editor reopens it.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Sheet>> {
    let sql = format!("SELECT {} FROM sheet WHERE sheet.id = ?1", SHEET.select_list());
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

/// Pages of one song in creation order.
pub fn find_by_song_id(conn: &Connection, song_id: i64) -> Result<Vec<Sheet>> {
    let sql = format!(
        "SELECT {} FROM sheet WHERE sheet.song_id = ?1 ORDER BY sheet.id",
        SHEET.select_list()
    );
    let mut stmt = conn.prepare(&sql)?;
    let sheets = stmt
        .query_map([song_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sheets)
}

/// Retitle a page. The update trigger stamps `update_date`; an unknown id
/// touches nothing and returns 0.
pub fn update_title(conn: &Connection, id: i64, title: &str) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE sheet SET title = ?1 WHERE id = ?2",
        params![title, id],
    )?)
}

/// Replace the lyrics or chords of a page.
pub fn update_content(conn: &Connection, id: i64, content: &str) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE sheet SET content = ?1 WHERE id = ?2",
        params![content, id],
    )?)
}

/// Remove one page. The song keeps its other sheets.
pub fn delete(conn: &Connection, id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM sheet WHERE id = ?1", [id])?)
}

/// Drop every page of a song. Song deletion calls this before removing
/// the parent row, since the foreign key does not cascade.
pub fn delete_by_song_id(conn: &Connection, song_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM sheet WHERE song_id = ?1", [song_id])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::songs;
    use crate::db::test_support::database;
    use crate::error::Error;

    #[test]
    fn updates_touch_one_field_and_stamp_update_date() {
        let db = database();
        let id = db
            .write(|tx| {
                let song = songs::create(tx, "Imagine", &[])?;
                create(tx, song, "Verse", "Imagine there's no heaven")
            })
            .unwrap();

        let fresh = db.read(|conn| find_by_id(conn, id)).unwrap().unwrap();
        assert!(fresh.update_date.is_none());

        assert_eq!(db.write(|tx| update_title(tx, id, "Verse 1")).unwrap(), 1);
        assert_eq!(db.write(|tx| update_content(tx, id, "No hell below us")).unwrap(), 1);

        let sheet = db.read(|conn| find_by_id(conn, id)).unwrap().unwrap();
        assert_eq!(sheet.title, "Verse 1");
        assert_eq!(sheet.content, "No hell below us");
        assert!(sheet.update_date.unwrap() >= sheet.insert_date);
    }

    #[test]
    fn missing_sheet_updates_nothing() {
        let db = database();
        assert_eq!(db.write(|tx| update_title(tx, 7, "x")).unwrap(), 0);
        assert_eq!(db.write(|tx| delete(tx, 7)).unwrap(), 0);
    }

    #[test]
    fn sheet_requires_existing_song() {
        let db = database();
        let result = db.write(|tx| create(tx, 1, "Orphan", ""));
        assert!(matches!(result, Err(Error::Db(_))));
    }
}
