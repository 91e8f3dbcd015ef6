use rusqlite::{params, params_from_iter, types::Value, Connection, Row};

use super::filter::Predicate;
use super::schema::SONG_ARTIST;
use crate::error::Result;
use crate::models::SongArtist;

fn from_row(row: &Row<'_>) -> rusqlite::Result<SongArtist> {
    Ok(SongArtist {
        id: row.get("song_artist_id")?,
        song_id: row.get("song_artist_song_id")?,
        artist_id: row.get("song_artist_artist_id")?,
        insert_date: row.get("song_artist_insert_date")?,
        update_date: row.get("song_artist_update_date")?,
    })
}

/// Link an artist to a song. Pairs are not de-duplicated: linking the same
/// pair twice stores two rows.
pub fn create(conn: &Connection, song_id: i64, artist_id: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO song_artist (song_id, artist_id) VALUES (?1, ?2)",
        params![song_id, artist_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Every song-artist link in insertion order, as export writes them.
pub fn find_all(conn: &Connection) -> Result<Vec<SongArtist>> {
    let sql = format!(
        "SELECT {} FROM song_artist ORDER BY song_artist.id",
        SONG_ARTIST.select_list()
    );
    let mut stmt = conn.prepare(&sql)?;
    let links = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

/// Links of one song, oldest first, so credits keep the order they were
/// entered in.
pub fn find_by_song_id(conn: &Connection, song_id: i64) -> Result<Vec<SongArtist>> {
    let sql = format!(
        "SELECT {} FROM song_artist WHERE song_artist.song_id = ?1 ORDER BY song_artist.id",
        SONG_ARTIST.select_list()
    );
    let mut stmt = conn.prepare(&sql)?;
    let links = stmt
        .query_map([song_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

/// Remove the links between `song_id` and each of `artist_ids`, leaving the
/// song's other links alone. An empty list deletes nothing and returns 0.
pub fn delete(conn: &Connection, song_id: i64, artist_ids: &[i64]) -> Result<usize> {
    if artist_ids.is_empty() {
        return Ok(0);
    }

    let mut values = vec![Value::Integer(song_id)];
    let artists = Predicate::is_in("artist_id", artist_ids).render(&mut values);
    let sql = format!("DELETE FROM song_artist WHERE song_id = ?1 AND {artists}");

    Ok(conn.execute(&sql, params_from_iter(values.iter()))?)
}

/// Detach a song from all of its artists ahead of deleting the song.
pub fn delete_by_song_id(conn: &Connection, song_id: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM song_artist WHERE song_id = ?1", [song_id])?)
}

/// Detach an artist from all of its songs ahead of deleting the artist.
pub fn delete_by_artist_id(conn: &Connection, artist_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM song_artist WHERE artist_id = ?1",
        [artist_id],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::database;
    use crate::db::{artists, songs};

    fn song_with_artists(db: &crate::db::Database, count: usize) -> (i64, Vec<i64>) {
        db.write(|tx| {
            let song = songs::create(tx, "Song", &[])?;
            let artists = (0..count)
                .map(|i| artists::create(tx, &format!("Artist {i}")))
                .collect::<Result<Vec<_>>>()?;
            Ok((song, artists))
        })
        .unwrap()
    }

    #[test]
    fn same_pair_twice_stores_two_rows() {
        let db = database();
        let (song, artists) = song_with_artists(&db, 1);

        db.write(|tx| {
            create(tx, song, artists[0])?;
            create(tx, song, artists[0])
        })
        .unwrap();

        assert_eq!(db.read(|conn| find_by_song_id(conn, song)).unwrap().len(), 2);
    }

    #[test]
    fn delete_only_touches_listed_artists() {
        let db = database();
        let (song, artists) = song_with_artists(&db, 3);
        db.write(|tx| {
            for artist in &artists {
                create(tx, song, *artist)?;
            }
            Ok(())
        })
        .unwrap();

        let deleted = db
            .write(|tx| delete(tx, song, &[artists[0], artists[2]]))
            .unwrap();
        assert_eq!(deleted, 2);

        let remaining = db.read(|conn| find_by_song_id(conn, song)).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].artist_id, artists[1]);
    }

    #[test]
    fn delete_with_empty_list_is_a_no_op() {
        let db = database();
        let (song, artists) = song_with_artists(&db, 1);
        db.write(|tx| create(tx, song, artists[0])).unwrap();

        assert_eq!(db.write(|tx| delete(tx, song, &[])).unwrap(), 0);
        assert_eq!(db.read(|conn| find_by_song_id(conn, song)).unwrap().len(), 1);
    }

    #[test]
    fn linking_unknown_song_fails() {
        let db = database();
        let (_, artists) = song_with_artists(&db, 1);
        assert!(db.write(|tx| create(tx, 404, artists[0])).is_err());
    }
}
