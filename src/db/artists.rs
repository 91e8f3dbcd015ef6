use rusqlite::{
    params, params_from_iter, Connection, Error as SqlError, OptionalExtension, Row, Transaction,
};
use tracing::debug;

use super::filter::Predicate;
use super::schema::ARTIST;
use super::{is_constraint_violation, song_artists};
use crate::error::{Error, Result};
use crate::models::{Artist, ArtistRef};
use crate::text::{clean_name, unaccent};

/// Maximum number of autocomplete suggestions.
pub const AUTOCOMPLETE_LIMIT: usize = 6;

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get("artist_id")?,
        name: row.get("artist_name")?,
        unaccented_name: row.get("artist_unaccented_name")?,
        insert_date: row.get("artist_insert_date")?,
        update_date: row.get("artist_update_date")?,
    })
}

/// Turn a UNIQUE violation on `artist.name` into a readable error.
fn map_unique_constraint(err: SqlError, name: &str) -> Error {
    if is_constraint_violation(&err) {
        Error::DuplicateArtist(name.to_string())
    } else {
        err.into()
    }
}

/// Insert a standalone artist row.
pub fn create(conn: &Connection, name: &str) -> Result<i64> {
    let name = clean_name(name).ok_or(Error::EmptyName("artist"))?;
    conn.execute(
        "INSERT INTO artist (name, unaccented_name) VALUES (?1, ?2)",
        params![name, unaccent(name)],
    )
    .map_err(|err| map_unique_constraint(err, name))?;

    Ok(conn.last_insert_rowid())
}

/// Attach every artist in `artists` to `song_id` on the caller's
/// transaction, inserting the new ones first. Returns the linked artist ids
/// in input order.
pub fn create_tx(tx: &Transaction<'_>, song_id: i64, artists: &[ArtistRef]) -> Result<Vec<i64>> {
    let mut linked = Vec::with_capacity(artists.len());
    for artist in artists {
        let artist_id = match artist {
            ArtistRef::Existing(id) => *id,
            ArtistRef::New(name) => {
                let id = create(tx, name)?;
                debug!("Created artist #{id} {name:?}");
                id
            }
        };
        song_artists::create(tx, song_id, artist_id)?;
        linked.push(artist_id);
    }
    Ok(linked)
}

/// Autocomplete lookup. Artists whose folded name starts with `name` come
/// first, then those merely containing it; newest first inside each tier.
/// Ids in `restricted_ids` (typically artists already picked) are skipped.
pub fn find_by_name_search(
    conn: &Connection,
    name: &str,
    restricted_ids: &[i64],
) -> Result<Vec<Artist>> {
    let query = unaccent(name.trim());
    let column = "artist.unaccented_name";

    let mut values = Vec::new();
    let prefix = Predicate::All(vec![
        Predicate::starts_with(column, &query),
        Predicate::not_in("artist.id", restricted_ids),
    ])
    .render(&mut values);
    let anywhere = Predicate::All(vec![
        Predicate::contains(column, &query),
        Predicate::not_in("artist.id", restricted_ids),
    ])
    .render(&mut values);

    let select = ARTIST.select_list();
    let sql = format!(
        "SELECT {aliases}, MIN(rank) AS best_rank FROM (
             SELECT {select}, 1 AS rank FROM artist WHERE {prefix}
             UNION ALL
             SELECT {select}, 2 AS rank FROM artist WHERE {anywhere}
         )
         GROUP BY artist_id
         ORDER BY best_rank, artist_insert_date DESC, artist_id DESC
         LIMIT {AUTOCOMPLETE_LIMIT}",
        aliases = ARTIST.alias_list(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let artists = stmt
        .query_map(params_from_iter(values.iter()), from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(artists)
}

/// Load one artist, `None` when the id is unknown so callers can tell a
/// stale selection apart from a store failure.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Artist>> {
    let sql = format!("SELECT {} FROM artist WHERE artist.id = ?1", ARTIST.select_list());
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

/// Exact lookup by display name, ignoring surrounding whitespace.
pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Artist>> {
    let sql = format!("SELECT {} FROM artist WHERE artist.name = ?1", ARTIST.select_list());
    Ok(conn.query_row(&sql, [name.trim()], from_row).optional()?)
}

/// Every artist, oldest first.
pub fn find_all(conn: &Connection) -> Result<Vec<Artist>> {
    let sql = format!(
        "SELECT {} FROM artist ORDER BY artist.insert_date, artist.id",
        ARTIST.select_list()
    );
    let mut stmt = conn.prepare(&sql)?;
    let artists = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(artists)
}

/// Artists linked to one song, in link order.
pub fn find_by_song_id(conn: &Connection, song_id: i64) -> Result<Vec<Artist>> {
    let sql = format!(
        "SELECT {} FROM artist
         INNER JOIN song_artist ON song_artist.artist_id = artist.id
         WHERE song_artist.song_id = ?1
         ORDER BY song_artist.id",
        ARTIST.select_list()
    );
    let mut stmt = conn.prepare(&sql)?;
    let artists = stmt
        .query_map([song_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(artists)
}

/// Rename an artist and refresh its folded name so autocomplete keeps
/// finding it. Renaming onto an existing name is a `DuplicateArtist` error.
pub fn update_name(conn: &Connection, id: i64, name: &str) -> Result<usize> {
    let name = clean_name(name).ok_or(Error::EmptyName("artist"))?;
    let updated = conn
        .execute(
            "UPDATE artist SET name = ?1, unaccented_name = ?2 WHERE id = ?3",
            params![name, unaccent(name), id],
        )
        .map_err(|err| map_unique_constraint(err, name))?;
    Ok(updated)
}

/// Remove an artist and its song links. Songs stay untouched.
pub fn delete(tx: &Transaction<'_>, id: i64) -> Result<usize> {
    song_artists::delete_by_artist_id(tx, id)?;
    Ok(tx.execute("DELETE FROM artist WHERE id = ?1", [id])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::database;

    fn names(artists: Vec<Artist>) -> Vec<String> {
        artists.into_iter().map(|a| a.name).collect()
    }

    #[test]
    fn name_search_ranks_prefix_before_substring() {
        let db = database();
        // Oldest to newest; "Ana" is the newest prefix match.
        db.write(|tx| {
            create(tx, "Joana")?;
            create(tx, "Anabela")?;
            create(tx, "Ana")
        })
        .unwrap();

        let found = db.read(|conn| find_by_name_search(conn, "ana", &[])).unwrap();
        assert_eq!(names(found), vec!["Ana", "Anabela", "Joana"]);
    }

    #[test]
    fn name_search_orders_prefix_tier_newest_first() {
        let db = database();
        db.write(|tx| {
            create(tx, "Ana")?;
            create(tx, "Joana")?;
            create(tx, "Anabela")
        })
        .unwrap();

        // Both prefix matches precede the substring match, but "Anabela" was
        // added after "Ana" so it is suggested first.
        let found = db.read(|conn| find_by_name_search(conn, "ana", &[])).unwrap();
        assert_eq!(names(found), vec!["Anabela", "Ana", "Joana"]);
    }

    #[test]
    fn name_search_skips_restricted_ids_and_folds_accents() {
        let db = database();
        let (ana, _) = db
            .write(|tx| Ok((create(tx, "Ana")?, create(tx, "Ânima")?)))
            .unwrap();

        let found = db.read(|conn| find_by_name_search(conn, "ÁN", &[ana])).unwrap();
        assert_eq!(names(found), vec!["Ânima"]);
    }

    #[test]
    fn name_search_is_capped() {
        let db = database();
        db.write(|tx| {
            for i in 0..10 {
                create(tx, &format!("Band {i}"))?;
            }
            Ok(())
        })
        .unwrap();

        let found = db.read(|conn| find_by_name_search(conn, "band", &[])).unwrap();
        assert_eq!(found.len(), AUTOCOMPLETE_LIMIT);
        assert_eq!(found[0].name, "Band 9");
    }

    #[test]
    fn find_by_name_is_exact() {
        let db = database();
        let id = db.write(|tx| create(tx, "Queen")).unwrap();
        db.write(|tx| create(tx, "Queens of the Stone Age")).unwrap();

        let found = db.read(|conn| find_by_name(conn, " Queen ")).unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(db.read(|conn| find_by_name(conn, "Que")).unwrap().is_none());
    }

    #[test]
    fn duplicate_name_is_reported() {
        let db = database();
        db.write(|tx| create(tx, "Queen")).unwrap();

        let result = db.write(|tx| create(tx, "Queen"));
        assert!(matches!(result, Err(Error::DuplicateArtist(name)) if name == "Queen"));
    }

    #[test]
    fn delete_unlinks_songs() {
        let db = database();
        let song = db
            .write(|tx| crate::db::songs::create(tx, "Imagine", &[ArtistRef::new("John Lennon")]))
            .unwrap();
        let artist = db.read(|conn| find_by_song_id(conn, song)).unwrap()[0].id;

        assert_eq!(db.write(|tx| delete(tx, artist)).unwrap(), 1);
        assert!(db.read(|conn| find_by_song_id(conn, song)).unwrap().is_empty());
        assert!(db.read(|conn| crate::db::songs::find_by_id(conn, song)).unwrap().is_some());
    }
}
