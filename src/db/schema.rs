//! Static table definitions and the statements that create or drop them.
//!
//! Each table lists its columns together with a per-entity alias
//! (`song_name`, `artist_insert_date`, ...). Repositories project through
//! these aliases so joined queries never produce colliding column names, and
//! row mappers read values back by alias.

use rusqlite::Transaction;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Current time in the stored date format, millisecond resolution.
pub const NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

pub struct Column {
    pub name: &'static str,
    pub alias: &'static str,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub schema: &'static str,
    pub indices: &'static [&'static str],
}

macro_rules! column {
    ($name:literal, $alias:literal) => {
        Column {
            name: $name,
            alias: $alias,
        }
    };
}

impl Table {
    /// `table.col AS alias, ...` for use in a SELECT list.
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{}.{} AS {}", self.name, c.name, c.alias))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Just the aliases, for selecting from a subquery that already
    /// projected `select_list`.
    pub fn alias_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.alias)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn trigger_name(&self) -> String {
        format!("{}_update_date", self.name)
    }

    /// AFTER UPDATE trigger stamping `update_date` on the touched row.
    /// Recursive triggers are off by default, so the inner UPDATE does not
    /// re-fire it.
    pub fn trigger_schema(&self) -> String {
        format!(
            "CREATE TRIGGER IF NOT EXISTS {trigger} AFTER UPDATE ON {table} FOR EACH ROW
             BEGIN
                 UPDATE {table} SET update_date = {NOW} WHERE id = NEW.id;
             END",
            trigger = self.trigger_name(),
            table = self.name,
        )
    }
}

pub const SONG: Table = Table {
    name: "song",
    columns: &[
        column!("id", "song_id"),
        column!("name", "song_name"),
        column!("unaccented_name", "song_unaccented_name"),
        column!("insert_date", "song_insert_date"),
        column!("update_date", "song_update_date"),
    ],
    schema: "CREATE TABLE IF NOT EXISTS song (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        unaccented_name TEXT NOT NULL,
        insert_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        update_date TEXT
    )",
    indices: &[],
};

pub const ARTIST: Table = Table {
    name: "artist",
    columns: &[
        column!("id", "artist_id"),
        column!("name", "artist_name"),
        column!("unaccented_name", "artist_unaccented_name"),
        column!("insert_date", "artist_insert_date"),
        column!("update_date", "artist_update_date"),
    ],
    schema: "CREATE TABLE IF NOT EXISTS artist (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        unaccented_name TEXT NOT NULL,
        insert_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        update_date TEXT
    )",
    indices: &[],
};

pub const SONG_ARTIST: Table = Table {
    name: "song_artist",
    columns: &[
        column!("id", "song_artist_id"),
        column!("song_id", "song_artist_song_id"),
        column!("artist_id", "song_artist_artist_id"),
        column!("insert_date", "song_artist_insert_date"),
        column!("update_date", "song_artist_update_date"),
    ],
    schema: "CREATE TABLE IF NOT EXISTS song_artist (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        song_id INTEGER NOT NULL,
        artist_id INTEGER NOT NULL,
        insert_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        update_date TEXT,
        FOREIGN KEY(song_id) REFERENCES song(id),
        FOREIGN KEY(artist_id) REFERENCES artist(id)
    )",
    indices: &[
        "CREATE INDEX IF NOT EXISTS song_artist_song_id_index ON song_artist (song_id)",
        "CREATE INDEX IF NOT EXISTS song_artist_artist_id_index ON song_artist (artist_id)",
    ],
};

pub const SHEET: Table = Table {
    name: "sheet",
    columns: &[
        column!("id", "sheet_id"),
        column!("song_id", "sheet_song_id"),
        column!("title", "sheet_title"),
        column!("content", "sheet_content"),
        column!("insert_date", "sheet_insert_date"),
        column!("update_date", "sheet_update_date"),
    ],
    schema: "CREATE TABLE IF NOT EXISTS sheet (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        song_id INTEGER NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL DEFAULT '',
        insert_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        update_date TEXT,
        FOREIGN KEY(song_id) REFERENCES song(id)
    )",
    indices: &["CREATE INDEX IF NOT EXISTS sheet_song_id_index ON sheet (song_id)"],
};

pub const TAG: Table = Table {
    name: "tag",
    columns: &[
        column!("id", "tag_id"),
        column!("name", "tag_name"),
        column!("color", "tag_color"),
        column!("insert_date", "tag_insert_date"),
        column!("update_date", "tag_update_date"),
    ],
    schema: "CREATE TABLE IF NOT EXISTS tag (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        color TEXT,
        insert_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        update_date TEXT
    )",
    indices: &[],
};

pub const SONG_TAG: Table = Table {
    name: "song_tag",
    columns: &[
        column!("id", "song_tag_id"),
        column!("song_id", "song_tag_song_id"),
        column!("tag_id", "song_tag_tag_id"),
        column!("song_position", "song_tag_song_position"),
        column!("insert_date", "song_tag_insert_date"),
        column!("update_date", "song_tag_update_date"),
    ],
    schema: "CREATE TABLE IF NOT EXISTS song_tag (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        song_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        song_position INTEGER,
        insert_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
        update_date TEXT,
        FOREIGN KEY(song_id) REFERENCES song(id),
        FOREIGN KEY(tag_id) REFERENCES tag(id)
    )",
    indices: &[
        "CREATE INDEX IF NOT EXISTS song_tag_song_id_index ON song_tag (song_id)",
        "CREATE INDEX IF NOT EXISTS song_tag_tag_id_index ON song_tag (tag_id)",
    ],
};

/// Parents before children, the order tables must be created in.
pub const TABLES: &[&Table] = &[&SONG, &ARTIST, &SONG_ARTIST, &SHEET, &TAG, &SONG_TAG];

/// Create every table, index and trigger. Statements run on the caller's
/// transaction, so a failure leaves no partial schema behind once the
/// transaction is dropped.
pub fn create_all(tx: &Transaction<'_>) -> Result<()> {
    for table in TABLES {
        tx.execute_batch(table.schema)
            .map_err(|err| Error::schema(format!("table {}", table.name), err))?;
        for index in table.indices {
            tx.execute_batch(index)
                .map_err(|err| Error::schema(format!("index on {}", table.name), err))?;
        }
    }

    for table in TABLES {
        tx.execute_batch(&table.trigger_schema())
            .map_err(|err| Error::schema(format!("trigger {}", table.trigger_name()), err))?;
    }

    debug!("Created {} tables with update triggers", TABLES.len());
    Ok(())
}

/// Drop every trigger and table, children first so foreign keys never point
/// at a dropped parent.
pub fn drop_all(tx: &Transaction<'_>) -> Result<()> {
    for table in TABLES {
        let trigger = table.trigger_name();
        tx.execute_batch(&format!("DROP TRIGGER IF EXISTS {trigger}"))
            .map_err(|err| Error::schema(format!("trigger {trigger}"), err))?;
    }

    for table in TABLES.iter().rev() {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", table.name))
            .map_err(|err| Error::schema(format!("table {}", table.name), err))?;
    }

    info!("Dropped all songbook tables");
    Ok(())
}
