use std::path::PathBuf;

use directories::BaseDirs;

use crate::error::{Error, Result};

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".songbook";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "songbook.sqlite";
/// Environment variable that overrides the default database location.
pub const DB_PATH_ENV: &str = "SONGBOOK_DB";

/// Pick the database file: an explicit path wins, then `SONGBOOK_DB`, then
/// the per-user default under the home directory.
pub fn resolve_db_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(DB_PATH_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    default_db_path()
}

/// Resolve the absolute path to the SQLite database inside the user's home.
pub fn default_db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not locate home directory",
        ))
    })?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = resolve_db_path(Some(PathBuf::from("/tmp/x.sqlite"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x.sqlite"));
    }
}
