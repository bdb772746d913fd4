use crate::core::error;
use rusqlite::Connection;

pub fn db_connect(db_path: &str) -> Result<Connection, error::GridplanError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::GridplanError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::GridplanError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::GridplanError::RusqliteError)?;
    Ok(conn)
}

/// Reads the recorded schema version from a store's `meta` table (0 when unset).
pub fn schema_version(conn: &Connection) -> Result<u32, error::GridplanError> {
    use rusqlite::OptionalExtension;

    let current: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(error::GridplanError::RusqliteError)?;

    Ok(current
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0))
}

pub fn write_schema_version(conn: &Connection, version: u32) -> Result<(), error::GridplanError> {
    conn.execute(
        "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [version.to_string()],
    )?;
    Ok(())
}

// Stores own their schemas and initialization (see `subsystems.rs`).
