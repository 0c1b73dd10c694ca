//! SQLite connection management for the metadata store (C6): pragmas,
//! schema creation, and forward-only migrations.

use archivist_core::error::StateError;
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Current schema version. Bump when a migration step is added.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub fn open_connection(db_path: &Path, busy_timeout_ms: u32) -> Result<Connection, StateError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(StateError::Io)?;
    }
    let conn = Connection::open(db_path).map_err(StateError::sqlite)?;
    apply_pragmas(&conn, busy_timeout_ms)?;
    create_tables(&conn)?;
    info!(?db_path, "metadata store opened");
    Ok(conn)
}

fn apply_pragmas(conn: &Connection, busy_timeout_ms: u32) -> Result<(), StateError> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {busy_timeout_ms};"
    ))
    .map_err(StateError::sqlite)
}

fn create_tables(conn: &Connection) -> Result<(), StateError> {
    conn.execute_batch(SCHEMA_SQL).map_err(StateError::sqlite)?;
    migrate(conn)
}

/// Forward-only migration runner: each version bump gets one entry in
/// `migrations`, applied in order and recorded so a restart never re-runs a
/// completed step.
fn migrate(conn: &Connection) -> Result<(), StateError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(StateError::sqlite)?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(StateError::sqlite)?;

    type MigrationFn = fn(&Connection) -> Result<(), StateError>;
    let migrations: &[MigrationFn] = &[
        // V1: baseline, tables already created by SCHEMA_SQL above.
        |_conn| Ok(()),
    ];

    for version in (current + 1)..=CURRENT_SCHEMA_VERSION {
        let idx = (version - 1) as usize;
        if idx < migrations.len() {
            migrations[idx](conn)?;
        }
        conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [version])
            .map_err(StateError::sqlite)?;
    }
    Ok(())
}

/// Verify the on-disk schema matches what this binary expects; a mismatch is
/// `SchemaMigrationRequired` rather than a silent downgrade.
pub fn check_schema_version(conn: &Connection) -> Result<(), StateError> {
    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(StateError::sqlite)?;
    if current > CURRENT_SCHEMA_VERSION {
        return Err(StateError::SchemaMigrationRequired {
            current,
            required: CURRENT_SCHEMA_VERSION,
        });
    }
    Ok(())
}

pub fn check_sqlite_health(conn: &Connection) -> Result<(bool, Option<String>), StateError> {
    let result: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(StateError::sqlite)?;
    if result == "ok" {
        Ok((true, None))
    } else {
        Ok((false, Some(result)))
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    file_id TEXT PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    language TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    size INTEGER NOT NULL,
    mtime INTEGER,
    partition_id TEXT NOT NULL,
    authority_score REAL NOT NULL,
    embedding_text TEXT NOT NULL,
    embedding_status TEXT NOT NULL DEFAULT 'pending',
    embedding_model_id TEXT,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_files_embedding_status ON files(embedding_status);
CREATE INDEX IF NOT EXISTS idx_files_partition ON files(partition_id);

CREATE TABLE IF NOT EXISTS symbols (
    symbol_id TEXT PRIMARY KEY,
    file_id TEXT NOT NULL REFERENCES files(file_id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    is_exported INTEGER NOT NULL,
    parent_symbol_id TEXT,
    signature TEXT
);

CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id);
CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);

CREATE TABLE IF NOT EXISTS import_edges (
    file_id TEXT NOT NULL REFERENCES files(file_id) ON DELETE CASCADE,
    module_path TEXT NOT NULL,
    imported_name TEXT,
    is_default INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_import_edges_file ON import_edges(file_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_connection_enables_wal_and_foreign_keys() {
        let dir = tempdir().unwrap();
        let conn = open_connection(&dir.path().join("meta.db"), 5000).unwrap();
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
        assert_eq!(mode, "wal");
        let fk: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)).unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn create_tables_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta.db");
        open_connection(&path, 5000).unwrap();
        open_connection(&path, 5000).unwrap();
    }

    #[test]
    fn migration_tracking_records_current_version() {
        let dir = tempdir().unwrap();
        let conn = open_connection(&dir.path().join("meta.db"), 5000).unwrap();
        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
        check_schema_version(&conn).unwrap();
    }
}
