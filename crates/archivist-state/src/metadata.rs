//! C6 metadata store: file records, symbols, and import edges, keyed by
//! `file_id` with cascade delete handled by SQLite foreign keys.

use archivist_core::error::StateError;
use archivist_core::types::{EmbeddingStatus, FileRecord, ImportEdge, SymbolKind, SymbolRecord};
use rusqlite::{Connection, OptionalExtension, params};

/// Upsert a file record, replacing any prior row for the same `file_id`.
pub fn upsert_file(conn: &Connection, file: &FileRecord) -> Result<(), StateError> {
    conn.execute(
        "INSERT INTO files
            (file_id, path, language, content_hash, size, mtime, partition_id,
             authority_score, embedding_text, embedding_status, embedding_model_id, indexed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(file_id) DO UPDATE SET
            path = excluded.path,
            language = excluded.language,
            content_hash = excluded.content_hash,
            size = excluded.size,
            mtime = excluded.mtime,
            partition_id = excluded.partition_id,
            authority_score = excluded.authority_score,
            embedding_text = excluded.embedding_text,
            embedding_status = excluded.embedding_status,
            embedding_model_id = excluded.embedding_model_id,
            indexed_at = excluded.indexed_at",
        params![
            file.file_id,
            file.path,
            file.language,
            file.content_hash,
            file.size,
            file.mtime,
            file.partition_id,
            file.authority_score,
            file.embedding_text,
            file.embedding_status.as_str(),
            file.embedding_model_id,
            file.indexed_at,
        ],
    )
    .map_err(StateError::sqlite)?;
    Ok(())
}

/// Replace all symbols for `file_id` with the given set (symbols have no
/// independent lifetime outside their file).
pub fn replace_symbols(
    conn: &Connection,
    file_id: &str,
    symbols: &[SymbolRecord],
) -> Result<(), StateError> {
    conn.execute("DELETE FROM symbols WHERE file_id = ?1", params![file_id])
        .map_err(StateError::sqlite)?;
    for sym in symbols {
        conn.execute(
            "INSERT INTO symbols
                (symbol_id, file_id, name, kind, line, column, is_exported, parent_symbol_id, signature)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                sym.symbol_id,
                sym.file_id,
                sym.name,
                sym.kind.as_str(),
                sym.line,
                sym.column,
                sym.is_exported,
                sym.parent_symbol_id,
                sym.signature,
            ],
        )
        .map_err(StateError::sqlite)?;
    }
    Ok(())
}

/// Replace all import edges for `file_id`.
pub fn replace_import_edges(
    conn: &Connection,
    file_id: &str,
    edges: &[ImportEdge],
) -> Result<(), StateError> {
    conn.execute("DELETE FROM import_edges WHERE file_id = ?1", params![file_id])
        .map_err(StateError::sqlite)?;
    for edge in edges {
        conn.execute(
            "INSERT INTO import_edges (file_id, module_path, imported_name, is_default)
             VALUES (?1, ?2, ?3, ?4)",
            params![edge.file_id, edge.module_path, edge.imported_name, edge.is_default],
        )
        .map_err(StateError::sqlite)?;
    }
    Ok(())
}

/// Cascade-delete a file and everything referencing it.
pub fn delete_file(conn: &Connection, file_id: &str) -> Result<(), StateError> {
    conn.execute("DELETE FROM files WHERE file_id = ?1", params![file_id])
        .map_err(StateError::sqlite)?;
    Ok(())
}

/// Truncate all metadata tables.
pub fn truncate_all(conn: &Connection) -> Result<(), StateError> {
    conn.execute_batch(
        "DELETE FROM import_edges; DELETE FROM symbols; DELETE FROM files;",
    )
    .map_err(StateError::sqlite)?;
    Ok(())
}

pub fn find_file_by_path(conn: &Connection, path: &str) -> Result<Option<FileRecord>, StateError> {
    conn.query_row(
        "SELECT file_id, path, language, content_hash, size, mtime, partition_id,
                authority_score, embedding_text, embedding_status, embedding_model_id, indexed_at
         FROM files WHERE path = ?1",
        params![path],
        row_to_file_record,
    )
    .optional()
    .map_err(StateError::sqlite)
}

pub fn find_file_by_id(conn: &Connection, file_id: &str) -> Result<Option<FileRecord>, StateError> {
    conn.query_row(
        "SELECT file_id, path, language, content_hash, size, mtime, partition_id,
                authority_score, embedding_text, embedding_status, embedding_model_id, indexed_at
         FROM files WHERE file_id = ?1",
        params![file_id],
        row_to_file_record,
    )
    .optional()
    .map_err(StateError::sqlite)
}

/// Every path currently tracked, used by the walker to detect disappeared
/// files.
pub fn all_paths(conn: &Connection) -> Result<Vec<(String, String)>, StateError> {
    let mut stmt = conn
        .prepare("SELECT file_id, path FROM files")
        .map_err(StateError::sqlite)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(StateError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StateError::sqlite)
}

/// Repo-relative path → last-seen content hash, used by the walker to
/// classify candidates as `fresh`/`stale`/`unchanged`.
pub fn all_content_hashes(conn: &Connection) -> Result<std::collections::HashMap<String, String>, StateError> {
    let mut stmt = conn
        .prepare("SELECT path, content_hash FROM files")
        .map_err(StateError::sqlite)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(StateError::sqlite)?;
    rows.collect::<Result<std::collections::HashMap<_, _>, _>>()
        .map_err(StateError::sqlite)
}

/// Bulk iteration over `embedding_status = pending` rows, batched for the
/// embedder.
pub fn pending_embedding_batch(
    conn: &Connection,
    batch_size: usize,
) -> Result<Vec<FileRecord>, StateError> {
    let mut stmt = conn
        .prepare(
            "SELECT file_id, path, language, content_hash, size, mtime, partition_id,
                    authority_score, embedding_text, embedding_status, embedding_model_id, indexed_at
             FROM files WHERE embedding_status = 'pending'
             ORDER BY file_id
             LIMIT ?1",
        )
        .map_err(StateError::sqlite)?;
    let rows = stmt
        .query_map(params![batch_size as i64], row_to_file_record)
        .map_err(StateError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StateError::sqlite)
}

pub fn set_embedding_status(
    conn: &Connection,
    file_id: &str,
    status: EmbeddingStatus,
    model_id: Option<&str>,
) -> Result<(), StateError> {
    conn.execute(
        "UPDATE files SET embedding_status = ?1, embedding_model_id = ?2 WHERE file_id = ?3",
        params![status.as_str(), model_id, file_id],
    )
    .map_err(StateError::sqlite)?;
    Ok(())
}

pub fn files_in_partition(conn: &Connection, partition_id: &str) -> Result<Vec<FileRecord>, StateError> {
    let mut stmt = conn
        .prepare(
            "SELECT file_id, path, language, content_hash, size, mtime, partition_id,
                    authority_score, embedding_text, embedding_status, embedding_model_id, indexed_at
             FROM files WHERE partition_id = ?1",
        )
        .map_err(StateError::sqlite)?;
    let rows = stmt
        .query_map(params![partition_id], row_to_file_record)
        .map_err(StateError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StateError::sqlite)
}

pub fn file_count(conn: &Connection) -> Result<usize, StateError> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
        .map_err(StateError::sqlite)?;
    Ok(count as usize)
}

pub fn status_counts(conn: &Connection) -> Result<Vec<(String, usize)>, StateError> {
    let mut stmt = conn
        .prepare("SELECT embedding_status, COUNT(*) FROM files GROUP BY embedding_status")
        .map_err(StateError::sqlite)?;
    let rows = stmt
        .query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok((row.get::<_, String>(0)?, count as usize))
        })
        .map_err(StateError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StateError::sqlite)
}

fn row_to_file_record(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    let status_str: String = row.get(9)?;
    Ok(FileRecord {
        file_id: row.get(0)?,
        path: row.get(1)?,
        language: row.get(2)?,
        content_hash: row.get(3)?,
        size: row.get::<_, i64>(4)? as u64,
        mtime: row.get(5)?,
        partition_id: row.get(6)?,
        authority_score: row.get(7)?,
        embedding_text: row.get(8)?,
        embedding_status: EmbeddingStatus::parse(&status_str).unwrap_or_default(),
        embedding_model_id: row.get(10)?,
        indexed_at: row.get(11)?,
    })
}

#[allow(dead_code)]
fn row_to_symbol_record(row: &rusqlite::Row) -> rusqlite::Result<SymbolRecord> {
    let kind_str: String = row.get(3)?;
    Ok(SymbolRecord {
        symbol_id: row.get(0)?,
        file_id: row.get(1)?,
        name: row.get(2)?,
        kind: SymbolKind::parse_kind(&kind_str).unwrap_or(SymbolKind::Variable),
        line: row.get(4)?,
        column: row.get(5)?,
        is_exported: row.get(6)?,
        parent_symbol_id: row.get(7)?,
        signature: row.get(8)?,
    })
}

pub fn symbols_for_file(conn: &Connection, file_id: &str) -> Result<Vec<SymbolRecord>, StateError> {
    let mut stmt = conn
        .prepare(
            "SELECT symbol_id, file_id, name, kind, line, column, is_exported, parent_symbol_id, signature
             FROM symbols WHERE file_id = ?1 ORDER BY line",
        )
        .map_err(StateError::sqlite)?;
    let rows = stmt
        .query_map(params![file_id], row_to_symbol_record)
        .map_err(StateError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StateError::sqlite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::tempdir;

    fn sample_file(file_id: &str, path: &str) -> FileRecord {
        FileRecord {
            file_id: file_id.to_string(),
            path: path.to_string(),
            language: "rust".to_string(),
            content_hash: "abc".to_string(),
            size: 100,
            mtime: Some(1_700_000_000),
            partition_id: "project".to_string(),
            authority_score: 0.35,
            embedding_text: "fn foo".to_string(),
            embedding_status: EmbeddingStatus::Pending,
            embedding_model_id: None,
            indexed_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn upsert_then_find_by_path_roundtrips() {
        let dir = tempdir().unwrap();
        let conn = db::open_connection(&dir.path().join("m.db"), 5000).unwrap();
        upsert_file(&conn, &sample_file("f1", "src/lib.rs")).unwrap();

        let found = find_file_by_path(&conn, "src/lib.rs").unwrap().unwrap();
        assert_eq!(found.file_id, "f1");
        assert_eq!(found.embedding_status, EmbeddingStatus::Pending);
    }

    #[test]
    fn upsert_replaces_existing_row_for_same_file_id() {
        let dir = tempdir().unwrap();
        let conn = db::open_connection(&dir.path().join("m.db"), 5000).unwrap();
        upsert_file(&conn, &sample_file("f1", "src/lib.rs")).unwrap();
        let mut updated = sample_file("f1", "src/lib.rs");
        updated.content_hash = "xyz".to_string();
        upsert_file(&conn, &updated).unwrap();

        assert_eq!(file_count(&conn).unwrap(), 1);
        let found = find_file_by_id(&conn, "f1").unwrap().unwrap();
        assert_eq!(found.content_hash, "xyz");
    }

    #[test]
    fn delete_file_cascades_to_symbols_and_imports() {
        let dir = tempdir().unwrap();
        let conn = db::open_connection(&dir.path().join("m.db"), 5000).unwrap();
        upsert_file(&conn, &sample_file("f1", "src/lib.rs")).unwrap();
        replace_symbols(
            &conn,
            "f1",
            &[SymbolRecord {
                symbol_id: "s1".to_string(),
                file_id: "f1".to_string(),
                name: "foo".to_string(),
                kind: SymbolKind::Function,
                line: 1,
                column: 0,
                is_exported: true,
                parent_symbol_id: None,
                signature: None,
            }],
        )
        .unwrap();

        delete_file(&conn, "f1").unwrap();
        assert_eq!(file_count(&conn).unwrap(), 0);
        assert!(symbols_for_file(&conn, "f1").unwrap().is_empty());
    }

    #[test]
    fn pending_embedding_batch_only_returns_pending_rows() {
        let dir = tempdir().unwrap();
        let conn = db::open_connection(&dir.path().join("m.db"), 5000).unwrap();
        upsert_file(&conn, &sample_file("f1", "a.rs")).unwrap();
        let mut embedded = sample_file("f2", "b.rs");
        embedded.embedding_status = EmbeddingStatus::Embedded;
        upsert_file(&conn, &embedded).unwrap();

        let pending = pending_embedding_batch(&conn, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].file_id, "f1");
    }

    #[test]
    fn all_content_hashes_maps_path_to_hash() {
        let dir = tempdir().unwrap();
        let conn = db::open_connection(&dir.path().join("m.db"), 5000).unwrap();
        upsert_file(&conn, &sample_file("f1", "a.rs")).unwrap();

        let hashes = all_content_hashes(&conn).unwrap();
        assert_eq!(hashes.get("a.rs"), Some(&"abc".to_string()));
    }

    #[test]
    fn truncate_all_clears_every_table() {
        let dir = tempdir().unwrap();
        let conn = db::open_connection(&dir.path().join("m.db"), 5000).unwrap();
        upsert_file(&conn, &sample_file("f1", "a.rs")).unwrap();
        truncate_all(&conn).unwrap();
        assert_eq!(file_count(&conn).unwrap(), 0);
    }
}
