//! C9 indexer orchestrator: `index_repository`/`index_files` entry points.
//! Sequences C1 → C2/C3/C4 → C6 → C8 per file, then batches C5 → C7, and
//! finally cascade-deletes files that disappeared from the walk.

use crate::{embed_text, languages, parser, partition, scanner};
use archivist_core::constants::DEFAULT_EMBED_BATCH_SIZE;
use archivist_core::error::IndexError;
use archivist_core::ids;
use archivist_core::time::now_iso8601;
use archivist_core::types::{
    ChangeStatus, EmbeddingStatus, FileRecord, ImportEdge, IndexFileError, IndexOptions, IndexStats,
    SymbolRecord,
};
use archivist_state::embedding::EmbeddingProvider;
use archivist_state::lexical::{LexicalDoc, LexicalStore};
use archivist_state::metadata;
use archivist_state::vector_store::{VectorRecord, VectorStore};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Everything the orchestrator needs to drive a run: the three stores and
/// the embedder, plus the indexing knobs that would otherwise come from
/// `Config` (kept as plain fields so this crate doesn't depend on the CLI's
/// config-loading concerns).
pub struct IndexerContext<'a> {
    pub conn: &'a Connection,
    pub lexical: &'a LexicalStore,
    pub vector: &'a VectorStore,
    pub embedder: &'a mut dyn EmbeddingProvider,
    pub max_file_size: u64,
    pub max_workers: usize,
    pub languages: Vec<String>,
    pub embed_batch_size: usize,
}

struct PreparedFile {
    relative_path: String,
    file_record: FileRecord,
    symbols: Vec<SymbolRecord>,
    imports: Vec<ImportEdge>,
    symbol_names: Vec<String>,
}

/// Entry point: walk `root`, index every `fresh`/`stale` file found, cascade
/// -delete files that disappeared, and batch-embed everything left pending.
pub fn index_repository(ctx: &mut IndexerContext, root: &Path, options: &IndexOptions) -> IndexStats {
    let start = Instant::now();
    let mut stats = IndexStats::default();

    if options.force_clean && let Err(e) = force_clean(ctx) {
        stats.errors.push(IndexFileError {
            file: root.display().to_string(),
            error: format!("force_clean failed: {e}"),
        });
    }

    let scanned = scanner::scan_directory_filtered(root, ctx.max_file_size, &ctx.languages);
    let filtered = apply_include_exclude(scanned, &options.include, &options.exclude);

    let known_hashes = match metadata::all_content_hashes(ctx.conn) {
        Ok(h) => h,
        Err(e) => {
            stats.errors.push(IndexFileError {
                file: root.display().to_string(),
                error: format!("failed to read prior fingerprints: {e}"),
            });
            HashMap::new()
        }
    };

    let current_paths: std::collections::HashSet<String> =
        filtered.iter().map(|f| f.relative_path.clone()).collect();
    let classified = scanner::classify_files(root, filtered, &known_hashes);
    let summary = scanner::summarize(&classified);
    stats.total = summary.total;
    stats.fresh = summary.fresh;
    stats.stale = summary.stale;
    stats.unchanged = summary.unchanged;
    stats.skipped_files = classified
        .iter()
        .filter(|c| c.status == ChangeStatus::Unchanged)
        .map(|c| c.file.relative_path.clone())
        .collect();

    process_changed_files(ctx, root, &classified, &mut stats);

    if let Ok(tracked) = metadata::all_paths(ctx.conn) {
        for (file_id, path) in tracked {
            if !current_paths.contains(&path) {
                delete_file_everywhere(ctx, &file_id);
                stats.deleted += 1;
            }
        }
    }

    run_embedding_batches(ctx, &mut stats);

    stats.elapsed_ms = start.elapsed().as_millis() as u64;
    stats.finalize();
    info!(
        total = stats.total,
        indexed = stats.indexed,
        embedded = stats.embedded,
        deleted = stats.deleted,
        errors = stats.errors.len(),
        "index_repository finished"
    );
    stats
}

/// Entry point: (re)index exactly the given repo-relative `paths`, skipping
/// the full-tree walk and disappeared-file deletion pass.
pub fn index_files(ctx: &mut IndexerContext, root: &Path, paths: &[String], options: &IndexOptions) -> IndexStats {
    let start = Instant::now();
    let mut stats = IndexStats::default();

    if options.force_clean && let Err(e) = force_clean(ctx) {
        stats.errors.push(IndexFileError {
            file: root.display().to_string(),
            error: format!("force_clean failed: {e}"),
        });
    }

    let scanned: Vec<scanner::ScannedFile> = paths
        .iter()
        .filter_map(|relative| {
            let absolute = root.join(relative);
            let language = scanner::detect_language(&absolute)?;
            Some(scanner::ScannedFile {
                path: absolute,
                relative_path: relative.clone(),
                language: language.to_string(),
            })
        })
        .collect();
    let filtered = apply_include_exclude(scanned, &options.include, &options.exclude);

    let known_hashes = metadata::all_content_hashes(ctx.conn).unwrap_or_default();
    let classified = scanner::classify_files(root, filtered, &known_hashes);
    let summary = scanner::summarize(&classified);
    stats.total = summary.total;
    stats.fresh = summary.fresh;
    stats.stale = summary.stale;
    stats.unchanged = summary.unchanged;
    stats.skipped_files = classified
        .iter()
        .filter(|c| c.status == ChangeStatus::Unchanged)
        .map(|c| c.file.relative_path.clone())
        .collect();

    process_changed_files(ctx, root, &classified, &mut stats);
    run_embedding_batches(ctx, &mut stats);

    stats.elapsed_ms = start.elapsed().as_millis() as u64;
    stats.finalize();
    stats
}

fn force_clean(ctx: &mut IndexerContext) -> Result<(), IndexError> {
    if let Ok(tracked) = metadata::all_paths(ctx.conn) {
        for (file_id, _path) in tracked {
            let _ = ctx.lexical.delete(&file_id);
            let _ = ctx.vector.delete(&file_id);
        }
    }
    metadata::truncate_all(ctx.conn)?;
    Ok(())
}

fn apply_include_exclude(
    files: Vec<scanner::ScannedFile>,
    include: &[String],
    exclude: &[String],
) -> Vec<scanner::ScannedFile> {
    let include_set = build_globset(include);
    let exclude_set = build_globset(exclude);
    files
        .into_iter()
        .filter(|f| {
            if let Some(set) = &include_set
                && !set.is_match(&f.relative_path)
            {
                return false;
            }
            if let Some(set) = &exclude_set
                && set.is_match(&f.relative_path)
            {
                return false;
            }
            true
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        } else {
            warn!(pattern, "ignoring invalid glob pattern");
        }
    }
    builder.build().ok()
}

/// Extract/classify every `fresh`/`stale` file in parallel (bounded by
/// `max_workers`), then write metadata + lexical docs sequentially so a
/// later stage never observes a half-updated file.
fn process_changed_files(
    ctx: &mut IndexerContext,
    root: &Path,
    classified: &[scanner::ClassifiedFile],
    stats: &mut IndexStats,
) {
    let changed: Vec<&scanner::ClassifiedFile> = classified
        .iter()
        .filter(|c| c.status != ChangeStatus::Unchanged)
        .collect();
    if changed.is_empty() {
        return;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.max_workers.max(1))
        .build();
    let prepared: Vec<Result<PreparedFile, IndexFileError>> = match pool {
        Ok(pool) => pool.install(|| changed.par_iter().map(|c| prepare_file(root, c)).collect()),
        Err(_) => changed.iter().map(|c| prepare_file(root, c)).collect(),
    };

    for result in prepared {
        match result {
            Ok(prepared) => {
                *stats.per_language.entry(prepared.file_record.language.clone()).or_insert(0) += 1;
                if let Err(e) = write_prepared_file(ctx, &prepared) {
                    stats.errors.push(IndexFileError {
                        file: prepared.relative_path,
                        error: e.to_string(),
                    });
                } else {
                    stats.indexed += 1;
                    stats.indexed_files.push(prepared.relative_path);
                }
            }
            Err(e) => stats.errors.push(e),
        }
    }
}

fn prepare_file(root: &Path, classified: &scanner::ClassifiedFile) -> Result<PreparedFile, IndexFileError> {
    let relative_path = classified.file.relative_path.clone();
    let absolute = root.join(&relative_path);
    let bytes = std::fs::read(&absolute).map_err(|e| IndexFileError {
        file: relative_path.clone(),
        error: format!("read failed: {e}"),
    })?;
    let source = String::from_utf8_lossy(&bytes).to_string();
    let language = classified.file.language.clone();
    let file_id = ids::file_id(&relative_path);

    let (extracted_symbols, extracted_imports) = if archivist_core::languages::is_indexable_source_language(&language) {
        match parser::parse_file(&source, &language) {
            Ok(tree) => (
                languages::extract_symbols(&tree, &source, &language),
                languages::extract_imports(&tree, &source, &language),
            ),
            Err(e) => {
                warn!(file = relative_path, error = %e, "parse failed, degrading to raw content only");
                (Vec::new(), Vec::new())
            }
        }
    } else {
        (Vec::new(), Vec::new())
    };

    let mut symbol_ids_by_name: HashMap<String, String> = HashMap::new();
    let mut symbols: Vec<SymbolRecord> = Vec::with_capacity(extracted_symbols.len());
    for sym in &extracted_symbols {
        let symbol_id = ids::symbol_id(&file_id, sym.kind.as_str(), sym.line, &sym.name);
        symbol_ids_by_name.entry(sym.name.clone()).or_insert_with(|| symbol_id.clone());
        symbols.push(SymbolRecord {
            symbol_id,
            file_id: file_id.clone(),
            name: sym.name.clone(),
            kind: sym.kind,
            line: sym.line,
            column: sym.column,
            is_exported: sym.is_exported,
            parent_symbol_id: None,
            signature: sym.signature.clone(),
        });
    }
    for (symbol, extracted) in symbols.iter_mut().zip(extracted_symbols.iter()) {
        if let Some(parent_name) = &extracted.parent_name {
            symbol.parent_symbol_id = symbol_ids_by_name.get(parent_name).cloned();
        }
    }

    let imports: Vec<ImportEdge> = extracted_imports
        .into_iter()
        .map(|imp| ImportEdge {
            file_id: file_id.clone(),
            module_path: imp.module_path,
            imported_name: imp.imported_name,
            is_default: imp.is_default,
        })
        .collect();

    let embedding_text = embed_text::build_embedding_text(&relative_path, &language, &extracted_symbols, &source);
    let classification = partition::classify_path(&relative_path);
    let symbol_names: Vec<String> = extracted_symbols.iter().map(|s| s.name.clone()).collect();

    let file_record = FileRecord {
        file_id,
        path: relative_path.clone(),
        language,
        content_hash: classified.content_hash.clone(),
        size: classified.size,
        mtime: None,
        partition_id: classification.partition_id,
        authority_score: classification.authority_score,
        embedding_text,
        embedding_status: EmbeddingStatus::Pending,
        embedding_model_id: None,
        indexed_at: now_iso8601(),
    };

    Ok(PreparedFile {
        relative_path,
        file_record,
        symbols,
        imports,
        symbol_names,
    })
}

fn write_prepared_file(ctx: &IndexerContext, prepared: &PreparedFile) -> Result<(), IndexError> {
    metadata::upsert_file(ctx.conn, &prepared.file_record)?;
    metadata::replace_symbols(ctx.conn, &prepared.file_record.file_id, &prepared.symbols)?;
    metadata::replace_import_edges(ctx.conn, &prepared.file_record.file_id, &prepared.imports)?;
    ctx.lexical.upsert(&LexicalDoc {
        file_id: prepared.file_record.file_id.clone(),
        path: prepared.file_record.path.clone(),
        symbol_names: prepared.symbol_names.clone(),
        language: prepared.file_record.language.clone(),
        partition_id: prepared.file_record.partition_id.clone(),
        authority_score: prepared.file_record.authority_score,
    })?;
    Ok(())
}

fn delete_file_everywhere(ctx: &IndexerContext, file_id: &str) {
    if let Err(e) = metadata::delete_file(ctx.conn, file_id) {
        warn!(file_id, error = %e, "failed to delete file metadata");
    }
    if let Err(e) = ctx.lexical.delete(file_id) {
        warn!(file_id, error = %e, "failed to delete lexical doc");
    }
    if let Err(e) = ctx.vector.delete(file_id) {
        warn!(file_id, error = %e, "failed to delete vector record");
    }
}

/// Batch every `pending` file through the embedder, writing vectors and
/// transitioning status. A batch that fails outright marks its files
/// `failed` and the run continues.
fn run_embedding_batches(ctx: &mut IndexerContext, stats: &mut IndexStats) {
    let batch_size = if ctx.embed_batch_size == 0 {
        DEFAULT_EMBED_BATCH_SIZE
    } else {
        ctx.embed_batch_size
    };

    loop {
        let batch = match metadata::pending_embedding_batch(ctx.conn, batch_size) {
            Ok(b) if !b.is_empty() => b,
            Ok(_) => break,
            Err(e) => {
                stats.errors.push(IndexFileError {
                    file: "<embedding batch>".to_string(),
                    error: e.to_string(),
                });
                break;
            }
        };

        info!(count = batch.len(), "dispatching embedding batch");
        let texts: Vec<String> = batch.iter().map(|f| f.embedding_text.clone()).collect();
        match ctx.embedder.embed_batch(&texts) {
            Ok(vectors) => {
                let model_id = ctx.embedder.model_id().to_string();
                let records: Vec<VectorRecord> = batch
                    .iter()
                    .zip(vectors.iter())
                    .map(|(file, vector)| VectorRecord {
                        file_id: file.file_id.clone(),
                        path: file.path.clone(),
                        language: file.language.clone(),
                        partition_id: file.partition_id.clone(),
                        authority_score: file.authority_score,
                        vector: vector.clone(),
                    })
                    .collect();
                if let Err(e) = ctx.vector.upsert(&records) {
                    warn!(error = %e, "vector upsert failed for batch, marking files failed");
                    for file in &batch {
                        let _ = metadata::set_embedding_status(ctx.conn, &file.file_id, EmbeddingStatus::Failed, None);
                        stats.errors.push(IndexFileError {
                            file: file.path.clone(),
                            error: e.to_string(),
                        });
                    }
                    continue;
                }
                for file in &batch {
                    if let Err(e) =
                        metadata::set_embedding_status(ctx.conn, &file.file_id, EmbeddingStatus::Embedded, Some(&model_id))
                    {
                        stats.errors.push(IndexFileError {
                            file: file.path.clone(),
                            error: e.to_string(),
                        });
                        continue;
                    }
                    stats.embedded += 1;
                }
            }
            Err(e) => {
                warn!(error = %e, "embedding batch failed, marking files failed");
                for file in &batch {
                    let _ = metadata::set_embedding_status(ctx.conn, &file.file_id, EmbeddingStatus::Failed, None);
                }
                stats.errors.push(IndexFileError {
                    file: "<embedding batch>".to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivist_state::db;
    use archivist_state::embedding::EmbeddingProvider as _;
    use tempfile::tempdir;

    struct StubEmbedder {
        dims: usize,
    }

    impl EmbeddingProvider for StubEmbedder {
        fn model_id(&self) -> &str {
            "stub-model"
        }
        fn dimensions(&self) -> usize {
            self.dims
        }
        fn embed_batch(&mut self, inputs: &[String]) -> Result<Vec<Vec<f32>>, archivist_core::error::StateError> {
            Ok(inputs.iter().map(|_| vec![0.1; self.dims]).collect())
        }
    }

    fn write_project(dir: &std::path::Path) {
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::write(dir.join("src/lib.rs"), "pub fn greet() {}\n").unwrap();
        std::fs::write(dir.join("src/helper.rs"), "fn helper() {}\n").unwrap();
    }

    #[test]
    fn index_repository_writes_metadata_lexical_and_vectors() {
        let project = tempdir().unwrap();
        write_project(project.path());
        let state_dir = tempdir().unwrap();

        let conn = db::open_connection(&state_dir.path().join("meta.db"), 5000).unwrap();
        let lexical = LexicalStore::open(&state_dir.path().join("lexical")).unwrap();
        let vector = VectorStore::open(&state_dir.path().join("vectors"));
        let mut embedder = StubEmbedder { dims: 4 };

        let mut ctx = IndexerContext {
            conn: &conn,
            lexical: &lexical,
            vector: &vector,
            embedder: &mut embedder,
            max_file_size: 1_048_576,
            max_workers: 2,
            languages: vec!["rust".to_string()],
            embed_batch_size: 10,
        };

        let stats = index_repository(&mut ctx, project.path(), &IndexOptions::default());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.indexed, 2);
        assert_eq!(stats.embedded, 2);
        assert!(stats.errors.is_empty());
        assert_eq!(metadata::file_count(&conn).unwrap(), 2);
        assert_eq!(lexical.count().unwrap(), 2);
        assert_eq!(vector.count().unwrap(), 2);
    }

    #[test]
    fn second_run_with_no_changes_reports_all_unchanged() {
        let project = tempdir().unwrap();
        write_project(project.path());
        let state_dir = tempdir().unwrap();

        let conn = db::open_connection(&state_dir.path().join("meta.db"), 5000).unwrap();
        let lexical = LexicalStore::open(&state_dir.path().join("lexical")).unwrap();
        let vector = VectorStore::open(&state_dir.path().join("vectors"));
        let mut embedder = StubEmbedder { dims: 4 };
        let mut ctx = IndexerContext {
            conn: &conn,
            lexical: &lexical,
            vector: &vector,
            embedder: &mut embedder,
            max_file_size: 1_048_576,
            max_workers: 2,
            languages: vec!["rust".to_string()],
            embed_batch_size: 10,
        };

        index_repository(&mut ctx, project.path(), &IndexOptions::default());
        let second = index_repository(&mut ctx, project.path(), &IndexOptions::default());
        assert_eq!(second.unchanged, 2);
        assert_eq!(second.indexed, 0);
    }

    #[test]
    fn deleted_files_cascade_out_of_every_store() {
        let project = tempdir().unwrap();
        write_project(project.path());
        let state_dir = tempdir().unwrap();

        let conn = db::open_connection(&state_dir.path().join("meta.db"), 5000).unwrap();
        let lexical = LexicalStore::open(&state_dir.path().join("lexical")).unwrap();
        let vector = VectorStore::open(&state_dir.path().join("vectors"));
        let mut embedder = StubEmbedder { dims: 4 };
        let mut ctx = IndexerContext {
            conn: &conn,
            lexical: &lexical,
            vector: &vector,
            embedder: &mut embedder,
            max_file_size: 1_048_576,
            max_workers: 2,
            languages: vec!["rust".to_string()],
            embed_batch_size: 10,
        };
        index_repository(&mut ctx, project.path(), &IndexOptions::default());

        std::fs::remove_file(project.path().join("src/helper.rs")).unwrap();
        let stats = index_repository(&mut ctx, project.path(), &IndexOptions::default());
        assert_eq!(stats.deleted, 1);
        assert_eq!(metadata::file_count(&conn).unwrap(), 1);
        assert_eq!(lexical.count().unwrap(), 1);
    }

    #[test]
    fn force_clean_truncates_before_reindexing() {
        let project = tempdir().unwrap();
        write_project(project.path());
        let state_dir = tempdir().unwrap();

        let conn = db::open_connection(&state_dir.path().join("meta.db"), 5000).unwrap();
        let lexical = LexicalStore::open(&state_dir.path().join("lexical")).unwrap();
        let vector = VectorStore::open(&state_dir.path().join("vectors"));
        let mut embedder = StubEmbedder { dims: 4 };
        let mut ctx = IndexerContext {
            conn: &conn,
            lexical: &lexical,
            vector: &vector,
            embedder: &mut embedder,
            max_file_size: 1_048_576,
            max_workers: 2,
            languages: vec!["rust".to_string()],
            embed_batch_size: 10,
        };
        index_repository(&mut ctx, project.path(), &IndexOptions::default());

        let options = IndexOptions {
            force_clean: true,
            ..Default::default()
        };
        let stats = index_repository(&mut ctx, project.path(), &options);
        assert_eq!(stats.fresh, 2);
        assert_eq!(metadata::file_count(&conn).unwrap(), 2);
    }
}
