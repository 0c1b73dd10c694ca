//! End-to-end coverage driving the library entry points the `index` and
//! `search` subcommands wrap, against the shared `rust-sample` fixture.

use archivist_core::types::{IndexOptions, SearchFilter};
use archivist_indexer::{IndexerContext, index_repository};
use archivist_query::{search_hybrid, search_keyword, search_semantic};
use archivist_state::embedding::build_embedding_provider;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

fn fixture_repo_path() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .join("../../testdata/fixtures/rust-sample")
        .canonicalize()
        .expect("fixture repo must exist at testdata/fixtures/rust-sample")
}

fn copy_dir_recursive(src: &Path, dst: &Path) {
    std::fs::create_dir_all(dst).expect("create destination directory");
    for entry in std::fs::read_dir(src).expect("read source directory") {
        let entry = entry.expect("read directory entry");
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if entry.file_type().expect("read file type").is_dir() {
            copy_dir_recursive(&from, &to);
        } else {
            std::fs::copy(&from, &to).expect("copy fixture file");
        }
    }
}

#[test]
fn index_then_search_finds_the_expected_file() {
    let workdir = tempdir().expect("tempdir");
    let repo_root = workdir.path().join("repo");
    copy_dir_recursive(&fixture_repo_path(), &repo_root);

    let data_dir = workdir.path().join("data");
    let conn = archivist_state::db::open_connection(&data_dir.join("metadata.sqlite3"), 5000).expect("open sqlite");
    let lexical = archivist_state::lexical::LexicalStore::open(&data_dir.join("lexical")).expect("open lexical");
    let vector = archivist_state::vector_store::VectorStore::open(&data_dir.join("vectors"));

    let semantic_config = archivist_core::config::SemanticConfig {
        provider: "local".to_string(),
        model: "nomic-embed-text-v1.5-q".to_string(),
        batch_size: 8,
        allow_fallback: false,
        profiles: Default::default(),
    };
    let mut embedder = build_embedding_provider(&semantic_config).expect("build embedder");

    let mut ctx = IndexerContext {
        conn: &conn,
        lexical: &lexical,
        vector: &vector,
        embedder: embedder.as_mut(),
        max_file_size: 5 * 1024 * 1024,
        max_workers: 2,
        languages: vec!["rust".to_string()],
        embed_batch_size: 8,
    };

    let stats = index_repository(&mut ctx, &repo_root, &IndexOptions::default());
    assert!(stats.total > 0, "fixture repo should contain indexable files");
    assert_eq!(stats.errors.len(), 0, "fixture repo should index cleanly: {:?}", stats.errors);

    let keyword_results = search_keyword(&conn, &lexical, "auth", 5, None).expect("keyword search");
    assert!(
        keyword_results.iter().any(|r| r.file_path.contains("auth")),
        "expected auth.rs among keyword results, got {keyword_results:?}"
    );

    let semantic_results =
        search_semantic(&conn, &vector, embedder.as_mut(), "token refresh", 5, None).expect("semantic search");
    assert!(!semantic_results.is_empty(), "semantic search should return candidates for an indexed repo");

    let response = search_hybrid(
        &conn,
        &vector,
        &lexical,
        embedder.as_mut(),
        "auth token",
        5,
        None,
        (0.7, 0.3),
        Duration::from_secs(5),
    )
    .expect("hybrid search");
    assert!(!response.results.is_empty());
    assert!(!response.partial);

    let filtered = search_keyword(
        &conn,
        &lexical,
        "auth",
        5,
        Some(&SearchFilter {
            partition_id: Some("definitely-not-a-real-partition".to_string()),
            language: None,
        }),
    )
    .expect("filtered keyword search");
    assert!(filtered.is_empty(), "an impossible partition filter should exclude every result");
}

#[test]
fn reindexing_unchanged_repo_reports_every_file_unchanged() {
    let workdir = tempdir().expect("tempdir");
    let repo_root = workdir.path().join("repo");
    copy_dir_recursive(&fixture_repo_path(), &repo_root);

    let data_dir = workdir.path().join("data");
    let conn = archivist_state::db::open_connection(&data_dir.join("metadata.sqlite3"), 5000).expect("open sqlite");
    let lexical = archivist_state::lexical::LexicalStore::open(&data_dir.join("lexical")).expect("open lexical");
    let vector = archivist_state::vector_store::VectorStore::open(&data_dir.join("vectors"));
    let semantic_config = archivist_core::config::SemanticConfig {
        provider: "local".to_string(),
        model: "nomic-embed-text-v1.5-q".to_string(),
        batch_size: 8,
        allow_fallback: false,
        profiles: Default::default(),
    };
    let mut embedder = build_embedding_provider(&semantic_config).expect("build embedder");

    let mut ctx = IndexerContext {
        conn: &conn,
        lexical: &lexical,
        vector: &vector,
        embedder: embedder.as_mut(),
        max_file_size: 5 * 1024 * 1024,
        max_workers: 2,
        languages: vec!["rust".to_string()],
        embed_batch_size: 8,
    };

    let first = index_repository(&mut ctx, &repo_root, &IndexOptions::default());
    assert!(first.indexed > 0);

    let second = index_repository(&mut ctx, &repo_root, &IndexOptions::default());
    assert_eq!(second.unchanged, first.total);
    assert_eq!(second.indexed, 0);
}
