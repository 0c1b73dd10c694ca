//! Process-wide defaults shared across crates.

/// Default data directory under the user's home, used when `storage.data_dir`
/// is not overridden.
pub const DEFAULT_DATA_DIR: &str = ".archivist";

/// Project-local config file, layered on top of the global one.
pub const PROJECT_CONFIG_FILE: &str = ".archivist/config.toml";

/// Per-project ignore file, layered on top of `.gitignore`.
pub const IGNORE_FILE: &str = ".archivistignore";

/// Bumped whenever the metadata/lexical/vector schema changes shape.
pub const SCHEMA_VERSION: u32 = 1;

/// Version tag mixed into `symbol_stable_id` so a hashing-scheme change
/// invalidates old ids instead of silently colliding with them.
pub const STABLE_ID_VERSION: &str = "stable_id:v1";

/// Default max bytes read for a single candidate file.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Default `k` for search operations when the caller doesn't specify one.
pub const DEFAULT_LIMIT: usize = 10;

/// Default bounded-parallelism worker count ceiling (min(cpu, this)).
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Default embedder batch size.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 48;

/// Default embedder per-batch retry attempts.
pub const DEFAULT_EMBED_RETRIES: u32 = 3;

/// Base delay for embedder retry backoff.
pub const DEFAULT_EMBED_RETRY_BASE_MS: u64 = 500;

/// Default embedder per-batch timeout, seconds.
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 30;

/// Default hybrid fusion weights.
pub const DEFAULT_SEMANTIC_WEIGHT: f64 = 0.7;
pub const DEFAULT_LEXICAL_WEIGHT: f64 = 0.3;

/// BM25 defaults.
pub const BM25_K1: f32 = 1.2;
pub const BM25_B: f32 = 0.75;

/// Embedding text target length bounds, bytes.
pub const EMBED_TEXT_MIN_BYTES: usize = 1024;
pub const EMBED_TEXT_MAX_BYTES: usize = 4096;
pub const EMBED_TEXT_MAX_SYMBOLS: usize = 32;
pub const EMBED_TEXT_DOC_TOKEN_CAP: usize = 512;

/// Model id tag used for the deterministic local fallback embedder, so its
/// vectors are never silently mixed with a real model's.
pub const FALLBACK_EMBEDDING_MODEL_ID: &str = "local-hashed-fallback-v1";

/// Hybrid search over-fetches each side by this multiplier (floor
/// `SEARCH_CANDIDATE_FLOOR`) before fusing, so post-fusion re-ranking has
/// enough candidates to work with.
pub const SEARCH_CANDIDATE_MULTIPLIER: usize = 4;
pub const SEARCH_CANDIDATE_FLOOR: usize = 50;

/// Snippet length attached to a search result, in characters.
pub const SEARCH_SNIPPET_CHARS: usize = 160;

/// Default wall-clock budget for a single store (C7 or C8) call inside a
/// hybrid search before it is treated as timed out and the other side
/// contributes alone.
pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 3_000;

/// Subdirectory (under the project data dir) that holds append-only
/// per-run index logs, one JSON file per run.
pub const INDEX_RUN_LOG_SUBDIR: &str = "logs/index";
