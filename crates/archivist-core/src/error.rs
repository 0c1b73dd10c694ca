use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("invalid config value: {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from C6 (metadata), C7 (vector), C8 (lexical), C5 (embedder).
#[derive(Error, Debug)]
pub enum StateError {
    #[error("sqlite error: {0}")]
    Sqlite(String),

    #[error("tantivy error: {0}")]
    Tantivy(String),

    #[error("vector dimension mismatch: collection={collection}, got={got}")]
    DimensionMismatch { collection: usize, got: usize },

    #[error("embedder error: {0}")]
    Embedder(String),

    #[error("schema migration required: current={current}, required={required}")]
    SchemaMigrationRequired { current: u32, required: u32 },

    #[error("corrupt store: {0}")]
    CorruptManifest(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StateError {
    pub fn sqlite<E: std::fmt::Display>(e: E) -> Self {
        Self::Sqlite(e.to_string())
    }

    pub fn tantivy<E: std::fmt::Display>(e: E) -> Self {
        Self::Tantivy(e.to_string())
    }

    pub fn embedder<E: std::fmt::Display>(e: E) -> Self {
        Self::Embedder(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index already running")]
    InProgress,

    #[error("file too large: {path} ({size} bytes)")]
    FileTooLarge { path: String, size: u64 },

    #[error("invalid root: {path}: {reason}")]
    InvalidRoot { path: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("tree-sitter parse failed: {path}")]
    TreeSitterFailed { path: String },

    #[error("grammar not available: {language}")]
    GrammarNotAvailable { language: String },
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("state error: {0}")]
    State(#[from] StateError),
}

pub type Result<T> = std::result::Result<T, Error>;
