//! Resolves a project root into the open stores every subcommand needs:
//! config, the metadata connection, the lexical index and the vector store.
//! Kept separate from `main.rs` so each command function takes the same
//! small context instead of threading four parameters through every call.

use anyhow::{Context, Result};
use archivist_core::config::Config;
use archivist_core::ids;
use archivist_state::lexical::LexicalStore;
use archivist_state::vector_store::VectorStore;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub struct ProjectContext {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub config: Config,
    pub conn: Connection,
    pub lexical: LexicalStore,
    pub vector: VectorStore,
}

impl ProjectContext {
    pub fn open(root: &Path, config_file: Option<&Path>) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("root does not exist: {}", root.display()))?;
        let config = Config::load_with_file(Some(&root), config_file)
            .context("failed to load configuration")?;

        let project_id = ids::file_id(&root.to_string_lossy());
        let data_dir = config.project_data_dir(&project_id);
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data dir: {}", data_dir.display()))?;

        let conn = archivist_state::db::open_connection(
            &data_dir.join("metadata.sqlite3"),
            config.storage.busy_timeout_ms,
        )
        .context("failed to open metadata store")?;
        let lexical =
            LexicalStore::open(&data_dir.join("lexical")).context("failed to open lexical store")?;
        let vector = VectorStore::open(&data_dir.join("vectors"));

        Ok(Self {
            root,
            data_dir,
            config,
            conn,
            lexical,
            vector,
        })
    }
}
