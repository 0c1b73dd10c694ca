//! Indexing pipeline: file walking and change detection (C1), per-language
//! symbol/import extraction (C2/C3), partition classification (C4),
//! embedding-text assembly, and the orchestrator that sequences all of it
//! into a single indexing run (C9).

pub mod embed_text;
pub mod languages;
pub mod orchestrator;
pub mod parser;
pub mod partition;
pub mod scanner;

pub use orchestrator::{IndexerContext, index_files, index_repository};
