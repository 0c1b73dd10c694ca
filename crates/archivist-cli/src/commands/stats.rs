use crate::context::ProjectContext;
use anyhow::Result;
use archivist_state::metadata;
use std::path::Path;

pub fn run(root: &Path, config_file: Option<&Path>) -> Result<()> {
    let ctx = ProjectContext::open(root, config_file)?;

    let file_count = metadata::file_count(&ctx.conn)?;
    let status_counts = metadata::status_counts(&ctx.conn)?;
    let lexical_count = ctx.lexical.count()?;
    let vector_count = ctx.vector.count()?;
    let vector_dim = ctx.vector.dimension()?;

    println!("root: {}", ctx.root.display());
    println!("data dir: {}", ctx.data_dir.display());
    println!("files tracked: {file_count}");
    for (status, count) in &status_counts {
        println!("  embedding_status={status}: {count}");
    }
    println!("lexical documents: {lexical_count}");
    match vector_dim {
        Some(dim) => println!("vectors: {vector_count} ({dim}-dimensional)"),
        None => println!("vectors: 0 (no dimension pinned yet)"),
    }
    Ok(())
}
