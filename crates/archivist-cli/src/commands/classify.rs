use anyhow::Result;
use archivist_indexer::partition::classify_path;

pub fn run(path: &str) -> Result<()> {
    let classification = classify_path(path);
    println!("partition:  {}", classification.partition_id);
    println!("authority:  {:.2}", classification.authority_score);
    println!("reason:     {}", classification.reason);
    Ok(())
}
