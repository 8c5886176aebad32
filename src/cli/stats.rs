use anyhow::Result;

use crate::config::RecollectConfig;

/// Display index statistics in the terminal.
pub fn stats(config: &RecollectConfig, chat_id: Option<&str>) -> Result<()> {
    let index = crate::index::VectorIndex::open(
        config.resolved_index_dir(),
        config.embedding.dimensions,
    )?;
    let response = crate::memory::stats::index_stats(&index, chat_id);

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    if let Some(chat) = chat_id {
        println!("  Chat:                {chat}");
    }
    println!("  Total records:       {}", response.total_records);
    println!("  Conversations:       {}", response.distinct_chats);
    println!("  Dimension:           {}", response.dimension);
    println!();

    println!("By Kind:");
    for (kind, count) in &response.by_kind {
        println!("  {:<12} {}", kind, count);
    }
    println!();

    println!("Vector blob:           {} bytes", response.blob_size_bytes);
    println!("Metadata sidecar:      {} bytes", response.sidecar_size_bytes);

    if let Some(ref oldest) = response.oldest_record {
        println!("Oldest record:         {oldest}");
    }
    if let Some(ref newest) = response.newest_record {
        println!("Newest record:         {newest}");
    }

    Ok(())
}
