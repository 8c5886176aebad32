use anyhow::Result;

use crate::config::{window_from_minutes, RecollectConfig};

/// Run a filtered search from the terminal and print scored hits.
pub async fn search(
    config: &RecollectConfig,
    query: &str,
    chat_id: &str,
    window_minutes: Option<i64>,
    limit: Option<usize>,
) -> Result<()> {
    let store = crate::server::open_store(config)?;

    let window = match window_minutes {
        Some(minutes) => window_from_minutes(minutes)
            .ok_or_else(|| anyhow::anyhow!("window_minutes out of range: {minutes}"))?,
        None => config.retrieval_window(),
    };
    let k = limit.unwrap_or(config.retrieval.top_k);

    let hits = store.search(query, chat_id, window, k).await?;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!(
        "Found {} result(s) in chat {chat_id} (last {} min)\n",
        hits.len(),
        window.num_minutes()
    );

    for (i, hit) in hits.iter().enumerate() {
        let snippet = hit.record.snippet();
        let preview = if snippet.chars().count() > 120 {
            format!("{}...", snippet.chars().take(120).collect::<String>())
        } else {
            snippet
        };

        println!(
            "  {}. #{} [{}] {} (distance: {:.4})",
            i + 1,
            hit.position,
            hit.record.kind(),
            hit.record.timestamp().format("%Y-%m-%d %H:%M:%S"),
            hit.distance,
        );
        println!("     {}", preview);
        println!();
    }

    Ok(())
}
