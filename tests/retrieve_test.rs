mod helpers;

use std::sync::Arc;

use chrono::{Duration, Utc};
use helpers::*;
use recollect::error::MemoryError;
use recollect::index::VectorIndex;
use recollect::memory::{MemoryRecord, MemoryStore};
use tempfile::TempDir;

fn window() -> Duration {
    Duration::minutes(120)
}

#[tokio::test]
async fn image_description_is_recalled_only_in_its_chat() {
    let store = memory_store(
        Arc::new(KeywordEmbedder::default()),
        StaticVision::describing("a red car"),
    );
    store.ingest_image_bytes(b"img", "chat-1").await.unwrap();

    let context = store.retrieve("car", "chat-1", window()).await.unwrap();
    assert!(context.contains("a red car"));
    assert_eq!(context, "[Image]: a red car");

    let other = store.retrieve("car", "chat-2", window()).await.unwrap();
    assert_eq!(other, "");
}

#[tokio::test]
async fn snippets_are_joined_by_blank_lines_nearest_first() {
    let store = memory_store(
        Arc::new(KeywordEmbedder::default()),
        StaticVision::describing("a diagram of the torque wrench"),
    );
    store.ingest_image_bytes(b"img", "chat-1").await.unwrap();
    let page = format!("torque settings for the wheel nuts {}", filler(200));
    store.ingest_pages(&[page], "chat-1").await.unwrap();

    let context = store
        .retrieve("torque wrench diagram", "chat-1", window())
        .await
        .unwrap();

    let parts: Vec<&str> = context.split("\n\n").collect();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0], "[Image]: a diagram of the torque wrench");
    assert!(parts[1].starts_with("[PDF Page 1]: torque settings"));
}

#[tokio::test]
async fn retrieval_returns_at_most_top_k() {
    let store = memory_store(Arc::new(KeywordEmbedder::default()), StaticVision::describing("x"));
    let k = store.settings().top_k;
    let pages: Vec<String> = (0..k + 3).map(|_| filler(300)).collect();
    store.ingest_pages(&pages, "chat-1").await.unwrap();

    let hits = store.search("lorem", "chat-1", window(), k).await.unwrap();
    assert_eq!(hits.len(), k);

    let context = store.retrieve("lorem", "chat-1", window()).await.unwrap();
    assert_eq!(context.split("\n\n").count(), k);

    let few = store.search("lorem", "chat-1", window(), 2).await.unwrap();
    assert_eq!(few.len(), 2);
}

#[tokio::test]
async fn records_outside_the_window_are_not_recalled() {
    let tmp = TempDir::new().unwrap();
    {
        let mut index = VectorIndex::open(tmp.path(), DIM).unwrap();
        let stale = MemoryRecord::image("chat-1", "an old red car", Utc::now() - Duration::hours(3))
            .unwrap();
        index
            .add_batch(vec![keyword_vector("an old red car")], vec![stale])
            .unwrap();
    }
    let store = persistent_store(
        tmp.path(),
        Arc::new(KeywordEmbedder::default()),
        StaticVision::describing("a new blue bike"),
    );
    store.ingest_image_bytes(b"img", "chat-1").await.unwrap();

    let recent = store.retrieve("car", "chat-1", window()).await.unwrap();
    assert_eq!(recent, "[Image]: a new blue bike");

    let wide = store
        .retrieve("car", "chat-1", Duration::hours(4))
        .await
        .unwrap();
    assert!(wide.starts_with("[Image]: an old red car"));
}

#[tokio::test]
async fn restart_sees_previously_ingested_records() {
    let tmp = TempDir::new().unwrap();
    {
        let store = persistent_store(
            tmp.path(),
            Arc::new(KeywordEmbedder::default()),
            StaticVision::describing("a red car"),
        );
        store.ingest_image_bytes(b"img", "chat-1").await.unwrap();
    }

    let reopened = persistent_store(
        tmp.path(),
        Arc::new(KeywordEmbedder::default()),
        StaticVision::describing("unused"),
    );
    let context = reopened.retrieve("car", "chat-1", window()).await.unwrap();
    assert_eq!(context, "[Image]: a red car");
}

#[tokio::test]
async fn empty_query_or_index_recalls_nothing() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let store = memory_store(embedder.clone(), StaticVision::describing("x"));

    assert_eq!(store.retrieve("anything", "chat-1", window()).await.unwrap(), "");
    assert_eq!(store.retrieve("   ", "chat-1", window()).await.unwrap(), "");
}

#[tokio::test]
async fn embedding_outage_surfaces_as_transient() {
    let store = memory_store(
        Arc::new(FlakyEmbedder::failing_on("car")),
        StaticVision::describing("x"),
    );

    let err = store.retrieve("red car", "chat-1", window()).await.unwrap_err();

    assert!(matches!(err, MemoryError::EmbeddingUnavailable(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn concurrent_readers_and_writers_stay_consistent() {
    let store = Arc::new(memory_store(
        Arc::new(KeywordEmbedder::default()),
        StaticVision::describing("a red car"),
    ));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                store.ingest_image_bytes(b"img", "chat-1").await.map(|_| ())
            } else {
                store.retrieve("car", "chat-1", window()).await.map(|_| ())
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.len().unwrap(), 4);
    let hits = store.search("car", "chat-1", window(), 10).await.unwrap();
    assert_eq!(hits.len(), 4);
}

#[test]
fn store_is_shareable_across_tasks() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MemoryStore>();
}
