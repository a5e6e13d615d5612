use super::IngestEngine;
use async_trait::async_trait;
use quill_core::{
    atomizer::EMAIL_PLACEHOLDER,
    config::{IngestConfig, MemoryConfig},
    error::QuillError,
    event::TypingEvent,
    insight::{GeneratedInsight, InsightRequest},
    traits::{InsightSink, Oracle},
};
use quill_memory::Store;
use quill_oracle::Fingerprinter;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps exact sentences to canonical labels; anything else errors, which
/// exercises the fingerprinter's deterministic local fallback.
struct MapOracle {
    labels: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl Oracle for MapOracle {
    fn name(&self) -> &str {
        "map"
    }

    async fn canonicalize(&self, sentence: &str) -> Result<String, QuillError> {
        self.labels
            .get(sentence)
            .map(|l| l.to_string())
            .ok_or_else(|| QuillError::Oracle("unknown sentence".to_string()))
    }

    async fn generate(&self, _request: &InsightRequest) -> Result<GeneratedInsight, QuillError> {
        Err(QuillError::Oracle("not implemented".to_string()))
    }

    async fn is_available(&self) -> bool {
        true
    }
}

async fn test_engine(labels: &[(&'static str, &'static str)]) -> (Arc<IngestEngine>, Store) {
    let store = Store::new(&MemoryConfig {
        db_path: ":memory:".to_string(),
        ..Default::default()
    })
    .await
    .unwrap();

    let oracle = Arc::new(MapOracle {
        labels: labels.iter().copied().collect(),
    });
    let sink: Arc<dyn InsightSink> = Arc::new(store.clone());
    let engine = Arc::new(IngestEngine::new(
        store.clone(),
        Arc::new(Fingerprinter::new(oracle)),
        sink,
        IngestConfig::default(),
    ));
    (engine, store)
}

#[tokio::test]
async fn test_same_intent_dedups_to_one_fragment() {
    let (engine, store) = test_engine(&[
        ("I want to eat rice.", "EAT_RICE"),
        ("I'm eating rice.", "EAT_RICE"),
    ])
    .await;

    engine
        .process_event(&TypingEvent::new("u1", "notes", "I want to eat rice."))
        .await;
    engine
        .process_event(&TypingEvent::new("u1", "notes", "I'm eating rice."))
        .await;

    let rows = store.fragments_for_context("u1", "notes").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].frequency, 2);
    assert_eq!(rows[0].content, "I'm eating rice.");
}

#[tokio::test]
async fn test_expansion_absorption_merges_growing_thought() {
    let (engine, store) = test_engine(&[("call mom now", "CALL_MOM")]).await;

    engine
        .process_event(&TypingEvent::new("u1", "mail", "call mo"))
        .await;
    engine
        .process_event(&TypingEvent::new("u1", "mail", "call mom now"))
        .await;

    let rows = store.fragments_for_context("u1", "mail").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, "call mom now");
    // Absorption never bumps frequency.
    assert_eq!(rows[0].frequency, 1);

    let (recorded, absorbed, _) = store.usage_stats("u1").await.unwrap();
    assert_eq!((recorded, absorbed), (1, 1));
}

#[tokio::test]
async fn test_absorption_does_not_cross_contexts() {
    let (engine, store) = test_engine(&[]).await;

    engine
        .process_event(&TypingEvent::new("u1", "mail", "call mo"))
        .await;
    engine
        .process_event(&TypingEvent::new("u1", "notes", "call mom now"))
        .await;

    assert_eq!(store.fragments_for_context("u1", "mail").await.unwrap().len(), 1);
    let notes = store.fragments_for_context("u1", "notes").await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "call mom now");
}

#[tokio::test]
async fn test_full_snapshot_is_never_persisted() {
    let (engine, store) = test_engine(&[]).await;

    let mut event = TypingEvent::new("u1", "mail", "plenty of text here. And more.");
    event.is_full_snapshot = true;
    engine.process_event(&event).await;

    assert!(store.recent_fragments("u1", 10).await.unwrap().is_empty());
    assert_eq!(store.usage_stats("u1").await.unwrap(), (0, 0, 0));
}

#[tokio::test]
async fn test_pii_is_scrubbed_before_storage() {
    let (engine, store) = test_engine(&[]).await;

    engine
        .process_event(&TypingEvent::new("u1", "mail", "reach me at a@b.com"))
        .await;

    let rows = store.fragments_for_context("u1", "mail").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].content.contains(EMAIL_PLACEHOLDER));
    assert!(!rows[0].content.contains("a@b.com"));
}

#[tokio::test]
async fn test_multi_atom_event_persists_each_atom() {
    let (engine, store) = test_engine(&[]).await;

    engine
        .process_event(&TypingEvent::new(
            "u1",
            "notes",
            "Hello world. This is Rust!",
        ))
        .await;

    let rows = store.fragments_for_context("u1", "notes").await.unwrap();
    assert_eq!(rows.len(), 2);
    let contents: Vec<&str> = rows.iter().map(|r| r.content.as_str()).collect();
    assert!(contents.contains(&"Hello world."));
    assert!(contents.contains(&"This is Rust!"));
}

#[tokio::test]
async fn test_equal_content_upserts_instead_of_absorbing() {
    let (engine, store) = test_engine(&[]).await;

    engine
        .process_event(&TypingEvent::new("u1", "mail", "call mom"))
        .await;
    engine
        .process_event(&TypingEvent::new("u1", "mail", "call mom"))
        .await;

    let rows = store.fragments_for_context("u1", "mail").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].frequency, 2);
}

#[tokio::test]
async fn test_submit_processes_in_background() {
    let (engine, store) = test_engine(&[]).await;

    engine
        .submit(TypingEvent::new("u1", "mail", "hello from the queue"))
        .await;

    // The worker runs asynchronously; poll briefly.
    for _ in 0..100 {
        if !store.fragments_for_context("u1", "mail").await.unwrap().is_empty() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("submitted event was never persisted");
}
