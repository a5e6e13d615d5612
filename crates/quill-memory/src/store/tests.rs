use super::Store;
use chrono::TimeZone;
use chrono::Utc;
use quill_core::config::MemoryConfig;
use quill_core::error::QuillError;
use quill_core::traits::{InsightSink, UsageMetric};

/// Create an in-memory store for testing.
async fn test_store() -> Store {
    let config = MemoryConfig {
        db_path: ":memory:".to_string(),
        ..Default::default()
    };
    Store::new(&config).await.unwrap()
}

#[tokio::test]
async fn test_upsert_new_fragment_starts_at_one() {
    let store = test_store().await;
    store
        .upsert_fragment("u1", "mail", "call mom", "hash-a")
        .await
        .unwrap();

    let rows = store.fragments_for_context("u1", "mail").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, "call mom");
    assert_eq!(rows[0].frequency, 1);
    assert_eq!(rows[0].fingerprint.as_deref(), Some("hash-a"));
}

#[tokio::test]
async fn test_upsert_same_fingerprint_bumps_frequency() {
    let store = test_store().await;
    store
        .upsert_fragment("u1", "mail", "call mom", "hash-a")
        .await
        .unwrap();
    store
        .upsert_fragment("u1", "mail", "calling my mom", "hash-a")
        .await
        .unwrap();

    let rows = store.fragments_for_context("u1", "mail").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].frequency, 2);
    assert_eq!(rows[0].content, "calling my mom");
}

#[tokio::test]
async fn test_upsert_is_scoped_by_context() {
    let store = test_store().await;
    store
        .upsert_fragment("u1", "mail", "call mom", "hash-a")
        .await
        .unwrap();
    store
        .upsert_fragment("u1", "notes", "call mom", "hash-a")
        .await
        .unwrap();

    assert_eq!(store.fragments_for_context("u1", "mail").await.unwrap().len(), 1);
    assert_eq!(store.fragments_for_context("u1", "notes").await.unwrap().len(), 1);
    assert_eq!(store.recent_fragments("u1", 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_absorption_candidate_within_window() {
    let store = test_store().await;
    store
        .upsert_fragment("u1", "mail", "call mo", "hash-a")
        .await
        .unwrap();

    let candidate = store.absorption_candidate("u1", "mail", 60).await.unwrap();
    assert_eq!(candidate.unwrap().content, "call mo");

    // Nothing for another context.
    let other = store.absorption_candidate("u1", "notes", 60).await.unwrap();
    assert!(other.is_none());
}

#[tokio::test]
async fn test_absorption_candidate_expires() {
    let store = test_store().await;
    store
        .upsert_fragment("u1", "mail", "call mo", "hash-a")
        .await
        .unwrap();

    // Age the row past the window.
    sqlx::query("UPDATE typing_fragments SET updated_at = datetime('now', '-120 seconds')")
        .execute(store.pool())
        .await
        .unwrap();

    let candidate = store.absorption_candidate("u1", "mail", 60).await.unwrap();
    assert!(candidate.is_none());
}

#[tokio::test]
async fn test_absorb_overwrites_without_frequency_bump() {
    let store = test_store().await;
    store
        .upsert_fragment("u1", "mail", "call mo", "hash-a")
        .await
        .unwrap();
    let frag = store
        .absorption_candidate("u1", "mail", 60)
        .await
        .unwrap()
        .unwrap();

    store
        .absorb_fragment(&frag.id, "call mom now", Some("hash-b"))
        .await
        .unwrap();

    let rows = store.fragments_for_context("u1", "mail").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, "call mom now");
    assert_eq!(rows[0].fingerprint.as_deref(), Some("hash-b"));
    assert_eq!(rows[0].frequency, 1);
}

#[tokio::test]
async fn test_absorb_missing_row_is_a_conflict() {
    let store = test_store().await;
    let err = store
        .absorb_fragment("no-such-id", "text", Some("hash"))
        .await
        .unwrap_err();
    assert!(matches!(err, QuillError::StorageConflict(_)));
}

#[tokio::test]
async fn test_create_and_get_schedules() {
    let store = test_store().await;
    let id = store
        .create_schedule("u1", "Morning brief", Some("Summarize my plans"), "UTC", "Everyday", "09:00")
        .await
        .unwrap();

    let all = store.all_schedules().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, id);
    assert_eq!(all[0].recurrence, "Everyday");
    assert!(all[0].last_fired_at.is_none());

    let one = store.get_schedule(&id).await.unwrap().unwrap();
    assert_eq!(one.title, "Morning brief");
}

#[tokio::test]
async fn test_claim_firing_once_per_minute() {
    let store = test_store().await;
    let id = store
        .create_schedule("u1", "Brief", None, "UTC", "Everyday", "09:00")
        .await
        .unwrap();

    let first = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    assert!(store.claim_firing(&id, first).await.unwrap());

    // Same minute, later second: the claim must fail.
    let same_minute = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 30).unwrap();
    assert!(!store.claim_firing(&id, same_minute).await.unwrap());

    // Next day, same wall-clock minute: fires again.
    let next_day = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
    assert!(store.claim_firing(&id, next_day).await.unwrap());

    let schedule = store.get_schedule(&id).await.unwrap().unwrap();
    assert_eq!(schedule.last_fired_at.as_deref(), Some("2026-03-02 09:00:00"));
}

#[tokio::test]
async fn test_delete_schedule() {
    let store = test_store().await;
    let id = store
        .create_schedule("u1", "Brief", None, "UTC", "Everyday", "09:00")
        .await
        .unwrap();

    assert!(store.delete_schedule(&id).await.unwrap());
    assert!(!store.delete_schedule(&id).await.unwrap());
    assert!(store.all_schedules().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memories_are_append_only_and_scoped() {
    let store = test_store().await;
    store.store_memory("u1", "first insight", "scheduler_s1").await.unwrap();
    store.store_memory("u1", "second insight", "scheduler_s1").await.unwrap();
    store.store_memory("u2", "other user", "scheduler_s2").await.unwrap();

    let mine = store.recent_memories("u1", 10).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|m| m.user_id == "u1"));

    let capped = store.recent_memories("u1", 1).await.unwrap();
    assert_eq!(capped.len(), 1);
}

#[tokio::test]
async fn test_actions_roundtrip() {
    let store = test_store().await;
    store
        .record_action("u1", "draft_invite", "approved", Some("calendar slot"))
        .await
        .unwrap();
    store
        .record_action("u1", "draft_email", "declined", None)
        .await
        .unwrap();

    let actions = store.recent_actions("u1", 10).await.unwrap();
    assert_eq!(actions.len(), 2);
    assert!(actions.iter().any(|a| a.decision == "approved"));
    assert!(actions.iter().any(|a| a.context.is_none()));
}

#[tokio::test]
async fn test_file_backed_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data/quill.db");
    let config = MemoryConfig {
        db_path: db_path.to_str().unwrap().to_string(),
        ..Default::default()
    };

    {
        let store = Store::new(&config).await.unwrap();
        store
            .upsert_fragment("u1", "mail", "persist me", "hash-a")
            .await
            .unwrap();
    }

    let reopened = Store::new(&config).await.unwrap();
    let rows = reopened.fragments_for_context("u1", "mail").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].content, "persist me");
}

#[tokio::test]
async fn test_usage_stats_accumulate() {
    let store = test_store().await;
    store.record("u1", UsageMetric::FragmentRecorded).await.unwrap();
    store.record("u1", UsageMetric::FragmentRecorded).await.unwrap();
    store.record("u1", UsageMetric::FragmentAbsorbed).await.unwrap();

    assert_eq!(store.usage_stats("u1").await.unwrap(), (2, 1, 0));
    assert_eq!(store.usage_stats("unknown").await.unwrap(), (0, 0, 0));
}
