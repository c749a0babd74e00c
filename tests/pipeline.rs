//! End-to-end pipeline tests against the real SQLite store.
//!
//! The unit tests cover the engine over the in-memory store; these verify
//! the same flows survive the SQL layer: schema creation, suggestion
//! persistence, the analyzed flag, dedup across batch runs, and the
//! accept/reject lifecycle.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use hopelog::config::{EmbeddingConfig, SuggestionsConfig};
use hopelog::llm::ChatProvider;
use hopelog::migrate::apply_schema;
use hopelog::models::{JournalEntry, User, SOURCE_AI, STATUS_ACTIVE, STATUS_SUGGESTED};
use hopelog::reconcile::SuggestionEngine;
use hopelog::store::sqlite::SqliteStore;
use hopelog::store::Store;

struct CannedChat(serde_json::Value);

#[async_trait]
impl ChatProvider for CannedChat {
    fn model_name(&self) -> &str {
        "canned"
    }
    async fn complete_json(&self, _: &str, _: &str) -> Result<serde_json::Value> {
        Ok(self.0.clone())
    }
}

async fn temp_store(tmp: &TempDir) -> Arc<SqliteStore> {
    let db_path = tmp.path().join("hopelog.sqlite");
    let options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .unwrap();
    apply_schema(&pool).await.unwrap();
    Arc::new(SqliteStore::new(pool))
}

async fn seed_user(store: &SqliteStore, id: &str) {
    store
        .create_user(&User {
            id: id.to_string(),
            username: format!("user-{}", id),
            email: format!("{}@example.com", id),
            created_at: 0,
        })
        .await
        .unwrap();
}

fn entry(id: &str, user_id: &str, content: &str, date: i64) -> JournalEntry {
    JournalEntry {
        id: id.to_string(),
        user_id: user_id.to_string(),
        title: None,
        content: content.to_string(),
        date,
        is_journal: true,
        is_ai_response: false,
        analyzed: false,
        sentiment: None,
    }
}

fn engine(store: Arc<SqliteStore>, chat: Arc<dyn ChatProvider>) -> SuggestionEngine {
    SuggestionEngine::new(
        store,
        chat,
        EmbeddingConfig::default(),
        SuggestionsConfig::default(),
    )
}

fn spanish_bundle() -> serde_json::Value {
    serde_json::json!({
        "goals": [{"name": "Learn Spanish", "category": "Learning"}],
        "tasks": [{"title": "Sign up for a class", "priority": "medium"}],
        "habits": [{"title": "Practice vocabulary", "frequency": "daily"}]
    })
}

#[tokio::test]
async fn test_pipeline_persists_suggestions() {
    let tmp = TempDir::new().unwrap();
    let store = temp_store(&tmp).await;
    seed_user(&store, "u1").await;

    let e = entry("e1", "u1", "I want to get back into Spanish", 1_700_000_000);
    store.create_journal_entry(&e).await.unwrap();

    let chat: Arc<dyn ChatProvider> = Arc::new(CannedChat(spanish_bundle()));
    let result = engine(store.clone(), chat)
        .process_single_entry(&e)
        .await
        .unwrap();

    assert_eq!(result.goals_created, 1);
    assert_eq!(result.tasks_created, 1);
    assert_eq!(result.habits_created, 1);

    let goals = store.goals_by_user_id("u1").await.unwrap();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].name, "Learn Spanish");
    assert_eq!(goals[0].status, STATUS_SUGGESTED);
    assert_eq!(goals[0].source, SOURCE_AI);
    assert_eq!(goals[0].journal_entry_id.as_deref(), Some("e1"));
    assert!(goals[0].ai_explanation.is_some());

    let stored = store.get_journal_entry("e1").await.unwrap().unwrap();
    assert!(stored.analyzed);
}

#[tokio::test]
async fn test_pipeline_dedups_across_runs() {
    let tmp = TempDir::new().unwrap();
    let store = temp_store(&tmp).await;
    seed_user(&store, "u1").await;

    for (i, id) in ["e1", "e2"].iter().enumerate() {
        store
            .create_journal_entry(&entry(id, "u1", "Spanish again", 1_700_000_000 + i as i64))
            .await
            .unwrap();
    }

    let chat: Arc<dyn ChatProvider> = Arc::new(CannedChat(spanish_bundle()));
    let total = engine(store.clone(), chat)
        .process_all_entries_for_user("u1", None)
        .await
        .unwrap();

    // Second entry's identical suggestions dedup against the first's
    assert_eq!(total.goals_created, 1);
    assert_eq!(total.goals_skipped, 1);
    assert_eq!(store.goals_by_user_id("u1").await.unwrap().len(), 1);

    // And the batch is idempotent: a rerun touches nothing
    let chat: Arc<dyn ChatProvider> = Arc::new(CannedChat(spanish_bundle()));
    let rerun = engine(store.clone(), chat)
        .process_all_entries_for_user("u1", None)
        .await
        .unwrap();
    assert!(rerun.is_zero());
}

#[tokio::test]
async fn test_accept_promotes_exactly_once() {
    let tmp = TempDir::new().unwrap();
    let store = temp_store(&tmp).await;
    seed_user(&store, "u1").await;

    let e = entry("e1", "u1", "Spanish", 1_700_000_000);
    store.create_journal_entry(&e).await.unwrap();
    let chat: Arc<dyn ChatProvider> = Arc::new(CannedChat(spanish_bundle()));
    engine(store.clone(), chat)
        .process_single_entry(&e)
        .await
        .unwrap();

    let goal_id = store.goals_by_user_id("u1").await.unwrap()[0].id.clone();

    let accepted = store.accept_goal(&goal_id).await.unwrap().unwrap();
    assert_eq!(accepted.status, STATUS_ACTIVE);

    // Second accept finds no suggested row
    assert!(store.accept_goal(&goal_id).await.unwrap().is_none());

    // Reject of an active item is a no-op too
    assert!(!store.delete_suggested_goal(&goal_id).await.unwrap());
    assert!(store.get_goal(&goal_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_reject_deletes_suggested_row() {
    let tmp = TempDir::new().unwrap();
    let store = temp_store(&tmp).await;
    seed_user(&store, "u1").await;

    let e = entry("e1", "u1", "Spanish", 1_700_000_000);
    store.create_journal_entry(&e).await.unwrap();
    let chat: Arc<dyn ChatProvider> = Arc::new(CannedChat(spanish_bundle()));
    engine(store.clone(), chat)
        .process_single_entry(&e)
        .await
        .unwrap();

    let task_id = store.tasks_by_user_id("u1").await.unwrap()[0].id.clone();
    assert!(store.delete_suggested_task(&task_id).await.unwrap());
    assert!(store.get_task(&task_id).await.unwrap().is_none());

    // A rejected suggestion can reappear from a later entry: rejection
    // deletes the row, it does not blocklist the name.
    let e2 = entry("e2", "u1", "Spanish again", 1_700_000_001);
    store.create_journal_entry(&e2).await.unwrap();
    let chat: Arc<dyn ChatProvider> = Arc::new(CannedChat(spanish_bundle()));
    let result = engine(store.clone(), chat)
        .process_single_entry(&e2)
        .await
        .unwrap();
    assert_eq!(result.tasks_created, 1);
}

#[tokio::test]
async fn test_sentiment_and_embedding_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let store = temp_store(&tmp).await;
    seed_user(&store, "u1").await;

    let e = entry("e1", "u1", "calm evening", 1_700_000_000);
    store.create_journal_entry(&e).await.unwrap();

    store
        .set_entry_sentiment(
            "e1",
            &hopelog::models::Sentiment {
                score: 4,
                emotions: vec!["calm".to_string()],
                themes: vec!["rest".to_string()],
            },
        )
        .await
        .unwrap();

    let stored = store.get_journal_entry("e1").await.unwrap().unwrap();
    let sentiment = stored.sentiment.unwrap();
    assert_eq!(sentiment.score, 4);
    assert_eq!(sentiment.emotions, vec!["calm"]);

    store
        .upsert_entry_embedding("e1", "u1", "test-model", 3, &[0.1, 0.2, 0.3])
        .await
        .unwrap();
    // Upsert with a new vector replaces, not duplicates
    store
        .upsert_entry_embedding("e1", "u1", "test-model", 3, &[0.4, 0.5, 0.6])
        .await
        .unwrap();

    let vectors = store.journal_vectors_by_user_id("u1").await.unwrap();
    assert_eq!(vectors.len(), 1);
    assert_eq!(vectors[0].1, vec![0.4, 0.5, 0.6]);
}

#[tokio::test]
async fn test_unanalyzed_ordering_oldest_first() {
    let tmp = TempDir::new().unwrap();
    let store = temp_store(&tmp).await;
    seed_user(&store, "u1").await;

    for (id, date) in [("e-new", 1_700_000_100), ("e-old", 1_700_000_000)] {
        store
            .create_journal_entry(&entry(id, "u1", "text", date))
            .await
            .unwrap();
    }

    let unanalyzed = store.unanalyzed_entries_by_user_id("u1").await.unwrap();
    assert_eq!(unanalyzed[0].id, "e-old");
    assert_eq!(unanalyzed[1].id, "e-new");

    store.mark_entry_analyzed("e-old").await.unwrap();
    let unanalyzed = store.unanalyzed_entries_by_user_id("u1").await.unwrap();
    assert_eq!(unanalyzed.len(), 1);
    assert_eq!(unanalyzed[0].id, "e-new");
}
