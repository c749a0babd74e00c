//! Journal entry creation flow.
//!
//! Saving an entry is the hot path of the product and must never fail on
//! account of AI plumbing: sentiment analysis degrades to a neutral
//! default and embedding indexing is best-effort. Only the entry insert
//! itself can fail the call.

use anyhow::{bail, Result};
use tracing::warn;
use uuid::Uuid;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::embedding;
use crate::llm::ChatProvider;
use crate::models::{JournalEntry, Sentiment};
use crate::sentiment::analyze_sentiment;
use crate::store::Store;

/// Create a journal entry for a user, run inline sentiment analysis, and
/// index the entry for semantic retrieval.
///
/// The entry starts unanalyzed; the suggestion batch picks it up later.
pub async fn add_entry(
    store: &dyn Store,
    chat: &dyn ChatProvider,
    llm_cfg: &LlmConfig,
    embedding_cfg: &EmbeddingConfig,
    user_id: &str,
    title: Option<String>,
    content: &str,
) -> Result<JournalEntry> {
    if content.trim().is_empty() {
        bail!("journal entry content must not be empty");
    }
    if store.get_user(user_id).await?.is_none() {
        bail!("no user with id {}", user_id);
    }

    let entry = JournalEntry {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title,
        content: content.to_string(),
        date: chrono::Utc::now().timestamp(),
        is_journal: true,
        is_ai_response: false,
        analyzed: false,
        sentiment: None,
    };
    store.create_journal_entry(&entry).await?;

    let mut saved = entry.clone();

    if llm_cfg.is_enabled() {
        let analysis = analyze_sentiment(chat, content).await;
        let sentiment = Sentiment {
            score: analysis.score,
            emotions: analysis.emotions,
            themes: analysis.themes,
        };
        store.set_entry_sentiment(&entry.id, &sentiment).await?;
        saved.sentiment = Some(sentiment);
    }

    // Indexing failures must not lose the entry; retrieval falls back to
    // recency for unindexed entries.
    if embedding_cfg.is_enabled() {
        if let Err(e) = index_entry(store, embedding_cfg, &entry).await {
            warn!(entry_id = %entry.id, error = %e, "embedding indexing failed, entry saved without vector");
        }
    }

    Ok(saved)
}

async fn index_entry(
    store: &dyn Store,
    embedding_cfg: &EmbeddingConfig,
    entry: &JournalEntry,
) -> Result<()> {
    let provider = embedding::create_provider(embedding_cfg)?;
    let vector = embedding::embed_query(provider.as_ref(), embedding_cfg, &entry.content).await?;
    store
        .upsert_entry_embedding(
            &entry.id,
            &entry.user_id,
            provider.model_name(),
            vector.len(),
            &vector,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;

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

    struct FailingChat;

    #[async_trait]
    impl ChatProvider for FailingChat {
        fn model_name(&self) -> &str {
            "failing"
        }
        async fn complete_json(&self, _: &str, _: &str) -> Result<serde_json::Value> {
            anyhow::bail!("model unavailable")
        }
    }

    async fn store_with_user() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_user(&User {
                id: "u1".to_string(),
                username: "sam".to_string(),
                email: "sam@example.com".to_string(),
                created_at: 0,
            })
            .await
            .unwrap();
        store
    }

    fn enabled_llm() -> LlmConfig {
        LlmConfig {
            provider: "ollama".to_string(),
            model: Some("llama3".to_string()),
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_entry_saved_with_sentiment() {
        let store = store_with_user().await;
        let chat = CannedChat(serde_json::json!({
            "score": 4, "emotions": ["calm"], "themes": ["rest"]
        }));

        let entry = add_entry(
            &store,
            &chat,
            &enabled_llm(),
            &EmbeddingConfig::default(),
            "u1",
            Some("Sunday".to_string()),
            "slept well, feeling rested",
        )
        .await
        .unwrap();

        assert!(!entry.analyzed);
        assert_eq!(entry.sentiment.as_ref().unwrap().score, 4);

        let stored = store.get_journal_entry(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.sentiment.unwrap().emotions, vec!["calm"]);
    }

    #[tokio::test]
    async fn test_sentiment_failure_does_not_block_save() {
        let store = store_with_user().await;

        let entry = add_entry(
            &store,
            &FailingChat,
            &enabled_llm(),
            &EmbeddingConfig::default(),
            "u1",
            None,
            "rough day",
        )
        .await
        .unwrap();

        // Neutral fallback, entry saved regardless
        assert_eq!(entry.sentiment.as_ref().unwrap().score, 3);
        assert!(store.get_journal_entry(&entry.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_llm_disabled_skips_sentiment() {
        let store = store_with_user().await;

        let entry = add_entry(
            &store,
            &FailingChat,
            &LlmConfig::default(),
            &EmbeddingConfig::default(),
            "u1",
            None,
            "just writing",
        )
        .await
        .unwrap();

        assert!(entry.sentiment.is_none());
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let store = MemoryStore::new();
        let err = add_entry(
            &store,
            &FailingChat,
            &LlmConfig::default(),
            &EmbeddingConfig::default(),
            "nobody",
            None,
            "text",
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no user"));
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let store = store_with_user().await;
        let err = add_entry(
            &store,
            &FailingChat,
            &LlmConfig::default(),
            &EmbeddingConfig::default(),
            "u1",
            None,
            "   ",
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }
}
