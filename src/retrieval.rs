//! Semantic retrieval over a user's past journal entries.
//!
//! Used by suggestion generation to pull extra context beyond the entry
//! being analyzed (retrieval-augmented generation). Retrieval is organized
//! as an explicit ordered list of tiers rather than nested error handling:
//! each tier either yields ranked entries, declines (`None`), or fails,
//! and the orchestrator walks the list until one yields.
//!
//! Tiers, in order:
//! 1. **Embedding search** — embed the query, cosine-rank the user's stored
//!    journal vectors, take the top `limit`. Declines when no embedding
//!    provider is configured or no vectors exist.
//! 2. **LLM re-rank** — load the 10 most recent journal entries; if they
//!    already fit within `limit`, return them all with synthetic descending
//!    scores; otherwise ask the chat model for a relevance ranking of entry
//!    indices and map back.
//! 3. **Recency** — the most recent `limit` entries with synthetic scores.
//!
//! The whole function is read-only and never propagates external failures:
//! it returns an empty list only when every tier fails or the user has no
//! qualifying entries.

use anyhow::Result;
use tracing::warn;

use crate::config::EmbeddingConfig;
use crate::embedding::{self, cosine_similarity};
use crate::llm::ChatProvider;
use crate::models::{JournalEntry, SimilarEntry};
use crate::store::Store;

/// How many recent entries the non-embedding tiers consider.
const RECENT_POOL_SIZE: usize = 10;

/// One tier of the retrieval fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    EmbeddingSearch,
    LlmRerank,
    Recency,
}

const TIERS: [Tier; 3] = [Tier::EmbeddingSearch, Tier::LlmRerank, Tier::Recency];

/// Retrieve up to `limit` past entries most relevant to `query`.
pub async fn retrieve_similar_entries(
    store: &dyn Store,
    chat: &dyn ChatProvider,
    embedding_cfg: &EmbeddingConfig,
    query: &str,
    user_id: &str,
    limit: usize,
) -> Vec<SimilarEntry> {
    if limit == 0 {
        return Vec::new();
    }

    for tier in TIERS {
        let outcome = match tier {
            Tier::EmbeddingSearch => {
                embedding_search(store, embedding_cfg, query, user_id, limit).await
            }
            Tier::LlmRerank => llm_rerank(store, chat, query, user_id, limit).await,
            Tier::Recency => recency(store, user_id, limit).await,
        };

        match outcome {
            Ok(Some(entries)) if !entries.is_empty() => return entries,
            Ok(_) => {}
            Err(e) => {
                warn!(user_id, ?tier, error = %e, "retrieval tier failed, trying next");
            }
        }
    }

    Vec::new()
}

/// Tier 1: cosine similarity over stored journal embeddings.
async fn embedding_search(
    store: &dyn Store,
    embedding_cfg: &EmbeddingConfig,
    query: &str,
    user_id: &str,
    limit: usize,
) -> Result<Option<Vec<SimilarEntry>>> {
    if !embedding_cfg.is_enabled() {
        return Ok(None);
    }

    let provider = embedding::create_provider(embedding_cfg)?;
    let query_vec = embedding::embed_query(provider.as_ref(), embedding_cfg, query).await?;

    let vectors = store.journal_vectors_by_user_id(user_id).await?;
    if vectors.is_empty() {
        return Ok(None);
    }

    let mut ranked: Vec<SimilarEntry> = vectors
        .into_iter()
        .map(|(entry, vec)| SimilarEntry {
            similarity: cosine_similarity(&query_vec, &vec),
            id: entry.id,
            content: entry.content,
            date: entry.date,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);

    Ok(Some(ranked))
}

/// Synthetic descending score for rank `i`: 1.0, 0.9, 0.8, ...
fn synthetic_score(rank: usize) -> f32 {
    1.0 - 0.1 * rank as f32
}

fn with_synthetic_scores(entries: Vec<JournalEntry>) -> Vec<SimilarEntry> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| SimilarEntry {
            similarity: synthetic_score(i),
            id: entry.id,
            content: entry.content,
            date: entry.date,
        })
        .collect()
}

/// Tier 2: ask the chat model to rank the recent pool by relevance.
async fn llm_rerank(
    store: &dyn Store,
    chat: &dyn ChatProvider,
    query: &str,
    user_id: &str,
    limit: usize,
) -> Result<Option<Vec<SimilarEntry>>> {
    let recent = store
        .recent_entries_by_user_id(user_id, RECENT_POOL_SIZE)
        .await?;

    if recent.is_empty() {
        return Ok(None);
    }

    // Nothing to rank when the pool already fits
    if recent.len() <= limit {
        return Ok(Some(with_synthetic_scores(recent)));
    }

    let listing = recent
        .iter()
        .enumerate()
        .map(|(i, e)| format!("[{}] {}", i, e.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let system = "You rank journal entries by relevance to a query. \
        Given a numbered list of entries and a query, respond with JSON only, \
        of the form {\"indices\": [..]} — the entry indices ordered from most \
        to least relevant.";
    let user = format!("Query: {}\n\nEntries:\n{}", query, listing);

    let json = chat.complete_json(system, &user).await?;
    let indices: Vec<usize> = json
        .get("indices")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_u64())
                .map(|v| v as usize)
                .filter(|&i| i < recent.len())
                .collect()
        })
        .unwrap_or_default();

    if indices.is_empty() {
        anyhow::bail!("re-rank response contained no usable indices");
    }

    let mut seen = std::collections::HashSet::new();
    let picked: Vec<JournalEntry> = indices
        .into_iter()
        .filter(|i| seen.insert(*i))
        .take(limit)
        .map(|i| recent[i].clone())
        .collect();

    Ok(Some(with_synthetic_scores(picked)))
}

/// Tier 3: most recent entries, no ranking beyond recency.
async fn recency(
    store: &dyn Store,
    user_id: &str,
    limit: usize,
) -> Result<Option<Vec<SimilarEntry>>> {
    let recent = store.recent_entries_by_user_id(user_id, limit).await?;
    if recent.is_empty() {
        return Ok(None);
    }
    Ok(Some(with_synthetic_scores(recent)))
}
