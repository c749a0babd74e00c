//! Suggestion reconciliation: dedup, persist, mark analyzed.
//!
//! The [`SuggestionEngine`] consumes generation output and turns it into
//! stored suggestions with AI provenance, enforcing the pipeline's
//! consistency invariants:
//!
//! - an entry is analyzed at most once (`analyzed` flag, checked up front,
//!   flipped as the terminal step);
//! - a suggestion whose normalized name (lowercase + trim) matches ANY
//!   existing item of the same kind — suggested or active — is skipped,
//!   never persisted;
//! - persistence failures propagate, leaving the entry unanalyzed so the
//!   next batch run retries it whole (at-least-once for the generation
//!   call, exactly-once intent per distinct suggestion name).
//!
//! Batch drivers catch per-entry and per-user errors, log, and keep going,
//! so one bad entry never halts a run. Entries are processed sequentially
//! per user: two concurrent generations for the same user could race the
//! read-then-write dedup check, and the sequential loop sidesteps that
//! without a transaction or lock.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{EmbeddingConfig, SuggestionsConfig};
use crate::llm::ChatProvider;
use crate::models::{
    Goal, Habit, JournalEntry, ProcessingResult, Task, DEFAULT_EXPLANATION, SOURCE_AI,
    STATUS_SUGGESTED,
};
use crate::retrieval::retrieve_similar_entries;
use crate::store::Store;
use crate::suggest::generate_combined_suggestions;

/// Lowercase + trim. The dedup comparison is exact normalized equality;
/// near-duplicate names are deliberately allowed.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The reconciliation engine. Holds its collaborators behind narrow
/// interfaces so it can run against fakes in tests.
pub struct SuggestionEngine {
    store: Arc<dyn Store>,
    chat: Arc<dyn ChatProvider>,
    embedding: EmbeddingConfig,
    config: SuggestionsConfig,
}

impl SuggestionEngine {
    pub fn new(
        store: Arc<dyn Store>,
        chat: Arc<dyn ChatProvider>,
        embedding: EmbeddingConfig,
        config: SuggestionsConfig,
    ) -> Self {
        Self {
            store,
            chat,
            embedding,
            config,
        }
    }

    /// Analyze a single entry and persist any new suggestions.
    ///
    /// Skips (with a zero result and no side effects) entries that are
    /// not journal entries or are already analyzed. Otherwise runs
    /// generation, deduplicates against the user's current items, persists
    /// survivors as suggested records, and finally marks the entry
    /// analyzed. A timeout on generation or a persistence failure
    /// propagates without marking, so the entry is retried next run.
    pub async fn process_single_entry(&self, entry: &JournalEntry) -> Result<ProcessingResult> {
        let mut result = ProcessingResult::default();

        // Chat turns are never analyzed
        if !entry.is_journal {
            return Ok(result);
        }

        // Idempotence: reprocessing an analyzed entry is a no-op
        if entry.analyzed {
            return Ok(result);
        }

        let user_id = &entry.user_id;

        // Fresh read each call so suggestions created by the previous
        // entry's pass are visible to this dedup check.
        let existing_goals = self.store.goals_by_user_id(user_id).await?;
        let existing_tasks = self.store.tasks_by_user_id(user_id).await?;
        let existing_habits = self.store.habits_by_user_id(user_id).await?;

        let related = retrieve_similar_entries(
            self.store.as_ref(),
            self.chat.as_ref(),
            &self.embedding,
            &entry.content,
            user_id,
            self.config.retrieval_limit,
        )
        .await;
        // Don't feed the entry back to itself as context
        let related: Vec<_> = related.into_iter().filter(|r| r.id != entry.id).collect();

        let batch = [entry.clone()];
        let suggestions = tokio::time::timeout(
            Duration::from_secs(self.config.generation_timeout_secs),
            generate_combined_suggestions(
                self.chat.as_ref(),
                &batch,
                &existing_goals,
                &existing_tasks,
                &existing_habits,
                &related,
            ),
        )
        .await
        .with_context(|| format!("suggestion generation timed out for entry {}", entry.id))?;

        let now = chrono::Utc::now().timestamp();

        let mut goal_names: HashSet<String> = existing_goals
            .iter()
            .map(|g| normalize_name(&g.name))
            .collect();

        for suggestion in &suggestions.goals {
            let normalized = normalize_name(&suggestion.name);
            if normalized.is_empty() || goal_names.contains(&normalized) {
                result.goals_skipped += 1;
                continue;
            }
            self.store
                .create_goal(&Goal {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.clone(),
                    name: suggestion.name.clone(),
                    description: suggestion.description.clone(),
                    category: suggestion
                        .category
                        .clone()
                        .unwrap_or_else(|| "Personal".to_string()),
                    status: STATUS_SUGGESTED.to_string(),
                    source: SOURCE_AI.to_string(),
                    ai_explanation: Some(
                        suggestion
                            .explanation
                            .clone()
                            .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string()),
                    ),
                    journal_entry_id: Some(entry.id.clone()),
                    created_at: now,
                })
                .await?;
            goal_names.insert(normalized);
            result.goals_created += 1;
        }

        let mut task_names: HashSet<String> = existing_tasks
            .iter()
            .map(|t| normalize_name(&t.title))
            .collect();

        for suggestion in &suggestions.tasks {
            let normalized = normalize_name(&suggestion.title);
            if normalized.is_empty() || task_names.contains(&normalized) {
                result.tasks_skipped += 1;
                continue;
            }
            self.store
                .create_task(&Task {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.clone(),
                    title: suggestion.title.clone(),
                    description: suggestion.description.clone(),
                    priority: suggestion
                        .priority
                        .clone()
                        .unwrap_or_else(|| "medium".to_string()),
                    status: STATUS_SUGGESTED.to_string(),
                    source: SOURCE_AI.to_string(),
                    ai_explanation: Some(
                        suggestion
                            .explanation
                            .clone()
                            .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string()),
                    ),
                    journal_entry_id: Some(entry.id.clone()),
                    created_at: now,
                })
                .await?;
            task_names.insert(normalized);
            result.tasks_created += 1;
        }

        let mut habit_names: HashSet<String> = existing_habits
            .iter()
            .map(|h| normalize_name(&h.title))
            .collect();

        for suggestion in &suggestions.habits {
            let normalized = normalize_name(&suggestion.title);
            if normalized.is_empty() || habit_names.contains(&normalized) {
                result.habits_skipped += 1;
                continue;
            }
            self.store
                .create_habit(&Habit {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.clone(),
                    title: suggestion.title.clone(),
                    description: suggestion.description.clone(),
                    frequency: suggestion
                        .frequency
                        .clone()
                        .unwrap_or_else(|| "daily".to_string()),
                    status: STATUS_SUGGESTED.to_string(),
                    source: SOURCE_AI.to_string(),
                    ai_explanation: Some(
                        suggestion
                            .explanation
                            .clone()
                            .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string()),
                    ),
                    journal_entry_id: Some(entry.id.clone()),
                    created_at: now,
                })
                .await?;
            habit_names.insert(normalized);
            result.habits_created += 1;
        }

        // Terminal step: even a run that produced nothing marks the entry,
        // so the batch never revisits it.
        self.store.mark_entry_analyzed(&entry.id).await?;

        info!(
            entry_id = %entry.id,
            user_id = %user_id,
            goals_created = result.goals_created,
            tasks_created = result.tasks_created,
            habits_created = result.habits_created,
            goals_skipped = result.goals_skipped,
            tasks_skipped = result.tasks_skipped,
            habits_skipped = result.habits_skipped,
            "entry reconciled"
        );

        Ok(result)
    }

    /// Process up to `max_entries` unanalyzed entries for one user,
    /// sequentially. Per-entry failures are logged and skipped; the entry
    /// stays unanalyzed and is retried on the next run.
    pub async fn process_all_entries_for_user(
        &self,
        user_id: &str,
        max_entries: Option<usize>,
    ) -> Result<ProcessingResult> {
        let limit = max_entries.unwrap_or(self.config.max_entries_per_user);
        let entries = self.store.unanalyzed_entries_by_user_id(user_id).await?;

        let mut total = ProcessingResult::default();

        for entry in entries.iter().take(limit) {
            match self.process_single_entry(entry).await {
                Ok(result) => total.add(&result),
                Err(e) => {
                    warn!(entry_id = %entry.id, user_id, error = %e,
                        "entry processing failed, will retry next run");
                }
            }
        }

        Ok(total)
    }

    /// Process unanalyzed entries for every user. Designed as a
    /// schedulable batch job; per-user failures are logged and skipped.
    pub async fn process_all_entries(&self, max_entries_per_user: Option<usize>) -> Result<()> {
        let users = self.store.get_all_users().await?;
        info!(user_count = users.len(), "batch suggestion run starting");

        for user in &users {
            match self
                .process_all_entries_for_user(&user.id, max_entries_per_user)
                .await
            {
                Ok(result) => {
                    if !result.is_zero() {
                        info!(
                            user_id = %user.id,
                            goals_created = result.goals_created,
                            tasks_created = result.tasks_created,
                            habits_created = result.habits_created,
                            "user batch complete"
                        );
                    }
                }
                Err(e) => {
                    warn!(user_id = %user.id, error = %e, "user batch failed, continuing");
                }
            }
        }

        Ok(())
    }
}
