//! Storage abstraction for Hope Log.
//!
//! The [`Store`] trait defines all storage operations needed by the
//! journaling and suggestion pipeline, enabling pluggable backends
//! (SQLite, in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Goal, Habit, JournalEntry, Sentiment, Task, User};

/// Abstract storage backend for Hope Log.
///
/// All operations are async (via `async-trait`). The in-memory
/// implementation returns immediately-ready futures.
///
/// # Operations
///
/// | Group | Methods |
/// |-------|---------|
/// | Users | [`create_user`](Store::create_user), [`get_user`](Store::get_user), [`get_all_users`](Store::get_all_users) |
/// | Entries | [`create_journal_entry`](Store::create_journal_entry), [`get_journal_entry`](Store::get_journal_entry), [`unanalyzed_entries_by_user_id`](Store::unanalyzed_entries_by_user_id), [`recent_entries_by_user_id`](Store::recent_entries_by_user_id), [`mark_entry_analyzed`](Store::mark_entry_analyzed), [`set_entry_sentiment`](Store::set_entry_sentiment) |
/// | Items | per-kind list / create / get / accept / delete-suggestion |
/// | Embeddings | [`upsert_entry_embedding`](Store::upsert_entry_embedding), [`journal_vectors_by_user_id`](Store::journal_vectors_by_user_id) |
#[async_trait]
pub trait Store: Send + Sync {
    // ── Users ──────────────────────────────────────────────────────

    async fn create_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// All users, in creation order. Used by the cross-user batch job.
    async fn get_all_users(&self) -> Result<Vec<User>>;

    // ── Journal entries ────────────────────────────────────────────

    async fn create_journal_entry(&self, entry: &JournalEntry) -> Result<()>;

    async fn get_journal_entry(&self, id: &str) -> Result<Option<JournalEntry>>;

    /// Entries with `analyzed = false`, oldest first, for batch processing.
    async fn unanalyzed_entries_by_user_id(&self, user_id: &str) -> Result<Vec<JournalEntry>>;

    /// Most recent durable journal entries (`is_journal AND NOT is_ai_response`),
    /// newest first. Used by the retrieval fallback tiers.
    async fn recent_entries_by_user_id(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<JournalEntry>>;

    /// Flip the `analyzed` flag — the terminal step of reconciliation.
    async fn mark_entry_analyzed(&self, id: &str) -> Result<()>;

    async fn set_entry_sentiment(&self, id: &str, sentiment: &Sentiment) -> Result<()>;

    // ── Goals ──────────────────────────────────────────────────────

    /// All goals for a user, suggested and active alike. The dedup check
    /// deliberately scans both.
    async fn goals_by_user_id(&self, user_id: &str) -> Result<Vec<Goal>>;

    async fn create_goal(&self, goal: &Goal) -> Result<()>;

    async fn get_goal(&self, id: &str) -> Result<Option<Goal>>;

    /// Promote a suggested goal to active. Returns the promoted record,
    /// or `None` when the id is absent or the goal is not in the
    /// `"suggested"` state (so a second accept observes NotFound).
    async fn accept_goal(&self, id: &str) -> Result<Option<Goal>>;

    /// Permanently delete a suggested goal. Returns `false` when the id
    /// is absent or not in the `"suggested"` state.
    async fn delete_suggested_goal(&self, id: &str) -> Result<bool>;

    // ── Tasks ──────────────────────────────────────────────────────

    async fn tasks_by_user_id(&self, user_id: &str) -> Result<Vec<Task>>;

    async fn create_task(&self, task: &Task) -> Result<()>;

    async fn get_task(&self, id: &str) -> Result<Option<Task>>;

    async fn accept_task(&self, id: &str) -> Result<Option<Task>>;

    async fn delete_suggested_task(&self, id: &str) -> Result<bool>;

    // ── Habits ─────────────────────────────────────────────────────

    async fn habits_by_user_id(&self, user_id: &str) -> Result<Vec<Habit>>;

    async fn create_habit(&self, habit: &Habit) -> Result<()>;

    async fn get_habit(&self, id: &str) -> Result<Option<Habit>>;

    async fn accept_habit(&self, id: &str) -> Result<Option<Habit>>;

    async fn delete_suggested_habit(&self, id: &str) -> Result<bool>;

    // ── Embeddings ─────────────────────────────────────────────────

    async fn upsert_entry_embedding(
        &self,
        entry_id: &str,
        user_id: &str,
        model: &str,
        dims: usize,
        vector: &[f32],
    ) -> Result<()>;

    /// Stored vectors for a user's durable journal entries, paired with
    /// the entries themselves for similarity ranking.
    async fn journal_vectors_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Vec<(JournalEntry, Vec<f32>)>>;
}
