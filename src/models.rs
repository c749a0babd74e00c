//! Core data models used throughout Hope Log.
//!
//! These types represent the users, journal entries, and goal/task/habit
//! records that flow through the journaling and suggestion pipeline.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an AI suggestion awaiting user review.
pub const STATUS_SUGGESTED: &str = "suggested";
/// Lifecycle status of a live, user-owned item.
pub const STATUS_ACTIVE: &str = "active";

/// Provenance marker for AI-generated records.
pub const SOURCE_AI: &str = "ai";
/// Provenance marker for user-created records.
pub const SOURCE_USER: &str = "user";

/// Fallback rationale attached to a suggestion when the model supplies none.
pub const DEFAULT_EXPLANATION: &str = "Generated from your journal entries";

/// A registered user.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: i64,
}

/// A journal entry (or chat turn) owned by a user.
///
/// `is_journal` distinguishes durable journal entries from ephemeral chat
/// turns; only journal entries are ever analyzed for suggestions.
/// `analyzed` records whether suggestion extraction has run, so the batch
/// pipeline never reprocesses an entry.
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub content: String,
    /// Unix timestamp (seconds).
    pub date: i64,
    pub is_journal: bool,
    pub is_ai_response: bool,
    pub analyzed: bool,
    pub sentiment: Option<Sentiment>,
}

/// Sentiment attached to a journal entry after analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentiment {
    /// 1 (very negative) to 5 (very positive).
    pub score: i64,
    pub emotions: Vec<String>,
    pub themes: Vec<String>,
}

/// A goal record. Suggested AI goals and active user goals share this shape,
/// discriminated by `status` and `source`.
#[derive(Debug, Clone, Serialize)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub status: String,
    pub source: String,
    pub ai_explanation: Option<String>,
    /// Provenance back-reference to the originating entry (display only).
    pub journal_entry_id: Option<String>,
    pub created_at: i64,
}

/// A task record (single, quick, concrete action).
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub source: String,
    pub ai_explanation: Option<String>,
    pub journal_entry_id: Option<String>,
    pub created_at: i64,
}

/// A habit record (recurring cadence).
#[derive(Debug, Clone, Serialize)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub frequency: String,
    pub status: String,
    pub source: String,
    pub ai_explanation: Option<String>,
    pub journal_entry_id: Option<String>,
    pub created_at: i64,
}

/// A past entry retrieved as semantic context for suggestion generation.
#[derive(Debug, Clone)]
pub struct SimilarEntry {
    pub id: String,
    pub content: String,
    pub date: i64,
    pub similarity: f32,
}

/// Per-run aggregate returned by each reconciliation call.
///
/// Purely a return value — never persisted. Batch drivers sum results
/// across entries with [`ProcessingResult::add`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingResult {
    pub goals_created: u64,
    pub tasks_created: u64,
    pub habits_created: u64,
    pub goals_skipped: u64,
    pub tasks_skipped: u64,
    pub habits_skipped: u64,
}

impl ProcessingResult {
    pub fn add(&mut self, other: &ProcessingResult) {
        self.goals_created += other.goals_created;
        self.tasks_created += other.tasks_created;
        self.habits_created += other.habits_created;
        self.goals_skipped += other.goals_skipped;
        self.tasks_skipped += other.tasks_skipped;
        self.habits_skipped += other.habits_skipped;
    }

    pub fn is_zero(&self) -> bool {
        *self == ProcessingResult::default()
    }
}

/// A goal candidate produced by the generation service.
#[derive(Debug, Clone, Deserialize)]
pub struct GoalSuggestion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// A task candidate produced by the generation service.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSuggestion {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// A habit candidate produced by the generation service.
#[derive(Debug, Clone, Deserialize)]
pub struct HabitSuggestion {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Classified output of one generation call.
///
/// Every field defaults to empty so malformed model output degrades to
/// "nothing new" instead of a downstream error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionBundle {
    #[serde(default)]
    pub goals: Vec<GoalSuggestion>,
    #[serde(default)]
    pub tasks: Vec<TaskSuggestion>,
    #[serde(default)]
    pub habits: Vec<HabitSuggestion>,
}

impl SuggestionBundle {
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty() && self.tasks.is_empty() && self.habits.is_empty()
    }
}
