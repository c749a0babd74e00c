//! Suggestion generation from journal entry batches.
//!
//! Builds a single prompt combining the entries under analysis, the user's
//! existing goals/tasks/habits (a best-effort hint against semantic
//! duplicates — the reconciliation engine still re-checks), optional
//! retrieved context from past entries, and the classification guidelines
//! shared with sentiment extraction:
//!
//! - **task** — single concrete action completable in hours
//! - **goal** — multi-step achievement over a longer horizon
//! - **habit** — behavior on a recurring cadence
//!
//! Model output is parsed into a typed [`SuggestionBundle`]; malformed
//! fields fall back to serde defaults and an outright failure yields an
//! all-empty bundle. Callers treat empty as "nothing new", never an error.

use tracing::warn;

use crate::llm::ChatProvider;
use crate::models::{Goal, Habit, JournalEntry, SimilarEntry, SuggestionBundle, Task};

const SYSTEM_PROMPT: &str = "You help a mental-wellness journal surface goals, \
tasks, and habits from journal entries. Classify carefully:\n\
- A task is a single, concrete action completable within hours.\n\
- A goal is a multi-step achievement pursued over weeks or months.\n\
- A habit is a behavior repeated on a recurring cadence (daily, weekly).\n\
Do not suggest items that duplicate the user's existing ones.\n\
Respond with JSON only:\n\
{\n\
  \"goals\": [{\"name\": ..., \"description\": ..., \"category\": ..., \"explanation\": ...}],\n\
  \"tasks\": [{\"title\": ..., \"description\": ..., \"priority\": \"low|medium|high\", \"explanation\": ...}],\n\
  \"habits\": [{\"title\": ..., \"description\": ..., \"frequency\": \"daily|weekly|monthly\", \"explanation\": ...}]\n\
}\n\
Each explanation should briefly tie the suggestion back to the journal text. \
Return empty arrays when the entries contain nothing actionable.";

/// Generate classified suggestions for a batch of entries.
///
/// Returns an empty bundle on any failure — generation is best-effort
/// and must never abort the caller's pipeline.
pub async fn generate_combined_suggestions(
    chat: &dyn ChatProvider,
    entries: &[JournalEntry],
    existing_goals: &[Goal],
    existing_tasks: &[Task],
    existing_habits: &[Habit],
    related: &[SimilarEntry],
) -> SuggestionBundle {
    if entries.is_empty() {
        return SuggestionBundle::default();
    }

    let prompt = build_prompt(entries, existing_goals, existing_tasks, existing_habits, related);

    let json = match chat.complete_json(SYSTEM_PROMPT, &prompt).await {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "suggestion generation failed, returning empty bundle");
            return SuggestionBundle::default();
        }
    };

    match serde_json::from_value(json) {
        Ok(bundle) => bundle,
        Err(e) => {
            warn!(error = %e, "suggestion response failed validation, returning empty bundle");
            SuggestionBundle::default()
        }
    }
}

fn build_prompt(
    entries: &[JournalEntry],
    existing_goals: &[Goal],
    existing_tasks: &[Task],
    existing_habits: &[Habit],
    related: &[SimilarEntry],
) -> String {
    let mut prompt = String::from("Journal entries to analyze:\n");
    for entry in entries {
        prompt.push_str(&format!("- {}\n", entry.content));
    }

    if !related.is_empty() {
        prompt.push_str("\nRelated past entries (context only, do not re-analyze):\n");
        for r in related {
            prompt.push_str(&format!("- {}\n", r.content));
        }
    }

    prompt.push_str("\nExisting goals:\n");
    if existing_goals.is_empty() {
        prompt.push_str("(none)\n");
    }
    for g in existing_goals {
        prompt.push_str(&format!("- {} [{}]\n", g.name, g.category));
    }

    prompt.push_str("\nExisting tasks:\n");
    if existing_tasks.is_empty() {
        prompt.push_str("(none)\n");
    }
    for t in existing_tasks {
        prompt.push_str(&format!("- {} [{}]\n", t.title, t.priority));
    }

    prompt.push_str("\nExisting habits:\n");
    if existing_habits.is_empty() {
        prompt.push_str("(none)\n");
    }
    for h in existing_habits {
        prompt.push_str(&format!("- {} [{}]\n", h.title, h.frequency));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
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

    fn entry(content: &str) -> JournalEntry {
        JournalEntry {
            id: "e1".to_string(),
            user_id: "u1".to_string(),
            title: None,
            content: content.to_string(),
            date: 1_700_000_000,
            is_journal: true,
            is_ai_response: false,
            analyzed: false,
            sentiment: None,
        }
    }

    #[tokio::test]
    async fn test_parses_all_three_kinds() {
        let chat = CannedChat(serde_json::json!({
            "goals": [{"name": "Learn Spanish", "category": "Learning", "explanation": "mentioned wanting to"}],
            "tasks": [{"title": "Book dentist appointment", "priority": "high"}],
            "habits": [{"title": "Morning walk", "frequency": "daily"}]
        }));
        let bundle =
            generate_combined_suggestions(&chat, &[entry("text")], &[], &[], &[], &[]).await;
        assert_eq!(bundle.goals.len(), 1);
        assert_eq!(bundle.tasks.len(), 1);
        assert_eq!(bundle.habits.len(), 1);
        assert_eq!(bundle.goals[0].name, "Learn Spanish");
        assert_eq!(bundle.tasks[0].priority.as_deref(), Some("high"));
    }

    #[tokio::test]
    async fn test_missing_arrays_default_empty() {
        let chat = CannedChat(serde_json::json!({ "goals": [{"name": "X"}] }));
        let bundle =
            generate_combined_suggestions(&chat, &[entry("text")], &[], &[], &[], &[]).await;
        assert_eq!(bundle.goals.len(), 1);
        assert!(bundle.tasks.is_empty());
        assert!(bundle.habits.is_empty());
    }

    #[tokio::test]
    async fn test_failure_yields_empty_bundle() {
        let bundle =
            generate_combined_suggestions(&FailingChat, &[entry("text")], &[], &[], &[], &[])
                .await;
        assert!(bundle.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        // FailingChat would error if consulted
        let bundle = generate_combined_suggestions(&FailingChat, &[], &[], &[], &[], &[]).await;
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_prompt_lists_existing_items() {
        let goal = Goal {
            id: "g1".to_string(),
            user_id: "u1".to_string(),
            name: "Learn Spanish".to_string(),
            description: None,
            category: "Learning".to_string(),
            status: "active".to_string(),
            source: "user".to_string(),
            ai_explanation: None,
            journal_entry_id: None,
            created_at: 0,
        };
        let prompt = build_prompt(&[entry("hola")], &[goal], &[], &[], &[]);
        assert!(prompt.contains("Learn Spanish [Learning]"));
        assert!(prompt.contains("hola"));
        assert!(prompt.contains("(none)"));
    }
}
