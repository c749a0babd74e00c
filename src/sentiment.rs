//! Inline sentiment analysis and lightweight goal/task extraction.
//!
//! Runs synchronously when a journal entry is saved. This path must never
//! block journaling: any failure — API error, malformed model output —
//! degrades to a neutral default instead of surfacing an error.

use serde::Deserialize;
use tracing::warn;

use crate::llm::ChatProvider;

/// Result of analyzing one entry's text.
#[derive(Debug, Clone, Deserialize)]
pub struct SentimentAnalysis {
    /// 1 (very negative) to 5 (very positive).
    #[serde(default = "neutral_score")]
    pub score: i64,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub goals: Vec<ExtractedGoal>,
    #[serde(default)]
    pub tasks: Vec<ExtractedTask>,
}

/// A goal candidate spotted in the entry text.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedGoal {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub completion: Option<f64>,
}

/// A task candidate spotted in the entry text.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedTask {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn neutral_score() -> i64 {
    3
}

impl SentimentAnalysis {
    /// The fallback when analysis cannot run: neutral score, unknown tags.
    pub fn neutral() -> Self {
        Self {
            score: 3,
            emotions: vec!["unknown".to_string()],
            themes: vec!["unknown".to_string()],
            goals: Vec::new(),
            tasks: Vec::new(),
        }
    }
}

const SYSTEM_PROMPT: &str = "You are a sentiment analysis expert for a \
mental-wellness journal. Analyze the text and respond with JSON only:\n\
{\n\
  \"score\": <1-5, 1 very negative, 5 very positive>,\n\
  \"emotions\": [<top 3 emotions expressed>],\n\
  \"themes\": [<up to 3 key themes>],\n\
  \"goals\": [{\"name\": ..., \"is_new\": <bool>, \"completion\": <0-100 or null>}],\n\
  \"tasks\": [{\"name\": ..., \"description\": ...}]\n\
}\n\
Tasks are single, quick, concrete actions completable in one sitting. \
Goals are multi-step achievements over a longer horizon. Do not report a \
task as a goal or vice versa.";

/// Analyze entry text, returning the neutral default on any failure.
pub async fn analyze_sentiment(chat: &dyn ChatProvider, text: &str) -> SentimentAnalysis {
    let json = match chat.complete_json(SYSTEM_PROMPT, text).await {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "sentiment analysis failed, using neutral default");
            return SentimentAnalysis::neutral();
        }
    };

    let mut analysis: SentimentAnalysis = match serde_json::from_value(json) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(error = %e, "sentiment response failed validation, using neutral default");
            return SentimentAnalysis::neutral();
        }
    };

    analysis.score = analysis.score.clamp(1, 5);
    analysis
}
