use serde::{Deserialize, Serialize};

/// Context assembled for one scheduled generation call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InsightRequest {
    /// The schedule's free-form instruction. `None` or empty means the
    /// Oracle should find the most insightful thing on its own.
    pub action_description: Option<String>,
    /// Recent deduplicated typing fragments, already rendered with their
    /// logged timestamps.
    pub typing_history: Vec<String>,
    /// Recent memory entries, rendered with timestamps.
    pub memories: Vec<String>,
    /// Recent action decisions, rendered as `DECISION: context at time`.
    pub action_history: Vec<String>,
    /// Local wall-clock time at generation, `YYYY-MM-DD HH:MM:SS`.
    pub current_time: String,
}

/// One generated insight, as decoded from the Oracle.
///
/// Ephemeral: persisted only as a memory row by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedInsight {
    pub title: String,
    pub short_description: String,
    /// Markdown body stored in the memory sink.
    pub full_result: String,
}

impl GeneratedInsight {
    /// Deterministic stand-in used when the Oracle is unreachable or its
    /// payload is malformed. A committed firing always leaves an artifact.
    pub fn standing_by(schedule_title: &str) -> Self {
        Self {
            title: if schedule_title.is_empty() {
                "Scheduled Update".to_string()
            } else {
                schedule_title.to_string()
            },
            short_description: "I'm standing by — I couldn't reach the model this time.".to_string(),
            full_result: "No insight could be generated for this scheduled moment. \
                          The next firing will try again."
                .to_string(),
        }
    }
}
