use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inbound typing event surfaced from a client.
///
/// This is the shape the transport layer hands to the ingestion engine:
/// `{user_id, app_context, text, is_full_snapshot}`. Full-window snapshots
/// exist only for downstream analysis reads and are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingEvent {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Owner of the fragment stream.
    pub user_id: String,
    /// Opaque source tag (e.g. the app the user was typing in).
    pub app_context: String,
    /// Raw text as surfaced by the client.
    pub text: String,
    #[serde(default)]
    pub is_full_snapshot: bool,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TypingEvent {
    /// Create an event for the common non-snapshot case.
    pub fn new(user_id: &str, app_context: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            app_context: app_context.to_string(),
            text: text.to_string(),
            is_full_snapshot: false,
            timestamp: Utc::now(),
        }
    }

    /// The serialization key for per-user, per-context ordering.
    pub fn ingest_key(&self) -> String {
        format!("{}:{}", self.user_id, self.app_context)
    }
}
