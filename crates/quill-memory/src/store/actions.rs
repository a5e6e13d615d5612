//! User action decisions (approve/decline), written by external surfaces
//! and read here as one of the dispatcher's bounded context windows.

use super::Store;
use quill_core::error::QuillError;
use uuid::Uuid;

/// One recorded action decision.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserAction {
    pub id: String,
    pub user_id: String,
    pub action_id: String,
    /// "approved" or "declined".
    pub decision: String,
    pub context: Option<String>,
    pub created_at: String,
}

impl Store {
    /// Record one decision. Returns its id.
    pub async fn record_action(
        &self,
        user_id: &str,
        action_id: &str,
        decision: &str,
        context: Option<&str>,
    ) -> Result<String, QuillError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO user_actions (id, user_id, action_id, decision, context) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(action_id)
        .bind(decision)
        .bind(context)
        .execute(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("record action failed: {e}")))?;

        Ok(id)
    }

    /// Most recent action decisions for a user.
    pub async fn recent_actions(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<UserAction>, QuillError> {
        let rows: Vec<UserAction> = sqlx::query_as(
            "SELECT id, user_id, action_id, decision, context, created_at FROM user_actions \
             WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("recent actions failed: {e}")))?;

        Ok(rows)
    }
}
