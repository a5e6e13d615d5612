//! Usage counters behind the `InsightSink` trait.

use super::Store;
use async_trait::async_trait;
use quill_core::{
    error::QuillError,
    traits::{InsightSink, UsageMetric},
};

impl Store {
    async fn bump_stat(&self, user_id: &str, column: &str) -> Result<(), QuillError> {
        // Column names are fixed by the match in `record`, never caller input.
        sqlx::query(&format!(
            "INSERT INTO usage_stats (user_id, {column}) VALUES (?, 1) \
             ON CONFLICT(user_id) DO UPDATE SET {column} = {column} + 1, \
             updated_at = datetime('now')"
        ))
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("bump {column} failed: {e}")))?;

        Ok(())
    }

    /// Current counters for a user:
    /// `(fragments_recorded, fragments_absorbed, insights_generated)`.
    pub async fn usage_stats(&self, user_id: &str) -> Result<(i64, i64, i64), QuillError> {
        let row: Option<(i64, i64, i64)> = sqlx::query_as(
            "SELECT fragments_recorded, fragments_absorbed, insights_generated \
             FROM usage_stats WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("usage stats failed: {e}")))?;

        Ok(row.unwrap_or((0, 0, 0)))
    }
}

#[async_trait]
impl InsightSink for Store {
    async fn record(&self, user_id: &str, metric: UsageMetric) -> Result<(), QuillError> {
        let column = match metric {
            UsageMetric::FragmentRecorded => "fragments_recorded",
            UsageMetric::FragmentAbsorbed => "fragments_absorbed",
            UsageMetric::InsightGenerated => "insights_generated",
        };
        self.bump_stat(user_id, column).await
    }
}
