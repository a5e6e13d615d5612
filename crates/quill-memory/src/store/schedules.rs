//! Schedule rows and the atomic firing claim.
//!
//! Schedule CRUD belongs to external surfaces; it lives here so tests and
//! seeding can exercise the dispatcher. The dispatcher itself only ever
//! reads schedules and advances `last_fired_at`.

use super::Store;
use chrono::{DateTime, Utc};
use quill_core::error::QuillError;
use uuid::Uuid;

/// One recurring or one-shot generation trigger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Schedule {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Free-form instruction handed to the Oracle; empty means "find
    /// something insightful".
    pub action_description: Option<String>,
    /// IANA name; empty is treated as UTC.
    pub timezone: String,
    /// "Everyday", a weekday name, or a `YYYY-MM-DD` date.
    pub recurrence: String,
    /// Local `HH:mm`.
    pub time_of_day: String,
    /// UTC `YYYY-MM-DD HH:MM:SS`, set durably before generation runs.
    pub last_fired_at: Option<String>,
    pub created_at: String,
}

const SCHEDULE_COLUMNS: &str =
    "id, user_id, title, action_description, timezone, recurrence, time_of_day, last_fired_at, created_at";

impl Store {
    /// Create a schedule. Returns its id.
    pub async fn create_schedule(
        &self,
        user_id: &str,
        title: &str,
        action_description: Option<&str>,
        timezone: &str,
        recurrence: &str,
        time_of_day: &str,
    ) -> Result<String, QuillError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO schedules (id, user_id, title, action_description, timezone, recurrence, time_of_day) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(action_description)
        .bind(timezone)
        .bind(recurrence)
        .bind(time_of_day)
        .execute(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("create schedule failed: {e}")))?;

        Ok(id)
    }

    /// All schedules, every one evaluated on every tick.
    pub async fn all_schedules(&self) -> Result<Vec<Schedule>, QuillError> {
        let rows: Vec<Schedule> =
            sqlx::query_as(&format!("SELECT {SCHEDULE_COLUMNS} FROM schedules"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| QuillError::Storage(format!("get schedules failed: {e}")))?;

        Ok(rows)
    }

    /// Fetch one schedule by id.
    pub async fn get_schedule(&self, id: &str) -> Result<Option<Schedule>, QuillError> {
        let row: Option<Schedule> =
            sqlx::query_as(&format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| QuillError::Storage(format!("get schedule failed: {e}")))?;

        Ok(row)
    }

    /// Delete a schedule. Returns `true` if a row was removed.
    pub async fn delete_schedule(&self, id: &str) -> Result<bool, QuillError> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| QuillError::Storage(format!("delete schedule failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Claim one firing minute for a schedule.
    ///
    /// Single-row conditional update: succeeds only when `last_fired_at`
    /// is unset or strictly before the start of the current minute, so
    /// concurrent dispatcher processes cannot both claim the same minute.
    /// The commit is durable before any generation work starts; it is
    /// never rolled back on a failed firing.
    pub async fn claim_firing(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, QuillError> {
        let fired_at = now.format("%Y-%m-%d %H:%M:%S").to_string();
        let minute_start = now.format("%Y-%m-%d %H:%M:00").to_string();

        let result = sqlx::query(
            "UPDATE schedules SET last_fired_at = ? \
             WHERE id = ? AND (last_fired_at IS NULL OR last_fired_at < ?)",
        )
        .bind(&fired_at)
        .bind(id)
        .bind(&minute_start)
        .execute(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("claim firing failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
