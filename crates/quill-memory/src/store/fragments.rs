//! Deduplicated typing fragments: atomic upsert, absorption lookup, and
//! the absorption overwrite.

use super::Store;
use quill_core::error::QuillError;
use uuid::Uuid;

/// One deduplicated intent entry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TypingFragment {
    pub id: String,
    pub user_id: String,
    pub app_context: String,
    /// Latest surface text for this intent.
    pub content: String,
    pub fingerprint: Option<String>,
    pub frequency: i64,
    pub created_at: String,
    pub updated_at: String,
}

const FRAGMENT_COLUMNS: &str =
    "id, user_id, app_context, content, fingerprint, frequency, created_at, updated_at";

impl Store {
    /// Upsert a fragment by `(user_id, app_context, fingerprint)`.
    ///
    /// A single statement so concurrent writers on the same intent cannot
    /// lose an increment: existing rows get `frequency + 1`, the latest
    /// surface text, and a fresh `updated_at`; new intents start at 1.
    pub async fn upsert_fragment(
        &self,
        user_id: &str,
        app_context: &str,
        content: &str,
        fingerprint: &str,
    ) -> Result<(), QuillError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO typing_fragments (id, user_id, app_context, content, fingerprint) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(user_id, app_context, fingerprint) \
             DO UPDATE SET frequency = frequency + 1, \
                           content = excluded.content, \
                           updated_at = datetime('now')",
        )
        .bind(&id)
        .bind(user_id)
        .bind(app_context)
        .bind(content)
        .bind(fingerprint)
        .execute(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("upsert fragment failed: {e}")))?;

        Ok(())
    }

    /// The absorption candidate: most recently updated fragment for this
    /// `(user_id, app_context)` whose `updated_at` is within the window.
    pub async fn absorption_candidate(
        &self,
        user_id: &str,
        app_context: &str,
        window_secs: i64,
    ) -> Result<Option<TypingFragment>, QuillError> {
        let cutoff = format!("-{window_secs} seconds");
        let row: Option<TypingFragment> = sqlx::query_as(&format!(
            "SELECT {FRAGMENT_COLUMNS} FROM typing_fragments \
             WHERE user_id = ? AND app_context = ? \
             AND updated_at >= datetime('now', ?) \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(app_context)
        .bind(&cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("absorption lookup failed: {e}")))?;

        Ok(row)
    }

    /// Absorb a longer continuation into an existing fragment: overwrite
    /// content and fingerprint, refresh `updated_at`, leave `frequency`
    /// untouched.
    pub async fn absorb_fragment(
        &self,
        id: &str,
        content: &str,
        fingerprint: Option<&str>,
    ) -> Result<(), QuillError> {
        let result = sqlx::query(
            "UPDATE typing_fragments \
             SET content = ?, fingerprint = ?, updated_at = datetime('now') \
             WHERE id = ?",
        )
        .bind(content)
        .bind(fingerprint)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("absorb fragment failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(QuillError::StorageConflict(format!(
                "fragment {id} vanished before absorption"
            )));
        }
        Ok(())
    }

    /// Most recently updated fragments for a user, across all contexts.
    pub async fn recent_fragments(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<TypingFragment>, QuillError> {
        let rows: Vec<TypingFragment> = sqlx::query_as(&format!(
            "SELECT {FRAGMENT_COLUMNS} FROM typing_fragments \
             WHERE user_id = ? ORDER BY updated_at DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("recent fragments failed: {e}")))?;

        Ok(rows)
    }

    /// All fragments for one `(user_id, app_context)`, newest first.
    pub async fn fragments_for_context(
        &self,
        user_id: &str,
        app_context: &str,
    ) -> Result<Vec<TypingFragment>, QuillError> {
        let rows: Vec<TypingFragment> = sqlx::query_as(&format!(
            "SELECT {FRAGMENT_COLUMNS} FROM typing_fragments \
             WHERE user_id = ? AND app_context = ? ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .bind(app_context)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("fragments query failed: {e}")))?;

        Ok(rows)
    }
}
