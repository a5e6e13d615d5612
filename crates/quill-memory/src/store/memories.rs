//! Append-only memory sink.

use super::Store;
use quill_core::error::QuillError;
use uuid::Uuid;

/// One memory entry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemoryEntry {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub source_tag: String,
    pub created_at: String,
}

impl Store {
    /// Append a memory entry. Returns its id.
    pub async fn store_memory(
        &self,
        user_id: &str,
        content: &str,
        source_tag: &str,
    ) -> Result<String, QuillError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO memories (id, user_id, content, source_tag) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(content)
        .bind(source_tag)
        .execute(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("store memory failed: {e}")))?;

        Ok(id)
    }

    /// Most recent memories for a user.
    pub async fn recent_memories(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<MemoryEntry>, QuillError> {
        let rows: Vec<MemoryEntry> = sqlx::query_as(
            "SELECT id, user_id, content, source_tag, created_at FROM memories \
             WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QuillError::Storage(format!("recent memories failed: {e}")))?;

        Ok(rows)
    }
}
