use sqlx::{sqlite::SqliteRow, Row};

use leadflow_core::domain::conversation::{
    ConversationId, ConversationMessage, ConversationState, ConversationStatus, MessageRole,
};
use leadflow_core::domain::lead::LeadId;

use super::lead::parse_timestamp;
use super::{ConversationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn find_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<ConversationState>, RepositoryError> {
        let Some(row) = sqlx::query(
            "SELECT id, contact_handle, lead_id, status, needs_human, created_at, updated_at
             FROM conversations
             WHERE contact_handle = ?",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let mut conversation = conversation_from_row(row)?;

        let message_rows = sqlx::query(
            "SELECT role, content, position, created_at
             FROM conversation_messages
             WHERE conversation_id = ?
             ORDER BY position ASC",
        )
        .bind(&conversation.id.0)
        .fetch_all(&self.pool)
        .await?;

        conversation.messages =
            message_rows.into_iter().map(message_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(Some(conversation))
    }

    async fn save(&self, conversation: ConversationState) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversations (
                id, contact_handle, lead_id, status, needs_human, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                contact_handle = excluded.contact_handle,
                lead_id = excluded.lead_id,
                status = excluded.status,
                needs_human = excluded.needs_human,
                updated_at = excluded.updated_at",
        )
        .bind(&conversation.id.0)
        .bind(&conversation.contact_handle)
        .bind(&conversation.lead_id.0)
        .bind(conversation.status.as_str())
        .bind(conversation.needs_human)
        .bind(conversation.created_at.to_rfc3339())
        .bind(conversation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        // History is append-only and positions are immutable, so replayed
        // saves are no-ops and only new positions land.
        for message in &conversation.messages {
            sqlx::query(
                "INSERT OR IGNORE INTO conversation_messages (
                    conversation_id, position, role, content, created_at
                 ) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&conversation.id.0)
            .bind(message.position)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(message.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}

fn conversation_from_row(row: SqliteRow) -> Result<ConversationState, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = ConversationStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown conversation status `{status_raw}`"))
    })?;

    Ok(ConversationState {
        id: ConversationId(row.try_get("id")?),
        contact_handle: row.try_get("contact_handle")?,
        lead_id: LeadId(row.try_get("lead_id")?),
        status,
        needs_human: row.try_get("needs_human")?,
        messages: Vec::new(),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn message_from_row(row: SqliteRow) -> Result<ConversationMessage, RepositoryError> {
    let role_raw = row.try_get::<String, _>("role")?;
    let role = MessageRole::parse(&role_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown message role `{role_raw}`")))?;

    Ok(ConversationMessage {
        role,
        content: row.try_get("content")?,
        position: row.try_get("position")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
