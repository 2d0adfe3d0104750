use sqlx::{sqlite::SqliteRow, Row};

use leadflow_core::domain::event::{LeadEvent, LeadEventId, LeadEventType};
use leadflow_core::domain::lead::LeadId;

use super::lead::{parse_json, parse_timestamp};
use super::{LeadEventRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLeadEventRepository {
    pool: DbPool,
}

impl SqlLeadEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LeadEventRepository for SqlLeadEventRepository {
    async fn append(&self, event: LeadEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO lead_events (id, lead_id, event_type, content, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id.0)
        .bind(&event.lead_id.0)
        .bind(event.event_type.as_str())
        .bind(&event.content)
        .bind(event.metadata.to_string())
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_lead(&self, lead_id: &LeadId) -> Result<Vec<LeadEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, lead_id, event_type, content, metadata, created_at
             FROM lead_events
             WHERE lead_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(&lead_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }
}

fn event_from_row(row: SqliteRow) -> Result<LeadEvent, RepositoryError> {
    let type_raw = row.try_get::<String, _>("event_type")?;
    let event_type = LeadEventType::parse(&type_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown lead event type `{type_raw}`")))?;

    Ok(LeadEvent {
        id: LeadEventId(row.try_get("id")?),
        lead_id: LeadId(row.try_get("lead_id")?),
        event_type,
        content: row.try_get("content")?,
        metadata: parse_json("metadata", row.try_get("metadata")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
