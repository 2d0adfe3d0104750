use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use leadflow_core::domain::lead::{Intent, Lead, LeadId, LeadStage, Sentiment};

use super::{LeadRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLeadRepository {
    pool: DbPool,
}

impl SqlLeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const LEAD_COLUMNS: &str = "id, user_id, name, email, phone, source, stage, intent, sentiment, \
                            score, metadata, created_at, updated_at";

#[async_trait::async_trait]
impl LeadRepository for SqlLeadRepository {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(lead_from_row).transpose()
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE phone = ? OR email = ? ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(handle)
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        row.map(lead_from_row).transpose()
    }

    async fn save(&self, lead: Lead) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO leads (
                id, user_id, name, email, phone, source, stage, intent, sentiment,
                score, metadata, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                source = excluded.source,
                stage = excluded.stage,
                intent = excluded.intent,
                sentiment = excluded.sentiment,
                score = excluded.score,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at",
        )
        .bind(&lead.id.0)
        .bind(&lead.user_id)
        .bind(lead.name.as_deref())
        .bind(lead.email.as_deref())
        .bind(lead.phone.as_deref())
        .bind(lead.source.as_deref())
        .bind(lead.stage.as_str())
        .bind(lead.intent.map(|value| value.as_str()))
        .bind(lead.sentiment.map(|value| value.as_str()))
        .bind(lead.score)
        .bind(lead.metadata.to_string())
        .bind(lead.created_at.to_rfc3339())
        .bind(lead.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lead>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE stage NOT IN ('Closed', 'Lost') AND updated_at < ?
             ORDER BY updated_at ASC"
        ))
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(lead_from_row).collect()
    }
}

fn lead_from_row(row: SqliteRow) -> Result<Lead, RepositoryError> {
    let stage_raw = row.try_get::<String, _>("stage")?;
    let stage = LeadStage::parse(&stage_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown lead stage `{stage_raw}`")))?;

    let intent = row
        .try_get::<Option<String>, _>("intent")?
        .map(|value| {
            Intent::parse(&value)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown intent `{value}`")))
        })
        .transpose()?;

    let sentiment = row
        .try_get::<Option<String>, _>("sentiment")?
        .map(|value| {
            Sentiment::parse(&value)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown sentiment `{value}`")))
        })
        .transpose()?;

    Ok(Lead {
        id: LeadId(row.try_get("id")?),
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        source: row.try_get("source")?,
        stage,
        intent,
        sentiment,
        score: row.try_get("score")?,
        metadata: parse_json("metadata", row.try_get("metadata")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

pub(crate) fn parse_json(column: &str, value: String) -> Result<serde_json::Value, RepositoryError> {
    serde_json::from_str(&value)
        .map_err(|error| RepositoryError::Decode(format!("invalid JSON in `{column}`: {error}")))
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: {error}"))
        })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use leadflow_core::domain::lead::{Intent, Lead, LeadId, LeadStage, Sentiment};

    use crate::repositories::{LeadRepository, SqlLeadRepository};
    use crate::{connect_with_settings, migrations};

    async fn pool() -> crate::DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    fn lead(id: &str, phone: &str) -> Lead {
        let now = Utc::now();
        Lead {
            id: LeadId(id.to_owned()),
            user_id: "user-1".to_owned(),
            name: Some("Dana".to_owned()),
            email: Some(format!("{id}@example.com")),
            phone: Some(phone.to_owned()),
            source: Some("landing-page".to_owned()),
            stage: LeadStage::New,
            intent: Some(Intent::Booking),
            sentiment: Some(Sentiment::Positive),
            score: 80,
            metadata: json!({"roof_type": "shingle"}),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_all_fields() {
        let pool = pool().await;
        let repo = SqlLeadRepository::new(pool.clone());
        let lead = lead("lead-1", "+15550001111");

        repo.save(lead.clone()).await.expect("save lead");
        let found = repo.find_by_id(&lead.id).await.expect("find lead").expect("lead exists");

        assert_eq!(found.user_id, lead.user_id);
        assert_eq!(found.stage, LeadStage::New);
        assert_eq!(found.intent, Some(Intent::Booking));
        assert_eq!(found.score, 80);
        assert_eq!(found.metadata["roof_type"], "shingle");

        pool.close().await;
    }

    #[tokio::test]
    async fn find_by_handle_matches_phone_and_email() {
        let pool = pool().await;
        let repo = SqlLeadRepository::new(pool.clone());
        let lead = lead("lead-2", "+15550002222");
        repo.save(lead.clone()).await.expect("save lead");

        let by_phone = repo.find_by_handle("+15550002222").await.expect("query");
        assert_eq!(by_phone.map(|found| found.id), Some(lead.id.clone()));

        let by_email = repo.find_by_handle("lead-2@example.com").await.expect("query");
        assert_eq!(by_email.map(|found| found.id), Some(lead.id));

        let missing = repo.find_by_handle("+15559999999").await.expect("query");
        assert!(missing.is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn list_stale_skips_terminal_and_fresh_leads() {
        let pool = pool().await;
        let repo = SqlLeadRepository::new(pool.clone());

        let mut stale = lead("lead-stale", "+15550003333");
        stale.updated_at = Utc::now() - Duration::days(5);
        repo.save(stale).await.expect("save stale");

        let mut closed = lead("lead-closed", "+15550004444");
        closed.stage = LeadStage::Closed;
        closed.updated_at = Utc::now() - Duration::days(10);
        repo.save(closed).await.expect("save closed");

        repo.save(lead("lead-fresh", "+15550005555")).await.expect("save fresh");

        let cutoff = Utc::now() - Duration::days(3);
        let stale_leads = repo.list_stale(cutoff).await.expect("list stale");

        let ids: Vec<&str> = stale_leads.iter().map(|found| found.id.0.as_str()).collect();
        assert_eq!(ids, vec!["lead-stale"]);

        pool.close().await;
    }
}
