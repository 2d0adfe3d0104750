use sqlx::{sqlite::SqliteRow, Row};

use leadflow_core::domain::automation::{
    Automation, AutomationId, ChannelKind, ConditionSet, TriggerName,
};
use leadflow_core::domain::lead::{Intent, LeadStage};

use super::lead::parse_timestamp;
use super::{AutomationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAutomationRepository {
    pool: DbPool,
}

impl SqlAutomationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const AUTOMATION_COLUMNS: &str = "id, user_id, name, trigger_name, channel, template, enabled, \
                                  min_score, max_score, intent_in, stage_in, created_at, updated_at";

#[async_trait::async_trait]
impl AutomationRepository for SqlAutomationRepository {
    async fn find_by_id(&self, id: &AutomationId) -> Result<Option<Automation>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {AUTOMATION_COLUMNS} FROM automations WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        row.map(automation_from_row).transpose()
    }

    async fn save(&self, automation: Automation) -> Result<(), RepositoryError> {
        let intent_in: Vec<&str> =
            automation.conditions.intent_in.iter().map(Intent::as_str).collect();
        let stage_in: Vec<&str> =
            automation.conditions.stage_in.iter().map(LeadStage::as_str).collect();

        sqlx::query(
            "INSERT INTO automations (
                id, user_id, name, trigger_name, channel, template, enabled,
                min_score, max_score, intent_in, stage_in, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                name = excluded.name,
                trigger_name = excluded.trigger_name,
                channel = excluded.channel,
                template = excluded.template,
                enabled = excluded.enabled,
                min_score = excluded.min_score,
                max_score = excluded.max_score,
                intent_in = excluded.intent_in,
                stage_in = excluded.stage_in,
                updated_at = excluded.updated_at",
        )
        .bind(&automation.id.0)
        .bind(&automation.user_id)
        .bind(&automation.name)
        .bind(automation.trigger.as_str())
        .bind(automation.channel.as_str())
        .bind(&automation.template)
        .bind(automation.enabled)
        .bind(automation.conditions.min_score)
        .bind(automation.conditions.max_score)
        .bind(serde_json::to_string(&intent_in).unwrap_or_else(|_| "[]".to_owned()))
        .bind(serde_json::to_string(&stage_in).unwrap_or_else(|_| "[]".to_owned()))
        .bind(automation.created_at.to_rfc3339())
        .bind(automation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_enabled_for_trigger(
        &self,
        user_id: &str,
        trigger: TriggerName,
    ) -> Result<Vec<Automation>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {AUTOMATION_COLUMNS} FROM automations
             WHERE user_id = ? AND trigger_name = ? AND enabled = 1
             ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .bind(trigger.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(automation_from_row).collect()
    }
}

fn automation_from_row(row: SqliteRow) -> Result<Automation, RepositoryError> {
    let trigger_raw = row.try_get::<String, _>("trigger_name")?;
    let trigger = TriggerName::parse(&trigger_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown trigger `{trigger_raw}`")))?;

    let channel_raw = row.try_get::<String, _>("channel")?;
    let channel = ChannelKind::parse(&channel_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown channel `{channel_raw}`")))?;

    let intent_in = parse_intents("intent_in", row.try_get("intent_in")?)?;
    let stage_in = parse_stages("stage_in", row.try_get("stage_in")?)?;

    Ok(Automation {
        id: AutomationId(row.try_get("id")?),
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        trigger,
        channel,
        template: row.try_get("template")?,
        enabled: row.try_get("enabled")?,
        conditions: ConditionSet {
            min_score: row.try_get("min_score")?,
            max_score: row.try_get("max_score")?,
            intent_in,
            stage_in,
        },
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn parse_intents(column: &str, value: String) -> Result<Vec<Intent>, RepositoryError> {
    let labels: Vec<String> = serde_json::from_str(&value)
        .map_err(|error| RepositoryError::Decode(format!("invalid JSON in `{column}`: {error}")))?;

    labels
        .into_iter()
        .map(|label| {
            Intent::parse(&label).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown intent `{label}` in `{column}`"))
            })
        })
        .collect()
}

fn parse_stages(column: &str, value: String) -> Result<Vec<LeadStage>, RepositoryError> {
    let labels: Vec<String> = serde_json::from_str(&value)
        .map_err(|error| RepositoryError::Decode(format!("invalid JSON in `{column}`: {error}")))?;

    labels
        .into_iter()
        .map(|label| {
            LeadStage::parse(&label).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown stage `{label}` in `{column}`"))
            })
        })
        .collect()
}
