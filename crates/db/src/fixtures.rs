//! Default automation fixtures: the starter rule set a fresh installation
//! gets, mirroring what the dashboard would let an operator configure by
//! hand.

use chrono::Utc;

use leadflow_core::domain::automation::{
    Automation, AutomationId, ChannelKind, ConditionSet, TriggerName,
};
use leadflow_core::domain::lead::Intent;

use crate::repositories::{AutomationRepository, RepositoryError, SqlAutomationRepository};
use crate::DbPool;

pub const SEED_USER_ID: &str = "seed-user";

#[derive(Clone, Debug)]
pub struct AutomationSeedInfo {
    pub automation_id: String,
    pub name: String,
    pub trigger: TriggerName,
}

#[derive(Clone, Debug)]
pub struct SeedResult {
    pub automations_seeded: Vec<AutomationSeedInfo>,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

pub struct DefaultAutomationSeed;

impl DefaultAutomationSeed {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let repo = SqlAutomationRepository::new(pool.clone());
        let mut seeded = Vec::new();

        for automation in default_automations(SEED_USER_ID) {
            let info = AutomationSeedInfo {
                automation_id: automation.id.0.clone(),
                name: automation.name.clone(),
                trigger: automation.trigger,
            };
            repo.save(automation).await?;
            seeded.push(info);
        }

        Ok(SeedResult { automations_seeded: seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let repo = SqlAutomationRepository::new(pool.clone());
        let mut checks = Vec::new();

        for (label, id) in [
            ("automation-welcome", "automation-welcome"),
            ("automation-followup", "automation-followup"),
            ("automation-high-intent", "automation-high-intent"),
        ] {
            let present =
                repo.find_by_id(&AutomationId(id.to_owned())).await?.is_some();
            checks.push((label, present));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

fn default_automations(user_id: &str) -> Vec<Automation> {
    let now = Utc::now();

    vec![
        Automation {
            id: AutomationId("automation-welcome".to_owned()),
            user_id: user_id.to_owned(),
            name: "Welcome New Leads".to_owned(),
            trigger: TriggerName::LeadCreated,
            channel: ChannelKind::Sms,
            template: "Hi {{name}}, thanks for your interest in our {{businessType}} services! \
                       How can we help you today? - {{agentName}}"
                .to_owned(),
            enabled: true,
            conditions: ConditionSet::default(),
            created_at: now,
            updated_at: now,
        },
        Automation {
            id: AutomationId("automation-followup".to_owned()),
            user_id: user_id.to_owned(),
            name: "Follow-up Stale Leads".to_owned(),
            trigger: TriggerName::LeadNoReply3d,
            channel: ChannelKind::Email,
            template: "Hi {{name}}, we noticed you reached out about our {{businessType}} \
                       services. Are you still interested? We'd love to help! - {{agentName}}"
                .to_owned(),
            enabled: true,
            conditions: ConditionSet { min_score: 30, ..ConditionSet::default() },
            created_at: now,
            updated_at: now,
        },
        Automation {
            id: AutomationId("automation-high-intent".to_owned()),
            user_id: user_id.to_owned(),
            name: "High Intent - Send Calendar".to_owned(),
            trigger: TriggerName::LeadCreated,
            channel: ChannelKind::Email,
            template: "Hi {{name}}, thanks for reaching out! Based on your interest, I'd love \
                       to schedule a free consultation. Reply here and we'll find a time that \
                       works for you. - {{agentName}}"
                .to_owned(),
            enabled: true,
            conditions: ConditionSet {
                min_score: 70,
                intent_in: vec![Intent::Booking, Intent::Pricing],
                ..ConditionSet::default()
            },
            created_at: now,
            updated_at: now,
        },
    ]
}
