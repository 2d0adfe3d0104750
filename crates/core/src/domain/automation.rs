use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::{Intent, LeadSnapshot, LeadStage};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AutomationId(pub String);

impl AutomationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Symbolic lead-lifecycle events automations can subscribe to. The set is
/// closed; unrecognized names parse to `None` and match nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerName {
    LeadCreated,
    LeadNoReply3d,
    LeadStageChanged,
}

impl TriggerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadCreated => "lead.created",
            Self::LeadNoReply3d => "lead.no_reply_3d",
            Self::LeadStageChanged => "lead.stage_changed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "lead.created" => Some(Self::LeadCreated),
            "lead.no_reply_3d" => Some(Self::LeadNoReply3d),
            "lead.stage_changed" => Some(Self::LeadStageChanged),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Sms,
    Email,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "sms" => Some(Self::Sms),
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

/// Condition set evaluated against a lead snapshot at dispatch time. An empty
/// `intent_in` / `stage_in` means that dimension is unfiltered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSet {
    pub min_score: i64,
    pub max_score: i64,
    pub intent_in: Vec<Intent>,
    pub stage_in: Vec<LeadStage>,
}

impl Default for ConditionSet {
    fn default() -> Self {
        Self { min_score: 0, max_score: 100, intent_in: Vec::new(), stage_in: Vec::new() }
    }
}

impl ConditionSet {
    pub fn matches(&self, snapshot: &LeadSnapshot) -> bool {
        if snapshot.score < self.min_score || snapshot.score > self.max_score {
            return false;
        }

        if !self.intent_in.is_empty() {
            let Some(intent) = snapshot.intent else {
                return false;
            };
            if !self.intent_in.contains(&intent) {
                return false;
            }
        }

        if !self.stage_in.is_empty() && !self.stage_in.contains(&snapshot.stage) {
            return false;
        }

        true
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    pub id: AutomationId,
    pub user_id: String,
    pub name: String,
    pub trigger: TriggerName,
    pub channel: ChannelKind,
    pub template: String,
    pub enabled: bool,
    pub conditions: ConditionSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
