use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl LeadId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadStage {
    New,
    Contacted,
    Qualified,
    Closed,
    Lost,
}

impl LeadStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Qualified => "Qualified",
            Self::Closed => "Closed",
            Self::Lost => "Lost",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "New" => Some(Self::New),
            "Contacted" => Some(Self::Contacted),
            "Qualified" => Some(Self::Qualified),
            "Closed" => Some(Self::Closed),
            "Lost" => Some(Self::Lost),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Lost)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Booking,
    Info,
    Pricing,
    Support,
    Spam,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booking => "Booking",
            Self::Info => "Info",
            Self::Pricing => "Pricing",
            Self::Support => "Support",
            Self::Spam => "Spam",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Booking" => Some(Self::Booking),
            "Info" => Some(Self::Info),
            "Pricing" => Some(Self::Pricing),
            "Support" => Some(Self::Support),
            "Spam" => Some(Self::Spam),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Positive" => Some(Self::Positive),
            "Neutral" => Some(Self::Neutral),
            "Negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

/// Clamp an AI-reported score into the 0..=100 range the rest of the engine
/// assumes.
pub fn clamp_score(raw: i64) -> i64 {
    raw.clamp(0, 100)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub stage: LeadStage,
    pub intent: Option<Intent>,
    pub sentiment: Option<Sentiment>,
    pub score: i64,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn has_contact_handle(&self) -> bool {
        self.phone.as_deref().is_some_and(|value| !value.trim().is_empty())
            || self.email.as_deref().is_some_and(|value| !value.trim().is_empty())
    }

    /// Preferred outbound handle for a channel: phone for SMS, email for
    /// email.
    pub fn handle_for_sms(&self) -> Option<&str> {
        self.phone.as_deref().filter(|value| !value.trim().is_empty())
    }

    pub fn handle_for_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|value| !value.trim().is_empty())
    }

    pub fn snapshot(&self) -> LeadSnapshot {
        LeadSnapshot { score: self.score, intent: self.intent, stage: self.stage }
    }
}

/// The condition-relevant view of a lead at dispatch time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeadSnapshot {
    pub score: i64,
    pub intent: Option<Intent>,
    pub stage: LeadStage,
}
