use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::LeadId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadEventId(pub String);

impl LeadEventId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadEventType {
    FormSubmit,
    AiAnalysis,
    AiDraft,
    EmailSent,
    SmsSent,
    SmsReceived,
    StageChange,
    NoteAdded,
    NeedsHuman,
    BookingConfirmed,
    BookingUnavailable,
}

impl LeadEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormSubmit => "FORM_SUBMIT",
            Self::AiAnalysis => "AI_ANALYSIS",
            Self::AiDraft => "AI_DRAFT",
            Self::EmailSent => "EMAIL_SENT",
            Self::SmsSent => "SMS_SENT",
            Self::SmsReceived => "SMS_RECEIVED",
            Self::StageChange => "STAGE_CHANGE",
            Self::NoteAdded => "NOTE_ADDED",
            Self::NeedsHuman => "NEEDS_HUMAN",
            Self::BookingConfirmed => "BOOKING_CONFIRMED",
            Self::BookingUnavailable => "BOOKING_UNAVAILABLE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "FORM_SUBMIT" => Some(Self::FormSubmit),
            "AI_ANALYSIS" => Some(Self::AiAnalysis),
            "AI_DRAFT" => Some(Self::AiDraft),
            "EMAIL_SENT" => Some(Self::EmailSent),
            "SMS_SENT" => Some(Self::SmsSent),
            "SMS_RECEIVED" => Some(Self::SmsReceived),
            "STAGE_CHANGE" => Some(Self::StageChange),
            "NOTE_ADDED" => Some(Self::NoteAdded),
            "NEEDS_HUMAN" => Some(Self::NeedsHuman),
            "BOOKING_CONFIRMED" => Some(Self::BookingConfirmed),
            "BOOKING_UNAVAILABLE" => Some(Self::BookingUnavailable),
            _ => None,
        }
    }
}

/// An immutable, append-only fact about a lead. Events are never updated or
/// deleted; together they form the conversation and audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeadEvent {
    pub id: LeadEventId,
    pub lead_id: LeadId,
    pub event_type: LeadEventType,
    pub content: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl LeadEvent {
    pub fn new(lead_id: LeadId, event_type: LeadEventType, content: impl Into<String>) -> Self {
        Self {
            id: LeadEventId::generate(),
            lead_id,
            event_type,
            content: content.into(),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{LeadEvent, LeadEventType};
    use crate::domain::lead::LeadId;

    #[test]
    fn event_type_round_trips_through_strings() {
        for event_type in [
            LeadEventType::FormSubmit,
            LeadEventType::AiAnalysis,
            LeadEventType::AiDraft,
            LeadEventType::EmailSent,
            LeadEventType::SmsSent,
            LeadEventType::SmsReceived,
            LeadEventType::StageChange,
            LeadEventType::NoteAdded,
            LeadEventType::NeedsHuman,
            LeadEventType::BookingConfirmed,
            LeadEventType::BookingUnavailable,
        ] {
            assert_eq!(LeadEventType::parse(event_type.as_str()), Some(event_type));
        }
        assert_eq!(LeadEventType::parse("CALL_LOGGED"), None);
    }

    #[test]
    fn new_event_carries_empty_metadata_until_attached() {
        let event = LeadEvent::new(LeadId("lead-1".to_owned()), LeadEventType::SmsSent, "hi");
        assert_eq!(event.metadata, json!({}));

        let event = event.with_metadata(json!({"channel": "sms"}));
        assert_eq!(event.metadata["channel"], "sms");
    }
}
