use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::LeadId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Dialogue lifecycle for one contact handle. `Escalated` and `Booked` are
/// terminal: inbound messages are still persisted, but no further autonomous
/// AI turn is taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationStatus {
    Active,
    Escalated,
    Booked,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Escalated => "Escalated",
            Self::Booked => "Booked",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Active" => Some(Self::Active),
            "Escalated" => Some(Self::Escalated),
            "Booked" => Some(Self::Booked),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Escalated | Self::Booked)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// Per-contact-handle conversation state: ordered role-tagged history plus
/// the dialogue status. All mutation happens under the per-handle lock, so
/// positions are assigned without coordination here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: ConversationId,
    pub contact_handle: String,
    pub lead_id: LeadId,
    pub status: ConversationStatus,
    pub needs_human: bool,
    pub messages: Vec<ConversationMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn open(contact_handle: impl Into<String>, lead_id: LeadId) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::generate(),
            contact_handle: contact_handle.into(),
            lead_id,
            status: ConversationStatus::Active,
            needs_human: false,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_transition_to(&self, next: ConversationStatus) -> bool {
        matches!(
            (self.status, next),
            (ConversationStatus::Active, ConversationStatus::Escalated)
                | (ConversationStatus::Active, ConversationStatus::Booked)
        )
    }

    pub fn transition_to(&mut self, next: ConversationStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            self.updated_at = Utc::now();
            return Ok(());
        }

        Err(DomainError::InvalidConversationTransition { from: self.status, to: next })
    }

    pub fn next_position(&self) -> i64 {
        self.messages.last().map(|message| message.position + 1).unwrap_or(0)
    }

    pub fn push_message(&mut self, role: MessageRole, content: impl Into<String>) {
        let message = ConversationMessage {
            role,
            content: content.into(),
            position: self.next_position(),
            created_at: Utc::now(),
        };
        self.messages.push(message);
        self.updated_at = Utc::now();
    }
}
