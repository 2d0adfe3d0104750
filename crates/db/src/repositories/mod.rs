use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use leadflow_core::domain::automation::{Automation, AutomationId, TriggerName};
use leadflow_core::domain::conversation::ConversationState;
use leadflow_core::domain::event::LeadEvent;
use leadflow_core::domain::lead::{Lead, LeadId};

pub mod automation;
pub mod conversation;
pub mod event;
pub mod lead;
pub mod memory;

pub use automation::SqlAutomationRepository;
pub use conversation::SqlConversationRepository;
pub use event::SqlLeadEventRepository;
pub use lead::SqlLeadRepository;
pub use memory::{
    InMemoryAutomationRepository, InMemoryConversationRepository, InMemoryLeadEventRepository,
    InMemoryLeadRepository,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;

    /// Resolve a lead by contact handle (phone or email).
    async fn find_by_handle(&self, handle: &str) -> Result<Option<Lead>, RepositoryError>;

    async fn save(&self, lead: Lead) -> Result<(), RepositoryError>;

    /// Leads in a non-terminal stage whose last update predates `cutoff`.
    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lead>, RepositoryError>;
}

/// The event log is append-only: there is deliberately no update or delete
/// surface here.
#[async_trait]
pub trait LeadEventRepository: Send + Sync {
    async fn append(&self, event: LeadEvent) -> Result<(), RepositoryError>;

    async fn list_for_lead(&self, lead_id: &LeadId) -> Result<Vec<LeadEvent>, RepositoryError>;
}

#[async_trait]
pub trait AutomationRepository: Send + Sync {
    async fn find_by_id(&self, id: &AutomationId) -> Result<Option<Automation>, RepositoryError>;

    async fn save(&self, automation: Automation) -> Result<(), RepositoryError>;

    async fn list_enabled_for_trigger(
        &self,
        user_id: &str,
        trigger: TriggerName,
    ) -> Result<Vec<Automation>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<ConversationState>, RepositoryError>;

    async fn save(&self, conversation: ConversationState) -> Result<(), RepositoryError>;
}
