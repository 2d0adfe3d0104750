use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use leadflow_core::domain::automation::{Automation, AutomationId, TriggerName};
use leadflow_core::domain::conversation::ConversationState;
use leadflow_core::domain::event::LeadEvent;
use leadflow_core::domain::lead::{Lead, LeadId};

use super::{
    AutomationRepository, ConversationRepository, LeadEventRepository, LeadRepository,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: RwLock<HashMap<String, Lead>>,
}

#[async_trait::async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let leads = self.leads.read().await;
        Ok(leads.get(&id.0).cloned())
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<Lead>, RepositoryError> {
        let leads = self.leads.read().await;
        Ok(leads
            .values()
            .find(|lead| {
                lead.phone.as_deref() == Some(handle) || lead.email.as_deref() == Some(handle)
            })
            .cloned())
    }

    async fn save(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut leads = self.leads.write().await;
        leads.insert(lead.id.0.clone(), lead);
        Ok(())
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lead>, RepositoryError> {
        let leads = self.leads.read().await;
        let mut stale: Vec<Lead> = leads
            .values()
            .filter(|lead| !lead.stage.is_terminal() && lead.updated_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|lead| lead.updated_at);
        Ok(stale)
    }
}

#[derive(Default)]
pub struct InMemoryLeadEventRepository {
    events: RwLock<Vec<LeadEvent>>,
}

impl InMemoryLeadEventRepository {
    /// Full log across all leads, in append order. Test helper.
    pub async fn all(&self) -> Vec<LeadEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait::async_trait]
impl LeadEventRepository for InMemoryLeadEventRepository {
    async fn append(&self, event: LeadEvent) -> Result<(), RepositoryError> {
        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }

    async fn list_for_lead(&self, lead_id: &LeadId) -> Result<Vec<LeadEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|event| &event.lead_id == lead_id).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryAutomationRepository {
    automations: RwLock<HashMap<String, Automation>>,
}

#[async_trait::async_trait]
impl AutomationRepository for InMemoryAutomationRepository {
    async fn find_by_id(&self, id: &AutomationId) -> Result<Option<Automation>, RepositoryError> {
        let automations = self.automations.read().await;
        Ok(automations.get(&id.0).cloned())
    }

    async fn save(&self, automation: Automation) -> Result<(), RepositoryError> {
        let mut automations = self.automations.write().await;
        automations.insert(automation.id.0.clone(), automation);
        Ok(())
    }

    async fn list_enabled_for_trigger(
        &self,
        user_id: &str,
        trigger: TriggerName,
    ) -> Result<Vec<Automation>, RepositoryError> {
        let automations = self.automations.read().await;
        let mut matches: Vec<Automation> = automations
            .values()
            .filter(|automation| {
                automation.enabled
                    && automation.user_id == user_id
                    && automation.trigger == trigger
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.0.cmp(&b.id.0)));
        Ok(matches)
    }
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: RwLock<HashMap<String, ConversationState>>,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<ConversationState>, RepositoryError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(handle).cloned())
    }

    async fn save(&self, conversation: ConversationState) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.contact_handle.clone(), conversation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use leadflow_core::domain::conversation::{ConversationState, MessageRole};
    use leadflow_core::domain::event::{LeadEvent, LeadEventType};
    use leadflow_core::domain::lead::{Lead, LeadId, LeadStage};

    use crate::repositories::{
        ConversationRepository, InMemoryConversationRepository, InMemoryLeadEventRepository,
        InMemoryLeadRepository, LeadEventRepository, LeadRepository,
    };

    fn lead(id: &str, phone: &str) -> Lead {
        let now = Utc::now();
        Lead {
            id: LeadId(id.to_owned()),
            user_id: "user-1".to_owned(),
            name: Some("Dana".to_owned()),
            email: None,
            phone: Some(phone.to_owned()),
            source: None,
            stage: LeadStage::New,
            intent: None,
            sentiment: None,
            score: 50,
            metadata: json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn lead_repo_resolves_handles() {
        let repo = InMemoryLeadRepository::default();
        repo.save(lead("lead-1", "+15550001111")).await.expect("save");

        let found = repo.find_by_handle("+15550001111").await.expect("query");
        assert_eq!(found.map(|lead| lead.id.0), Some("lead-1".to_owned()));
    }

    #[tokio::test]
    async fn stale_listing_respects_cutoff() {
        let repo = InMemoryLeadRepository::default();
        let mut old = lead("lead-old", "+15550002222");
        old.updated_at = Utc::now() - Duration::days(4);
        repo.save(old).await.expect("save");
        repo.save(lead("lead-new", "+15550003333")).await.expect("save");

        let stale = repo.list_stale(Utc::now() - Duration::days(3)).await.expect("list");
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id.0, "lead-old");
    }

    #[tokio::test]
    async fn event_repo_round_trip() {
        let repo = InMemoryLeadEventRepository::default();
        let lead_id = LeadId("lead-1".to_owned());
        repo.append(LeadEvent::new(lead_id.clone(), LeadEventType::SmsSent, "hi"))
            .await
            .expect("append");

        let events = repo.list_for_lead(&lead_id).await.expect("list");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].content, "hi");
    }

    #[tokio::test]
    async fn conversation_repo_round_trip() {
        let repo = InMemoryConversationRepository::default();
        let mut conversation =
            ConversationState::open("+15550001111", LeadId("lead-1".to_owned()));
        conversation.push_message(MessageRole::User, "hello");
        repo.save(conversation).await.expect("save");

        let found = repo.find_by_handle("+15550001111").await.expect("query").expect("exists");
        assert_eq!(found.messages.len(), 1);
    }
}
