use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use leadflow_channels::outbound::ChannelRouter;
use leadflow_channels::retry::{send_with_retry, SendRetryPolicy};
use leadflow_core::domain::automation::{Automation, AutomationId, ChannelKind, TriggerName};
use leadflow_core::domain::event::{LeadEvent, LeadEventType};
use leadflow_core::domain::lead::{Lead, LeadId, LeadStage};
use leadflow_core::errors::ApplicationError;
use leadflow_core::template::{render, TemplateVars};
use leadflow_db::repositories::{
    AutomationRepository, LeadEventRepository, LeadRepository, RepositoryError,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchResult {
    Sent { delivery_id: String },
    SendFailed { error: String },
    Skipped { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub automation_id: AutomationId,
    pub channel: ChannelKind,
    pub result: DispatchResult,
}

/// Matches lead-lifecycle events against the owner's enabled automations and
/// fires every match. Failures are isolated per automation: one bad send
/// never blocks its siblings, and the event log records what actually went
/// out.
pub struct TriggerDispatcher {
    leads: Arc<dyn LeadRepository>,
    events: Arc<dyn LeadEventRepository>,
    automations: Arc<dyn AutomationRepository>,
    router: ChannelRouter,
    retry: SendRetryPolicy,
    business_type: String,
    agent_name: String,
}

impl TriggerDispatcher {
    pub fn new(
        leads: Arc<dyn LeadRepository>,
        events: Arc<dyn LeadEventRepository>,
        automations: Arc<dyn AutomationRepository>,
        router: ChannelRouter,
        retry: SendRetryPolicy,
        business_type: impl Into<String>,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            leads,
            events,
            automations,
            router,
            retry,
            business_type: business_type.into(),
            agent_name: agent_name.into(),
        }
    }

    /// Evaluate all enabled automations for `trigger_name` against the
    /// lead's current snapshot. An unknown trigger name matches nothing and
    /// is not an error; a missing lead is a data-integrity failure for this
    /// dispatch only.
    pub async fn dispatch(
        &self,
        lead_id: &LeadId,
        trigger_name: &str,
    ) -> Result<Vec<DispatchOutcome>, ApplicationError> {
        let Some(trigger) = TriggerName::parse(trigger_name) else {
            debug!(
                event_name = "trigger.unknown_name",
                lead_id = %lead_id.0,
                trigger = trigger_name,
                "unknown trigger name matches no automations"
            );
            return Ok(Vec::new());
        };

        let mut lead = self
            .leads
            .find_by_id(lead_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| {
                ApplicationError::DataIntegrity(format!("lead `{}` not found", lead_id.0))
            })?;

        let snapshot = lead.snapshot();
        let candidates = self
            .automations
            .list_enabled_for_trigger(&lead.user_id, trigger)
            .await
            .map_err(persistence)?;

        let mut outcomes = Vec::new();

        for automation in candidates {
            if !automation.conditions.matches(&snapshot) {
                continue;
            }

            let result = self.fire(&mut lead, &automation).await;
            info!(
                event_name = "trigger.automation_evaluated",
                lead_id = %lead.id.0,
                automation_id = %automation.id.0,
                trigger = trigger.as_str(),
                result = ?result,
                "automation fired"
            );
            outcomes.push(DispatchOutcome {
                automation_id: automation.id.clone(),
                channel: automation.channel,
                result,
            });
        }

        Ok(outcomes)
    }

    async fn fire(&self, lead: &mut Lead, automation: &Automation) -> DispatchResult {
        let Some(sender) = self.router.sender_for(automation.channel) else {
            warn!(
                event_name = "trigger.channel_unroutable",
                lead_id = %lead.id.0,
                automation_id = %automation.id.0,
                channel = automation.channel.as_str(),
                "no sender configured for channel, skipping automation"
            );
            return DispatchResult::Skipped {
                reason: format!("no sender configured for channel `{}`", automation.channel.as_str()),
            };
        };

        let destination = match automation.channel {
            ChannelKind::Sms => lead.handle_for_sms(),
            ChannelKind::Email => lead.handle_for_email(),
        };
        let Some(destination) = destination.map(str::to_owned) else {
            warn!(
                event_name = "trigger.destination_missing",
                lead_id = %lead.id.0,
                automation_id = %automation.id.0,
                channel = automation.channel.as_str(),
                "lead has no contact handle for channel, skipping automation"
            );
            return DispatchResult::Skipped {
                reason: format!("lead has no `{}` handle", automation.channel.as_str()),
            };
        };

        let vars = TemplateVars::new(
            lead.name.clone().unwrap_or_default(),
            self.business_type.clone(),
            self.agent_name.clone(),
        );
        let body = render(&automation.template, &vars);

        match send_with_retry(sender.as_ref(), &destination, &body, self.retry).await {
            Ok(delivery_id) => {
                let event_type = match automation.channel {
                    ChannelKind::Sms => LeadEventType::SmsSent,
                    ChannelKind::Email => LeadEventType::EmailSent,
                };
                self.append_event(
                    LeadEvent::new(lead.id.clone(), event_type, body).with_metadata(json!({
                        "automation_id": automation.id.0,
                        "delivery_id": delivery_id.0,
                        "channel": automation.channel.as_str(),
                    })),
                )
                .await;

                self.advance_contacted(lead).await;

                DispatchResult::Sent { delivery_id: delivery_id.0 }
            }
            Err(error) => {
                warn!(
                    event_name = "trigger.send_failed",
                    lead_id = %lead.id.0,
                    automation_id = %automation.id.0,
                    error = %error,
                    "outbound send failed after retries, continuing with remaining automations"
                );
                DispatchResult::SendFailed { error: error.to_string() }
            }
        }
    }

    /// First successful automated touch moves a New lead to Contacted, with
    /// a STAGE_CHANGE event for the audit trail.
    async fn advance_contacted(&self, lead: &mut Lead) {
        if lead.stage != LeadStage::New {
            return;
        }

        lead.stage = LeadStage::Contacted;
        lead.updated_at = Utc::now();

        if let Err(error) = self.leads.save(lead.clone()).await {
            warn!(
                event_name = "trigger.stage_advance_failed",
                lead_id = %lead.id.0,
                error = %error,
                "could not persist stage advance to Contacted"
            );
            return;
        }

        self.append_event(
            LeadEvent::new(
                lead.id.clone(),
                LeadEventType::StageChange,
                format!("Stage changed to {}", LeadStage::Contacted.as_str()),
            )
            .with_metadata(json!({"new_stage": LeadStage::Contacted.as_str()})),
        )
        .await;
    }

    async fn append_event(&self, event: LeadEvent) {
        if let Err(error) = self.events.append(event).await {
            warn!(
                event_name = "trigger.event_append_failed",
                error = %error,
                "lead event could not be appended"
            );
        }
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use serde_json::json;

    use leadflow_channels::outbound::{ChannelRouter, RecordingChannelSender};
    use leadflow_channels::retry::SendRetryPolicy;
    use leadflow_core::domain::automation::{
        Automation, AutomationId, ChannelKind, ConditionSet, TriggerName,
    };
    use leadflow_core::domain::event::LeadEventType;
    use leadflow_core::domain::lead::{Intent, Lead, LeadId, LeadStage};
    use leadflow_core::errors::ApplicationError;
    use leadflow_db::repositories::{
        AutomationRepository, InMemoryAutomationRepository, InMemoryLeadEventRepository,
        InMemoryLeadRepository, LeadRepository,
    };

    use super::{DispatchResult, TriggerDispatcher};

    struct Fixture {
        leads: Arc<InMemoryLeadRepository>,
        events: Arc<InMemoryLeadEventRepository>,
        automations: Arc<InMemoryAutomationRepository>,
        sms: Arc<RecordingChannelSender>,
        email: Arc<RecordingChannelSender>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                leads: Arc::new(InMemoryLeadRepository::default()),
                events: Arc::new(InMemoryLeadEventRepository::default()),
                automations: Arc::new(InMemoryAutomationRepository::default()),
                sms: Arc::new(RecordingChannelSender::new()),
                email: Arc::new(RecordingChannelSender::new()),
            }
        }

        fn dispatcher(&self) -> TriggerDispatcher {
            self.dispatcher_with_router(ChannelRouter::new(
                Some(self.sms.clone()),
                Some(self.email.clone()),
            ))
        }

        fn dispatcher_with_router(&self, router: ChannelRouter) -> TriggerDispatcher {
            TriggerDispatcher::new(
                self.leads.clone(),
                self.events.clone(),
                self.automations.clone(),
                router,
                SendRetryPolicy::new(0, Duration::from_millis(1)),
                "roofing",
                "Riley",
            )
        }
    }

    fn lead(score: i64, intent: Option<Intent>) -> Lead {
        let now = Utc::now();
        Lead {
            id: LeadId("lead-1".to_owned()),
            user_id: "user-1".to_owned(),
            name: Some("Dana".to_owned()),
            email: Some("dana@example.com".to_owned()),
            phone: Some("+15550001111".to_owned()),
            source: None,
            stage: LeadStage::New,
            intent,
            sentiment: None,
            score,
            metadata: json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    fn automation(
        id: &str,
        channel: ChannelKind,
        conditions: ConditionSet,
    ) -> Automation {
        let now = Utc::now();
        Automation {
            id: AutomationId(id.to_owned()),
            user_id: "user-1".to_owned(),
            name: id.to_owned(),
            trigger: TriggerName::LeadCreated,
            channel,
            template: "Hi {{name}}, thanks for asking about {{businessType}}! - {{agentName}}"
                .to_owned(),
            enabled: true,
            conditions,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn matching_automation_fires_with_rendered_template() {
        let fixture = Fixture::new();
        fixture.leads.save(lead(80, Some(Intent::Booking))).await.expect("save lead");
        fixture
            .automations
            .save(automation(
                "auto-high-intent",
                ChannelKind::Sms,
                ConditionSet {
                    min_score: 70,
                    intent_in: vec![Intent::Booking, Intent::Pricing],
                    ..ConditionSet::default()
                },
            ))
            .await
            .expect("save automation");

        let outcomes = fixture
            .dispatcher()
            .dispatch(&LeadId("lead-1".to_owned()), "lead.created")
            .await
            .expect("dispatch");

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0].result, DispatchResult::Sent { .. }));

        let sent = fixture.sms.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+15550001111");
        assert_eq!(sent[0].1, "Hi Dana, thanks for asking about roofing! - Riley");

        let events = fixture.events.all().await;
        assert!(events.iter().any(|event| event.event_type == LeadEventType::SmsSent
            && event.content.contains("Hi Dana")));
    }

    #[tokio::test]
    async fn intent_filter_never_fires_outside_the_set() {
        let fixture = Fixture::new();
        fixture
            .automations
            .save(automation(
                "auto-filtered",
                ChannelKind::Sms,
                ConditionSet {
                    intent_in: vec![Intent::Booking, Intent::Pricing],
                    ..ConditionSet::default()
                },
            ))
            .await
            .expect("save automation");

        for score in [0, 50, 100] {
            for stage in [LeadStage::New, LeadStage::Qualified] {
                let mut candidate = lead(score, Some(Intent::Support));
                candidate.stage = stage;
                fixture.leads.save(candidate).await.expect("save lead");

                let outcomes = fixture
                    .dispatcher()
                    .dispatch(&LeadId("lead-1".to_owned()), "lead.created")
                    .await
                    .expect("dispatch");
                assert!(outcomes.is_empty(), "score={score} stage={stage:?}");
            }
        }
        assert!(fixture.sms.sent().is_empty());
    }

    #[tokio::test]
    async fn all_matching_automations_fire_not_just_one() {
        let fixture = Fixture::new();
        fixture.leads.save(lead(80, Some(Intent::Booking))).await.expect("save lead");
        fixture
            .automations
            .save(automation("auto-welcome", ChannelKind::Sms, ConditionSet::default()))
            .await
            .expect("save");
        fixture
            .automations
            .save(automation(
                "auto-high-intent",
                ChannelKind::Email,
                ConditionSet { min_score: 70, ..ConditionSet::default() },
            ))
            .await
            .expect("save");

        let outcomes = fixture
            .dispatcher()
            .dispatch(&LeadId("lead-1".to_owned()), "lead.created")
            .await
            .expect("dispatch");

        assert_eq!(outcomes.len(), 2);
        assert_eq!(fixture.sms.sent().len(), 1);
        assert_eq!(fixture.email.sent().len(), 1);
    }

    #[tokio::test]
    async fn repeated_dispatch_is_deterministic() {
        let fixture = Fixture::new();
        fixture.leads.save(lead(80, Some(Intent::Booking))).await.expect("save lead");
        fixture
            .automations
            .save(automation("auto-a", ChannelKind::Sms, ConditionSet::default()))
            .await
            .expect("save");
        fixture
            .automations
            .save(automation(
                "auto-b",
                ChannelKind::Email,
                ConditionSet { min_score: 50, ..ConditionSet::default() },
            ))
            .await
            .expect("save");

        let dispatcher = fixture.dispatcher();
        let lead_id = LeadId("lead-1".to_owned());

        let first: Vec<String> = dispatcher
            .dispatch(&lead_id, "lead.created")
            .await
            .expect("dispatch")
            .into_iter()
            .map(|outcome| outcome.automation_id.0)
            .collect();
        let second: Vec<String> = dispatcher
            .dispatch(&lead_id, "lead.created")
            .await
            .expect("dispatch")
            .into_iter()
            .map(|outcome| outcome.automation_id.0)
            .collect();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn send_failure_does_not_block_sibling_automations() {
        let fixture = Fixture::new();
        fixture.leads.save(lead(80, None)).await.expect("save lead");
        fixture
            .automations
            .save(automation("auto-sms", ChannelKind::Sms, ConditionSet::default()))
            .await
            .expect("save");
        fixture
            .automations
            .save(automation("auto-email", ChannelKind::Email, ConditionSet::default()))
            .await
            .expect("save");

        let broken_sms = Arc::new(RecordingChannelSender::always_failing());
        let dispatcher = fixture.dispatcher_with_router(ChannelRouter::new(
            Some(broken_sms),
            Some(fixture.email.clone()),
        ));

        let outcomes = dispatcher
            .dispatch(&LeadId("lead-1".to_owned()), "lead.created")
            .await
            .expect("dispatch");

        assert_eq!(outcomes.len(), 2);
        let failed = outcomes
            .iter()
            .filter(|outcome| matches!(outcome.result, DispatchResult::SendFailed { .. }))
            .count();
        let sent = outcomes
            .iter()
            .filter(|outcome| matches!(outcome.result, DispatchResult::Sent { .. }))
            .count();
        assert_eq!((failed, sent), (1, 1));

        // Only the delivery that actually happened is in the audit trail.
        let events = fixture.events.all().await;
        let send_events = events
            .iter()
            .filter(|event| {
                matches!(event.event_type, LeadEventType::SmsSent | LeadEventType::EmailSent)
            })
            .count();
        assert_eq!(send_events, 1);
    }

    #[tokio::test]
    async fn unroutable_channel_is_skipped_with_reason() {
        let fixture = Fixture::new();
        fixture.leads.save(lead(80, None)).await.expect("save lead");
        fixture
            .automations
            .save(automation("auto-email", ChannelKind::Email, ConditionSet::default()))
            .await
            .expect("save");

        let dispatcher = fixture
            .dispatcher_with_router(ChannelRouter::new(Some(fixture.sms.clone()), None));

        let outcomes = dispatcher
            .dispatch(&LeadId("lead-1".to_owned()), "lead.created")
            .await
            .expect("dispatch");

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0].result, DispatchResult::Skipped { .. }));
    }

    #[tokio::test]
    async fn unknown_trigger_matches_nothing_without_error() {
        let fixture = Fixture::new();
        fixture.leads.save(lead(80, None)).await.expect("save lead");

        let outcomes = fixture
            .dispatcher()
            .dispatch(&LeadId("lead-1".to_owned()), "lead.deleted")
            .await
            .expect("dispatch");
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn missing_lead_is_a_data_integrity_failure() {
        let fixture = Fixture::new();
        let error = fixture
            .dispatcher()
            .dispatch(&LeadId("ghost".to_owned()), "lead.created")
            .await
            .expect_err("must fail");
        assert!(matches!(error, ApplicationError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn first_successful_send_advances_new_lead_to_contacted() {
        let fixture = Fixture::new();
        fixture.leads.save(lead(80, None)).await.expect("save lead");
        fixture
            .automations
            .save(automation("auto-welcome", ChannelKind::Sms, ConditionSet::default()))
            .await
            .expect("save");

        fixture
            .dispatcher()
            .dispatch(&LeadId("lead-1".to_owned()), "lead.created")
            .await
            .expect("dispatch");

        let updated = fixture
            .leads
            .find_by_id(&LeadId("lead-1".to_owned()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(updated.stage, LeadStage::Contacted);

        let events = fixture.events.all().await;
        assert!(events.iter().any(|event| event.event_type == LeadEventType::StageChange));
    }
}
