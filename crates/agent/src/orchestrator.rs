use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde_json::json;
use tracing::{debug, error, info, warn};

use leadflow_channels::outbound::ChannelSender;
use leadflow_channels::retry::{send_with_retry, SendRetryPolicy};
use leadflow_core::directive::{parse_directive, Directive};
use leadflow_core::domain::booking::{resolve_day_token, Reservation, Slot};
use leadflow_core::domain::conversation::{ConversationState, ConversationStatus, MessageRole};
use leadflow_core::domain::event::{LeadEvent, LeadEventType};
use leadflow_core::domain::lead::Lead;
use leadflow_core::errors::ApplicationError;
use leadflow_db::repositories::{
    ConversationRepository, LeadEventRepository, LeadRepository, RepositoryError,
};

use crate::booking::BookingAllocator;
use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::locks::KeyedLocks;
use crate::prompts::{
    conversation_system_prompt, HUMAN_HANDOFF_MESSAGE, NO_AVAILABILITY_MESSAGE,
};

/// Result of one inbound turn. Every variant is an acknowledgment-class
/// outcome; the webhook layer acks regardless.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied { body: String, delivered: bool },
    Escalated,
    Booked { slot: Slot },
    NoAvailability,
    /// Conversation is terminal: the message was stored for human review,
    /// no AI turn was taken.
    RecordedOnly,
    /// Provider failure or timeout: the inbound message is durably recorded
    /// and the conversation stays Active; no outbound reply was produced.
    NoReply,
    UnknownContact,
}

#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    pub business_type: String,
    pub agent_name: String,
    pub operator_phone: Option<String>,
    pub llm_timeout: Duration,
    pub retry: SendRetryPolicy,
}

/// Drives the per-lead qualification dialogue: one inbound message in, one
/// AI completion, one parsed directive, one outbound action. A whole turn
/// runs under the per-contact-handle lock, so concurrent inbound messages
/// for one lead serialize and each observes the previous turn's completed
/// state.
pub struct ConversationOrchestrator {
    leads: Arc<dyn LeadRepository>,
    conversations: Arc<dyn ConversationRepository>,
    events: Arc<dyn LeadEventRepository>,
    llm: Arc<dyn LlmClient>,
    sms: Arc<dyn ChannelSender>,
    allocator: Arc<BookingAllocator>,
    handle_locks: KeyedLocks,
    settings: OrchestratorSettings,
}

impl ConversationOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        leads: Arc<dyn LeadRepository>,
        conversations: Arc<dyn ConversationRepository>,
        events: Arc<dyn LeadEventRepository>,
        llm: Arc<dyn LlmClient>,
        sms: Arc<dyn ChannelSender>,
        allocator: Arc<BookingAllocator>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            leads,
            conversations,
            events,
            llm,
            sms,
            allocator,
            handle_locks: KeyedLocks::new(),
            settings,
        }
    }

    pub async fn handle_inbound(
        &self,
        contact_handle: &str,
        text: &str,
    ) -> Result<TurnOutcome, ApplicationError> {
        let handle = contact_handle.trim();
        if handle.is_empty() {
            return Err(ApplicationError::Validation("contact handle is required".to_owned()));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ApplicationError::Validation("message text is required".to_owned()));
        }

        let Some(lead) = self.leads.find_by_handle(handle).await.map_err(persistence)? else {
            warn!(
                event_name = "conversation.unknown_contact",
                handle = handle,
                "inbound message from a handle with no lead, acknowledging without state"
            );
            return Ok(TurnOutcome::UnknownContact);
        };

        let _guard = self.handle_locks.acquire(handle).await;

        let mut conversation =
            match self.conversations.find_by_handle(handle).await.map_err(persistence)? {
                Some(conversation) => conversation,
                None => ConversationState::open(handle, lead.id.clone()),
            };

        // The inbound fact is durable before anything downstream can fail:
        // a provider outage must never lose the customer's message.
        conversation.push_message(MessageRole::User, text);
        self.conversations.save(conversation.clone()).await.map_err(persistence)?;
        self.append_event(
            LeadEvent::new(lead.id.clone(), LeadEventType::SmsReceived, text)
                .with_metadata(json!({"handle": handle})),
        )
        .await;

        if conversation.status.is_terminal() {
            conversation.needs_human = true;
            self.conversations.save(conversation.clone()).await.map_err(persistence)?;
            self.append_event(LeadEvent::new(
                lead.id.clone(),
                LeadEventType::NeedsHuman,
                "Inbound message on a closed conversation awaits human review",
            ))
            .await;
            info!(
                event_name = "conversation.terminal_inbound_recorded",
                lead_id = %lead.id.0,
                handle = handle,
                status = conversation.status.as_str(),
                "terminal conversation, message queued for human review"
            );
            return Ok(TurnOutcome::RecordedOnly);
        }

        let request = CompletionRequest {
            system: conversation_system_prompt(
                &self.settings.business_type,
                &self.settings.agent_name,
            ),
            messages: conversation
                .messages
                .iter()
                .map(|message| ChatMessage { role: message.role, content: message.content.clone() })
                .collect(),
        };

        let output =
            match tokio::time::timeout(self.settings.llm_timeout, self.llm.complete(&request))
                .await
            {
                Ok(Ok(output)) => output,
                Ok(Err(llm_error)) => {
                    error!(
                        event_name = "conversation.ai_call_failed",
                        lead_id = %lead.id.0,
                        handle = handle,
                        error = %llm_error,
                        "ai completion failed, inbound recorded without reply"
                    );
                    return Ok(TurnOutcome::NoReply);
                }
                Err(_) => {
                    error!(
                        event_name = "conversation.ai_call_timeout",
                        lead_id = %lead.id.0,
                        handle = handle,
                        timeout_secs = self.settings.llm_timeout.as_secs(),
                        "ai completion timed out, inbound recorded without reply"
                    );
                    return Ok(TurnOutcome::NoReply);
                }
            };

        conversation.push_message(MessageRole::Assistant, output.clone());

        match parse_directive(&output) {
            Directive::Escalate => self.escalate(&lead, handle, conversation).await,
            Directive::BookRequest { day, time } => {
                self.book(&lead, handle, conversation, &day, time.as_deref()).await
            }
            Directive::PlainReply(body) => {
                self.conversations.save(conversation).await.map_err(persistence)?;
                let delivered = self.send_to_lead(&lead, handle, &body).await;
                Ok(TurnOutcome::Replied { body, delivered })
            }
        }
    }

    async fn escalate(
        &self,
        lead: &Lead,
        handle: &str,
        mut conversation: ConversationState,
    ) -> Result<TurnOutcome, ApplicationError> {
        conversation.transition_to(ConversationStatus::Escalated)?;
        conversation.needs_human = true;
        self.conversations.save(conversation).await.map_err(persistence)?;

        self.append_event(LeadEvent::new(
            lead.id.clone(),
            LeadEventType::NeedsHuman,
            "Conversation escalated to a human operator",
        ))
        .await;

        // The customer gets the fixed handoff text, never the directive
        // token itself.
        self.send_to_lead(lead, handle, HUMAN_HANDOFF_MESSAGE).await;

        info!(
            event_name = "conversation.escalated",
            lead_id = %lead.id.0,
            handle = handle,
            "conversation handed off to a human"
        );
        Ok(TurnOutcome::Escalated)
    }

    async fn book(
        &self,
        lead: &Lead,
        handle: &str,
        mut conversation: ConversationState,
        day_token: &str,
        time_token: Option<&str>,
    ) -> Result<TurnOutcome, ApplicationError> {
        let day = resolve_day_token(day_token, Local::now().date_naive());
        debug!(
            event_name = "conversation.booking_requested",
            lead_id = %lead.id.0,
            handle = handle,
            day_token = day_token,
            time_token = time_token.unwrap_or(""),
            resolved_day = %day,
            "booking directive parsed; time token is advisory only"
        );

        match self.allocator.reserve(day).await {
            Reservation::Booked(slot) => {
                conversation.transition_to(ConversationStatus::Booked)?;
                self.conversations.save(conversation).await.map_err(persistence)?;

                let confirmation = format!("Appointment booked for {}!", slot.human_start());
                self.send_to_lead(lead, handle, &confirmation).await;
                self.notify_operator(lead, &slot).await;
                self.append_event(
                    LeadEvent::new(lead.id.clone(), LeadEventType::BookingConfirmed, confirmation)
                        .with_metadata(json!({
                            "slot_start": slot.start.to_rfc3339(),
                            "slot_end": slot.end.to_rfc3339(),
                        })),
                )
                .await;

                Ok(TurnOutcome::Booked { slot })
            }
            Reservation::Unavailable => {
                // Recoverable business outcome: the conversation stays
                // Active and the lead is asked for another day.
                self.conversations.save(conversation).await.map_err(persistence)?;
                self.send_to_lead(lead, handle, NO_AVAILABILITY_MESSAGE).await;
                self.append_event(LeadEvent::new(
                    lead.id.clone(),
                    LeadEventType::BookingUnavailable,
                    NO_AVAILABILITY_MESSAGE,
                ))
                .await;

                Ok(TurnOutcome::NoAvailability)
            }
        }
    }

    async fn send_to_lead(&self, lead: &Lead, handle: &str, body: &str) -> bool {
        match send_with_retry(self.sms.as_ref(), handle, body, self.settings.retry).await {
            Ok(delivery_id) => {
                self.append_event(
                    LeadEvent::new(lead.id.clone(), LeadEventType::SmsSent, body)
                        .with_metadata(json!({"delivery_id": delivery_id.0})),
                )
                .await;
                true
            }
            Err(send_error) => {
                error!(
                    event_name = "conversation.outbound_send_failed",
                    lead_id = %lead.id.0,
                    handle = handle,
                    error = %send_error,
                    "outbound reply could not be delivered after retries"
                );
                false
            }
        }
    }

    async fn notify_operator(&self, lead: &Lead, slot: &Slot) {
        let Some(operator_phone) = self.settings.operator_phone.as_deref() else {
            return;
        };

        let notice = format!(
            "New booking: {} at {}",
            lead.name.as_deref().unwrap_or("unknown lead"),
            slot.human_start()
        );
        if let Err(notify_error) =
            send_with_retry(self.sms.as_ref(), operator_phone, &notice, self.settings.retry).await
        {
            warn!(
                event_name = "conversation.operator_notify_failed",
                lead_id = %lead.id.0,
                error = %notify_error,
                "operator booking notification could not be delivered"
            );
        }
    }

    async fn append_event(&self, event: LeadEvent) {
        if let Err(append_error) = self.events.append(event).await {
            warn!(
                event_name = "conversation.event_append_failed",
                error = %append_error,
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
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{Local, Utc};
    use serde_json::json;

    use leadflow_channels::calendar::{
        CalendarEventRequest, CalendarProvider, InMemoryCalendarProvider,
    };
    use leadflow_channels::outbound::RecordingChannelSender;
    use leadflow_channels::retry::SendRetryPolicy;
    use leadflow_core::domain::conversation::ConversationStatus;
    use leadflow_core::domain::event::LeadEventType;
    use leadflow_core::domain::lead::{Lead, LeadId, LeadStage};
    use leadflow_core::errors::ApplicationError;
    use leadflow_db::repositories::{
        ConversationRepository, InMemoryConversationRepository, InMemoryLeadEventRepository,
        InMemoryLeadRepository, LeadRepository,
    };

    use super::{ConversationOrchestrator, OrchestratorSettings, TurnOutcome};
    use crate::booking::{BookingAllocator, BookingWindow};
    use crate::llm::{CompletionRequest, LlmClient};

    const HANDLE: &str = "+15550001111";
    const OPERATOR: &str = "+15550009999";

    struct ScriptedLlm {
        responses: Mutex<VecDeque<String>>,
        calls: AtomicU32,
    }

    impl ScriptedLlm {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(
                    responses.iter().map(|response| (*response).to_owned()).collect(),
                ),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap_or_else(|err| err.into_inner());
            Ok(responses.pop_front().unwrap_or_else(|| "Thanks for the details!".to_owned()))
        }
    }

    struct SlowLlm {
        delay: Duration,
    }

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok("too late".to_owned())
        }
    }

    struct Fixture {
        leads: Arc<InMemoryLeadRepository>,
        conversations: Arc<InMemoryConversationRepository>,
        events: Arc<InMemoryLeadEventRepository>,
        sms: Arc<RecordingChannelSender>,
        calendar: Arc<InMemoryCalendarProvider>,
    }

    impl Fixture {
        async fn new() -> Self {
            let fixture = Self {
                leads: Arc::new(InMemoryLeadRepository::default()),
                conversations: Arc::new(InMemoryConversationRepository::default()),
                events: Arc::new(InMemoryLeadEventRepository::default()),
                sms: Arc::new(RecordingChannelSender::new()),
                calendar: Arc::new(InMemoryCalendarProvider::new()),
            };
            fixture.leads.save(lead("lead-1", HANDLE)).await.expect("save lead");
            fixture
        }

        fn orchestrator(&self, llm: Arc<dyn LlmClient>) -> ConversationOrchestrator {
            ConversationOrchestrator::new(
                self.leads.clone(),
                self.conversations.clone(),
                self.events.clone(),
                llm,
                self.sms.clone(),
                Arc::new(BookingAllocator::new(self.calendar.clone(), BookingWindow::default())),
                OrchestratorSettings {
                    business_type: "roofing".to_owned(),
                    agent_name: "Riley".to_owned(),
                    operator_phone: Some(OPERATOR.to_owned()),
                    llm_timeout: Duration::from_secs(5),
                    retry: SendRetryPolicy::new(0, Duration::from_millis(1)),
                },
            )
        }
    }

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
    async fn plain_reply_extends_history_and_sends_verbatim() {
        let fixture = Fixture::new().await;
        let orchestrator =
            fixture.orchestrator(Arc::new(ScriptedLlm::new(&["What's your address?"])));

        let outcome = orchestrator
            .handle_inbound(HANDLE, "My roof is leaking")
            .await
            .expect("turn succeeds");

        assert_eq!(
            outcome,
            TurnOutcome::Replied { body: "What's your address?".to_owned(), delivered: true }
        );

        let conversation = fixture
            .conversations
            .find_by_handle(HANDLE)
            .await
            .expect("query")
            .expect("conversation exists");
        assert_eq!(conversation.status, ConversationStatus::Active);
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].content, "My roof is leaking");
        assert_eq!(conversation.messages[1].content, "What's your address?");

        let sent = fixture.sms.sent();
        assert_eq!(sent, vec![(HANDLE.to_owned(), "What's your address?".to_owned())]);
    }

    #[tokio::test]
    async fn escalate_directive_hands_off_without_echoing_the_token() {
        let fixture = Fixture::new().await;
        let orchestrator = fixture.orchestrator(Arc::new(ScriptedLlm::new(&["ESCALATE"])));

        let outcome = orchestrator
            .handle_inbound(HANDLE, "I want to talk about my invoice from 2019")
            .await
            .expect("turn succeeds");
        assert_eq!(outcome, TurnOutcome::Escalated);

        let conversation =
            fixture.conversations.find_by_handle(HANDLE).await.expect("query").expect("exists");
        assert_eq!(conversation.status, ConversationStatus::Escalated);
        assert!(conversation.needs_human);

        let sent = fixture.sms.sent();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].1.contains("ESCALATE"));

        let events = fixture.events.all().await;
        assert!(events.iter().any(|event| event.event_type == LeadEventType::NeedsHuman));
    }

    #[tokio::test]
    async fn booking_directive_reserves_slot_and_confirms_with_start_time() {
        let fixture = Fixture::new().await;
        let orchestrator =
            fixture.orchestrator(Arc::new(ScriptedLlm::new(&["BOOK|tomorrow|2pm"])));

        let outcome = orchestrator
            .handle_inbound(HANDLE, "Let's do tomorrow at 2pm")
            .await
            .expect("turn succeeds");

        let TurnOutcome::Booked { slot } = outcome else {
            panic!("expected a booked outcome");
        };

        let conversation =
            fixture.conversations.find_by_handle(HANDLE).await.expect("query").expect("exists");
        assert_eq!(conversation.status, ConversationStatus::Booked);

        // Lead confirmation first, then the out-of-band operator notice.
        let sent = fixture.sms.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, HANDLE);
        assert!(sent[0].1.contains(&slot.human_start()));
        assert_eq!(sent[1].0, OPERATOR);
        assert!(sent[1].1.contains("New booking: Dana"));

        assert_eq!(fixture.calendar.events().len(), 1);
        let events = fixture.events.all().await;
        assert!(events.iter().any(|event| event.event_type == LeadEventType::BookingConfirmed));
    }

    #[tokio::test]
    async fn second_booking_for_a_full_day_gets_no_availability() {
        let fixture = Fixture::new().await;
        fixture.leads.save(lead("lead-2", "+15550002222")).await.expect("save second lead");

        let orchestrator = fixture.orchestrator(Arc::new(ScriptedLlm::new(&[
            "BOOK|tomorrow|2pm",
            "BOOK|tomorrow|4pm",
        ])));

        let first = orchestrator
            .handle_inbound(HANDLE, "tomorrow at 2 works")
            .await
            .expect("first turn");
        assert!(matches!(first, TurnOutcome::Booked { .. }));

        let second = orchestrator
            .handle_inbound("+15550002222", "tomorrow at 4 works")
            .await
            .expect("second turn");
        assert_eq!(second, TurnOutcome::NoAvailability);

        // The losing lead stays Active and was told to try another day.
        let conversation = fixture
            .conversations
            .find_by_handle("+15550002222")
            .await
            .expect("query")
            .expect("exists");
        assert_eq!(conversation.status, ConversationStatus::Active);

        let events = fixture.events.all().await;
        assert!(events
            .iter()
            .any(|event| event.event_type == LeadEventType::BookingUnavailable));
        assert_eq!(fixture.calendar.events().len(), 1);
    }

    #[tokio::test]
    async fn terminal_conversations_record_inbound_without_ai_turns() {
        let fixture = Fixture::new().await;
        let llm = Arc::new(ScriptedLlm::new(&["ESCALATE"]));
        let orchestrator = fixture.orchestrator(llm.clone());

        orchestrator.handle_inbound(HANDLE, "talk to a person please").await.expect("escalates");
        assert_eq!(llm.calls(), 1);

        let outcome = orchestrator
            .handle_inbound(HANDLE, "hello? anyone there?")
            .await
            .expect("recorded");
        assert_eq!(outcome, TurnOutcome::RecordedOnly);
        assert_eq!(llm.calls(), 1, "no further ai call after a terminal state");

        let conversation =
            fixture.conversations.find_by_handle(HANDLE).await.expect("query").expect("exists");
        assert_eq!(conversation.status, ConversationStatus::Escalated);
        let last = conversation.messages.last().expect("has messages");
        assert_eq!(last.content, "hello? anyone there?");
    }

    #[tokio::test(start_paused = true)]
    async fn ai_timeout_records_inbound_and_leaves_conversation_active() {
        let fixture = Fixture::new().await;
        let orchestrator =
            fixture.orchestrator(Arc::new(SlowLlm { delay: Duration::from_secs(120) }));

        let outcome = orchestrator
            .handle_inbound(HANDLE, "are you still there?")
            .await
            .expect("turn completes");
        assert_eq!(outcome, TurnOutcome::NoReply);

        let conversation =
            fixture.conversations.find_by_handle(HANDLE).await.expect("query").expect("exists");
        assert_eq!(conversation.status, ConversationStatus::Active);
        assert_eq!(conversation.messages.len(), 1);
        assert!(fixture.sms.sent().is_empty());

        let events = fixture.events.all().await;
        assert!(events.iter().any(|event| event.event_type == LeadEventType::SmsReceived));

        // The next inbound message is processed normally.
        let orchestrator = fixture.orchestrator(Arc::new(ScriptedLlm::new(&["Still here!"])));
        let outcome = orchestrator.handle_inbound(HANDLE, "hello?").await.expect("next turn");
        assert!(matches!(outcome, TurnOutcome::Replied { .. }));
    }

    #[tokio::test]
    async fn concurrent_turns_for_one_handle_interleave_nothing() {
        let fixture = Fixture::new().await;
        let orchestrator = Arc::new(
            fixture.orchestrator(Arc::new(ScriptedLlm::new(&["Reply one", "Reply two"]))),
        );

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.handle_inbound(HANDLE, "message A").await })
        };
        let second = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.handle_inbound(HANDLE, "message B").await })
        };

        first.await.expect("join").expect("turn");
        second.await.expect("join").expect("turn");

        let conversation =
            fixture.conversations.find_by_handle(HANDLE).await.expect("query").expect("exists");

        // Two turns, two messages each: nothing lost, nothing duplicated.
        assert_eq!(conversation.messages.len(), 4);
        let positions: Vec<i64> =
            conversation.messages.iter().map(|message| message.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
        assert_eq!(fixture.sms.sent().len(), 2);
    }

    #[tokio::test]
    async fn unknown_handle_acks_without_creating_state() {
        let fixture = Fixture::new().await;
        let llm = Arc::new(ScriptedLlm::new(&[]));
        let orchestrator = fixture.orchestrator(llm.clone());

        let outcome = orchestrator
            .handle_inbound("+15557770000", "who dis")
            .await
            .expect("acknowledged");
        assert_eq!(outcome, TurnOutcome::UnknownContact);
        assert_eq!(llm.calls(), 0);
        assert!(fixture
            .conversations
            .find_by_handle("+15557770000")
            .await
            .expect("query")
            .is_none());
    }

    #[tokio::test]
    async fn blank_handle_is_rejected_before_any_side_effect() {
        let fixture = Fixture::new().await;
        let orchestrator = fixture.orchestrator(Arc::new(ScriptedLlm::new(&[])));

        let error = orchestrator.handle_inbound("   ", "hello").await.expect_err("must reject");
        assert!(matches!(error, ApplicationError::Validation(_)));
        assert!(fixture.events.all().await.is_empty());
    }

    #[tokio::test]
    async fn full_day_prevents_booking_even_for_first_request() {
        let fixture = Fixture::new().await;

        // Pre-existing event anywhere in the window books out the whole day.
        let tomorrow = Local::now().date_naive() + chrono::Duration::days(1);
        let busy_start = crate::booking::local_hour_on(tomorrow, 12);
        fixture
            .calendar
            .insert(CalendarEventRequest {
                summary: "Existing visit".to_owned(),
                start: busy_start,
                end: busy_start + chrono::Duration::hours(1),
            })
            .await
            .expect("seed calendar");

        let orchestrator =
            fixture.orchestrator(Arc::new(ScriptedLlm::new(&["BOOK|tomorrow|2pm"])));
        let outcome =
            orchestrator.handle_inbound(HANDLE, "tomorrow?").await.expect("turn succeeds");
        assert_eq!(outcome, TurnOutcome::NoAvailability);
    }
}
