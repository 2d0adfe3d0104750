//! Public HTTP surface: lead capture, stage changes, notes, and the inbound
//! reply webhook. The webhook contract is provider-shaped: it always
//! acknowledges fast with an empty XML response, whatever happened inside.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{patch, post},
    Form, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use leadflow_agent::analysis::LeadAnalyzer;
use leadflow_agent::orchestrator::ConversationOrchestrator;
use leadflow_agent::triggers::TriggerDispatcher;
use leadflow_core::domain::event::{LeadEvent, LeadEventType};
use leadflow_core::domain::lead::{Lead, LeadId, LeadStage};
use leadflow_db::repositories::{LeadEventRepository, LeadRepository};

const WEBHOOK_ACK: &str = "<Response></Response>";

#[derive(Clone)]
pub struct ApiState {
    pub leads: Arc<dyn LeadRepository>,
    pub events: Arc<dyn LeadEventRepository>,
    pub analyzer: Arc<LeadAnalyzer>,
    pub dispatcher: Arc<TriggerDispatcher>,
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub default_user_id: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/leads", post(create_lead))
        .route("/api/leads/{id}/stage", patch(update_stage))
        .route("/api/leads/{id}/notes", post(add_note))
        .route("/webhooks/inbound", post(inbound_webhook))
        .with_state(state)
}

/// Run a trigger dispatch in the background. Failures are logged with full
/// context and never reach the caller; the returned handle makes the task
/// awaitable in tests and shutdown paths.
pub fn spawn_dispatch(
    dispatcher: Arc<TriggerDispatcher>,
    lead_id: LeadId,
    trigger: &'static str,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match dispatcher.dispatch(&lead_id, trigger).await {
            Ok(outcomes) => {
                info!(
                    event_name = "dispatch.background_completed",
                    lead_id = %lead_id.0,
                    trigger = trigger,
                    fired = outcomes.len(),
                    "background automation dispatch completed"
                );
            }
            Err(dispatch_error) => {
                error!(
                    event_name = "dispatch.background_failed",
                    lead_id = %lead_id.0,
                    trigger = trigger,
                    error = %dispatch_error,
                    "background automation dispatch failed"
                );
            }
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct CreateLeadResponse {
    lead_id: String,
    stage: &'static str,
    score: i64,
    intent: &'static str,
    sentiment: &'static str,
}

async fn create_lead(
    State(state): State<ApiState>,
    Json(request): Json<CreateLeadRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    let email = request.email.as_deref().map(str::trim).filter(|value| !value.is_empty());
    let phone = request.phone.as_deref().map(str::trim).filter(|value| !value.is_empty());
    if email.is_none() && phone.is_none() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "at least one of `email` or `phone` is required",
            &correlation_id,
        );
    }

    let name = request.name.as_deref().map(str::trim).filter(|value| !value.is_empty());
    let message_to_analyze = request
        .message
        .clone()
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "New lead: {} - {}",
                name.unwrap_or("Unknown"),
                email.or(phone).unwrap_or("No contact")
            )
        });

    // Analysis is synchronous with capture so the stored lead already
    // carries its triage score; the provider failing falls back to neutral
    // defaults inside the analyzer.
    let analysis = state.analyzer.analyze(&message_to_analyze, name).await;

    let now = Utc::now();
    let lead = Lead {
        id: LeadId::generate(),
        user_id: state.default_user_id.clone(),
        name: name.map(str::to_owned),
        email: email.map(str::to_owned),
        phone: phone.map(str::to_owned),
        source: request.source.clone(),
        stage: LeadStage::New,
        intent: Some(analysis.intent),
        sentiment: Some(analysis.sentiment),
        score: analysis.score,
        metadata: request.metadata.unwrap_or_else(|| json!({})),
        created_at: now,
        updated_at: now,
    };

    if let Err(save_error) = state.leads.save(lead.clone()).await {
        error!(
            event_name = "api.lead_create_failed",
            correlation_id = %correlation_id,
            error = %save_error,
            "lead could not be persisted"
        );
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "lead could not be persisted",
            &correlation_id,
        );
    }

    append_event(
        &state,
        LeadEvent::new(
            lead.id.clone(),
            LeadEventType::FormSubmit,
            request.message.unwrap_or_else(|| "Lead captured from landing page".to_owned()),
        )
        .with_metadata(json!({"source": lead.source})),
    )
    .await;
    append_event(
        &state,
        LeadEvent::new(lead.id.clone(), LeadEventType::AiAnalysis, analysis.summary.clone())
            .with_metadata(json!({
                "intent": analysis.intent.as_str(),
                "sentiment": analysis.sentiment.as_str(),
                "score": analysis.score,
            })),
    )
    .await;

    info!(
        event_name = "api.lead_created",
        correlation_id = %correlation_id,
        lead_id = %lead.id.0,
        score = analysis.score,
        intent = analysis.intent.as_str(),
        "lead captured and analyzed"
    );

    // Fire-and-forget: capture must respond regardless of automation
    // outcomes.
    let _dispatch = spawn_dispatch(state.dispatcher.clone(), lead.id.clone(), "lead.created");

    (
        StatusCode::CREATED,
        Json(CreateLeadResponse {
            lead_id: lead.id.0,
            stage: lead.stage.as_str(),
            score: analysis.score,
            intent: analysis.intent.as_str(),
            sentiment: analysis.sentiment.as_str(),
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct UpdateStageRequest {
    pub stage: String,
}

async fn update_stage(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStageRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    let Some(stage) = LeadStage::parse(request.stage.trim()) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("unknown stage `{}`", request.stage),
            &correlation_id,
        );
    };

    let lead_id = LeadId(id);
    let mut lead = match state.leads.find_by_id(&lead_id).await {
        Ok(Some(lead)) => lead,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, "lead not found", &correlation_id);
        }
        Err(load_error) => {
            error!(
                event_name = "api.stage_update_failed",
                correlation_id = %correlation_id,
                error = %load_error,
                "lead lookup failed"
            );
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "lead lookup failed",
                &correlation_id,
            );
        }
    };

    lead.stage = stage;
    lead.updated_at = Utc::now();
    if let Err(save_error) = state.leads.save(lead.clone()).await {
        error!(
            event_name = "api.stage_update_failed",
            correlation_id = %correlation_id,
            error = %save_error,
            "stage change could not be persisted"
        );
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "stage change could not be persisted",
            &correlation_id,
        );
    }

    append_event(
        &state,
        LeadEvent::new(
            lead.id.clone(),
            LeadEventType::StageChange,
            format!("Stage changed to {}", stage.as_str()),
        )
        .with_metadata(json!({"new_stage": stage.as_str()})),
    )
    .await;

    let _dispatch = spawn_dispatch(state.dispatcher.clone(), lead.id.clone(), "lead.stage_changed");

    (StatusCode::OK, Json(json!({"lead_id": lead.id.0, "stage": stage.as_str()}))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub note: String,
}

async fn add_note(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<AddNoteRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    let note = request.note.trim();
    if note.is_empty() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "`note` must not be empty",
            &correlation_id,
        );
    }

    let lead_id = LeadId(id);
    match state.leads.find_by_id(&lead_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, "lead not found", &correlation_id);
        }
        Err(load_error) => {
            error!(
                event_name = "api.note_failed",
                correlation_id = %correlation_id,
                error = %load_error,
                "lead lookup failed"
            );
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "lead lookup failed",
                &correlation_id,
            );
        }
    }

    append_event(&state, LeadEvent::new(lead_id.clone(), LeadEventType::NoteAdded, note)).await;

    (StatusCode::CREATED, Json(json!({"lead_id": lead_id.0}))).into_response()
}

/// Inbound reply payload. Accepts both the JSON shape used internally and
/// the capitalized form fields SMS providers post.
#[derive(Debug, Deserialize)]
pub struct InboundWebhookRequest {
    #[serde(alias = "From", alias = "contactHandle", alias = "contact_handle")]
    pub from: Option<String>,
    #[serde(alias = "Body", alias = "text")]
    pub body: Option<String>,
}

async fn inbound_webhook(State(state): State<ApiState>, request: Request) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    match extract_inbound(request).await {
        Some(InboundWebhookRequest { from: Some(from), body: Some(body) }) => {
            match state.orchestrator.handle_inbound(&from, &body).await {
                Ok(outcome) => {
                    info!(
                        event_name = "webhook.inbound_processed",
                        correlation_id = %correlation_id,
                        handle = %from,
                        outcome = ?outcome,
                        "inbound reply processed"
                    );
                }
                Err(turn_error) => {
                    // The delivery contract demands a fast empty ack no
                    // matter what happened downstream.
                    let interface_error = turn_error.into_interface(correlation_id.clone());
                    error!(
                        event_name = "webhook.inbound_failed",
                        correlation_id = %correlation_id,
                        handle = %from,
                        error = %interface_error,
                        user_message = interface_error.user_message(),
                        "inbound reply failed internally, acknowledging anyway"
                    );
                }
            }
        }
        _ => {
            warn!(
                event_name = "webhook.inbound_malformed",
                correlation_id = %correlation_id,
                "inbound webhook payload missing sender or body, acknowledging anyway"
            );
        }
    }

    webhook_ack()
}

async fn extract_inbound(request: Request) -> Option<InboundWebhookRequest> {
    if is_json(request.headers()) {
        let bytes = Bytes::from_request(request, &()).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    } else {
        Form::<InboundWebhookRequest>::from_request(request, &())
            .await
            .ok()
            .map(|Form(payload)| payload)
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

fn webhook_ack() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        WEBHOOK_ACK,
    )
        .into_response()
}

fn error_response(status: StatusCode, message: &str, correlation_id: &str) -> Response {
    (
        status,
        Json(json!({"error": message, "correlation_id": correlation_id})),
    )
        .into_response()
}

async fn append_event(state: &ApiState, event: LeadEvent) {
    if let Err(append_error) = state.events.append(event).await {
        warn!(
            event_name = "api.event_append_failed",
            error = %append_error,
            "lead event could not be appended"
        );
    }
}
