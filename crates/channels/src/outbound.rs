use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use leadflow_core::domain::automation::ChannelKind;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryId(pub String);

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("provider response could not be decoded: {0}")]
    Decode(String),
}

/// Outbound message transport. Implementations must be safe to call from
/// concurrent conversation turns.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryId, ChannelError>;
}

/// Routes a channel kind to its configured sender. A channel with no sender
/// is simply unroutable; callers skip it rather than failing the dispatch.
#[derive(Clone, Default)]
pub struct ChannelRouter {
    sms: Option<Arc<dyn ChannelSender>>,
    email: Option<Arc<dyn ChannelSender>>,
}

impl ChannelRouter {
    pub fn new(
        sms: Option<Arc<dyn ChannelSender>>,
        email: Option<Arc<dyn ChannelSender>>,
    ) -> Self {
        Self { sms, email }
    }

    pub fn sender_for(&self, kind: ChannelKind) -> Option<Arc<dyn ChannelSender>> {
        match kind {
            ChannelKind::Sms => self.sms.clone(),
            ChannelKind::Email => self.email.clone(),
        }
    }
}

/// Development/no-op transport: logs the message and succeeds. Used when a
/// channel is not configured but the engine should still run end to end.
#[derive(Clone, Debug, Default)]
pub struct NoopChannelSender {
    label: &'static str,
}

impl NoopChannelSender {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

#[async_trait]
impl ChannelSender for NoopChannelSender {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryId, ChannelError> {
        tracing::info!(
            event_name = "channel.noop.send",
            channel = self.label,
            to = to,
            body_len = body.len(),
            "noop transport swallowed outbound message"
        );
        Ok(DeliveryId(format!("noop-{}", Uuid::new_v4())))
    }
}

/// Test double that records every send and can be primed to fail the first
/// N attempts or every attempt.
#[derive(Default)]
pub struct RecordingChannelSender {
    sent: Mutex<Vec<(String, String)>>,
    failures_remaining: Mutex<u32>,
    always_fail: bool,
}

impl RecordingChannelSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(failures: u32) -> Self {
        Self { failures_remaining: Mutex::new(failures), ..Self::default() }
    }

    pub fn always_failing() -> Self {
        Self { always_fail: true, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ChannelSender for RecordingChannelSender {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryId, ChannelError> {
        if self.always_fail {
            return Err(ChannelError::Rejected { status: 503, body: "unavailable".to_owned() });
        }

        {
            let mut failures = match self.failures_remaining.lock() {
                Ok(failures) => failures,
                Err(poisoned) => poisoned.into_inner(),
            };
            if *failures > 0 {
                *failures -= 1;
                return Err(ChannelError::Rejected {
                    status: 503,
                    body: "unavailable".to_owned(),
                });
            }
        }

        let mut sent = match self.sent.lock() {
            Ok(sent) => sent,
            Err(poisoned) => poisoned.into_inner(),
        };
        sent.push((to.to_owned(), body.to_owned()));
        Ok(DeliveryId(format!("recorded-{}", sent.len())))
    }
}
