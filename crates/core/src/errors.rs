use thiserror::Error;

use crate::domain::conversation::ConversationStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid conversation transition from {from:?} to {to:?}")]
    InvalidConversationTransition { from: ConversationStatus, to: ConversationStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Engine-level failures. Note what is absent: losing the booking race is a
/// normal business outcome (`Reservation::Unavailable`), never an error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("validation failure: {0}")]
    Validation(String),
    #[error("provider failure ({provider}): {message}")]
    Provider { provider: &'static str, message: String },
    #[error("data integrity failure: {0}")]
    DataIntegrity(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ApplicationError {
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Provider { provider, message: message.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested record was not found.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(_) | ApplicationError::Validation(_) => Self::BadRequest {
                message: "request validation failed".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::DataIntegrity(message) => {
                Self::NotFound { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Provider { message, .. } | ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
