pub mod config;
pub mod directive;
pub mod domain;
pub mod errors;
pub mod template;

pub use directive::{parse_directive, Directive};
pub use domain::automation::{
    Automation, AutomationId, ChannelKind, ConditionSet, TriggerName,
};
pub use domain::booking::{resolve_day_token, BusyInterval, Reservation, Slot};
pub use domain::conversation::{
    ConversationId, ConversationMessage, ConversationState, ConversationStatus, MessageRole,
};
pub use domain::event::{LeadEvent, LeadEventId, LeadEventType};
pub use domain::lead::{clamp_score, Intent, Lead, LeadId, LeadSnapshot, LeadStage, Sentiment};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use template::{render, TemplateVars};
