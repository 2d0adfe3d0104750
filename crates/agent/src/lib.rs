//! The lead engagement engine: trigger dispatch over automation rules, the
//! per-lead conversational state machine, the booking allocator, and the LLM
//! client they share.

pub mod analysis;
pub mod booking;
pub mod llm;
pub mod locks;
pub mod orchestrator;
pub mod prompts;
pub mod triggers;

pub use analysis::{AnalysisOutcome, LeadAnalyzer};
pub use booking::{BookingAllocator, BookingWindow, BOOKING_EVENT_SUMMARY};
pub use llm::{ChatMessage, CompletionRequest, HttpLlmClient, LlmClient};
pub use locks::KeyedLocks;
pub use orchestrator::{ConversationOrchestrator, OrchestratorSettings, TurnOutcome};
pub use triggers::{DispatchOutcome, DispatchResult, TriggerDispatcher};
