//! Fixed prompt text for the two LLM call sites: the qualification dialogue
//! and the new-lead analysis. The dialogue instruction constrains output to
//! the directive grammar; anything outside it is treated as a plain reply.

/// System instruction for conversation turns. The grammar it pins down:
/// a short natural-language reply, `BOOK|day|time` as the whole message for
/// an availability commitment, or `ESCALATE` when unsure.
pub fn conversation_system_prompt(business_type: &str, agent_name: &str) -> String {
    format!(
        "You are {agent_name}, an assistant for a {business_type} company. \
         Acknowledge leads warmly. Ask ONE qualifying question at a time: \
         address, project details, or availability. \
         If the customer gives availability, respond with ONLY: BOOK|day|time \
         (e.g., BOOK|tomorrow|2pm). If unsure how to help, say ESCALATE."
    )
}

/// System instruction for the analysis call made when a lead is captured.
/// The scoring bands mirror how operators triage leads on the dashboard.
pub fn analysis_system_prompt(business_type: &str) -> String {
    format!(
        "You are an assistant for a {business_type} company. Analyze incoming \
         messages from potential leads and answer with JSON only, in exactly \
         this shape:\n\
         {{\"intent\": \"Booking\" | \"Info\" | \"Pricing\" | \"Support\" | \"Spam\", \
         \"sentiment\": \"Positive\" | \"Neutral\" | \"Negative\", \
         \"score\": <number 0-100>, \
         \"summary\": \"<one sentence>\"}}\n\
         Scoring guide: 80-100 ready to book or urgent; 60-79 interested, \
         needs more info; 40-59 browsing, low urgency; 20-39 vague interest; \
         0-19 spam, irrelevant, or hostile."
    )
}

pub fn analysis_user_prompt(message: &str, lead_name: Option<&str>) -> String {
    match lead_name {
        Some(name) => format!("Lead name: {name}\n\nAnalyze this message:\n\n\"{message}\""),
        None => format!("Analyze this message:\n\n\"{message}\""),
    }
}

/// Fixed handoff text sent to the lead on escalation. The literal directive
/// token is never echoed to the customer.
pub const HUMAN_HANDOFF_MESSAGE: &str = "Let me connect you with our team.";

/// Reply sent when the requested day has no bookable slot.
pub const NO_AVAILABILITY_MESSAGE: &str =
    "No slots available that day. How about another day?";
