use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use leadflow_core::domain::lead::{clamp_score, Intent, Sentiment};

use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::{analysis_system_prompt, analysis_user_prompt};

/// Structured result of analyzing one inbound lead message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub intent: Intent,
    pub sentiment: Sentiment,
    pub score: i64,
    pub summary: String,
}

impl AnalysisOutcome {
    /// Neutral defaults used when the provider fails or returns something
    /// unparseable. Capture must not fail because analysis did.
    pub fn fallback() -> Self {
        Self {
            intent: Intent::Info,
            sentiment: Sentiment::Neutral,
            score: 50,
            summary: "Unable to analyze message automatically".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    intent: String,
    sentiment: String,
    score: i64,
    #[serde(default)]
    summary: Option<String>,
}

/// Synchronous (per-request) lead analysis at capture time: one LLM call,
/// JSON out, with a total fallback.
pub struct LeadAnalyzer {
    llm: Arc<dyn LlmClient>,
    business_type: String,
    timeout: Duration,
}

impl LeadAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, business_type: impl Into<String>, timeout: Duration) -> Self {
        Self { llm, business_type: business_type.into(), timeout }
    }

    pub async fn analyze(&self, message: &str, lead_name: Option<&str>) -> AnalysisOutcome {
        let request = CompletionRequest {
            system: analysis_system_prompt(&self.business_type),
            messages: vec![crate::llm::ChatMessage {
                role: leadflow_core::domain::conversation::MessageRole::User,
                content: analysis_user_prompt(message, lead_name),
            }],
        };

        let output = match tokio::time::timeout(self.timeout, self.llm.complete(&request)).await {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => {
                warn!(
                    event_name = "analysis.provider_failed",
                    error = %error,
                    "lead analysis call failed, using fallback"
                );
                return AnalysisOutcome::fallback();
            }
            Err(_) => {
                warn!(
                    event_name = "analysis.provider_timeout",
                    timeout_secs = self.timeout.as_secs(),
                    "lead analysis call timed out, using fallback"
                );
                return AnalysisOutcome::fallback();
            }
        };

        match parse_analysis(&output) {
            Some(outcome) => outcome,
            None => {
                warn!(
                    event_name = "analysis.unparseable_output",
                    output_len = output.len(),
                    "lead analysis output did not match the expected JSON shape"
                );
                AnalysisOutcome::fallback()
            }
        }
    }
}

fn parse_analysis(output: &str) -> Option<AnalysisOutcome> {
    let raw: RawAnalysis = serde_json::from_str(output.trim()).ok()?;

    Some(AnalysisOutcome {
        intent: Intent::parse(&raw.intent)?,
        sentiment: Sentiment::parse(&raw.sentiment)?,
        score: clamp_score(raw.score),
        summary: raw.summary.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;

    use leadflow_core::domain::lead::{Intent, Sentiment};

    use super::{parse_analysis, AnalysisOutcome, LeadAnalyzer};
    use crate::llm::{CompletionRequest, LlmClient};

    struct FixedLlm(&'static str);

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            Ok(self.0.to_owned())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            Err(anyhow::anyhow!("provider outage"))
        }
    }

    #[test]
    fn well_formed_json_parses_with_clamped_score() {
        let outcome = parse_analysis(
            r#"{"intent": "Booking", "sentiment": "Positive", "score": 140, "summary": "wants an inspection"}"#,
        )
        .expect("parse analysis");

        assert_eq!(outcome.intent, Intent::Booking);
        assert_eq!(outcome.sentiment, Sentiment::Positive);
        assert_eq!(outcome.score, 100);
        assert_eq!(outcome.summary, "wants an inspection");
    }

    #[test]
    fn unknown_labels_and_prose_fail_parsing() {
        assert!(parse_analysis(r#"{"intent": "Buying", "sentiment": "Positive", "score": 10}"#)
            .is_none());
        assert!(parse_analysis("happy to help!").is_none());
    }

    #[tokio::test]
    async fn analyzer_returns_parsed_outcome() {
        let analyzer = LeadAnalyzer::new(
            Arc::new(FixedLlm(
                r#"{"intent": "Pricing", "sentiment": "Neutral", "score": 65, "summary": "asked for a quote"}"#,
            )),
            "roofing",
            Duration::from_secs(5),
        );

        let outcome = analyzer.analyze("how much for a new roof?", Some("Dana")).await;
        assert_eq!(outcome.intent, Intent::Pricing);
        assert_eq!(outcome.score, 65);
    }

    #[tokio::test]
    async fn provider_failure_yields_fallback() {
        let analyzer =
            LeadAnalyzer::new(Arc::new(FailingLlm), "roofing", Duration::from_secs(5));
        let outcome = analyzer.analyze("hello", None).await;
        assert_eq!(outcome, AnalysisOutcome::fallback());
    }
}
