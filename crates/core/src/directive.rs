//! Parser for the constrained grammar the AI completion provider is
//! instructed to emit: a plain natural-language reply, the bare `ESCALATE`
//! token, or a structured `BOOK|<day>|<time>` request.

use serde::{Deserialize, Serialize};

/// The structured instruction extracted from one AI completion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    PlainReply(String),
    Escalate,
    BookRequest { day: String, time: Option<String> },
}

/// Parse raw AI output into a [`Directive`].
///
/// Precedence is deliberate and matches the upstream dialogue exactly:
/// the case-sensitive `ESCALATE` substring is checked before anything else,
/// so prose containing the literal token escalates. `BOOK|` must prefix the
/// whole trimmed message - a booking token buried inside prose stays a plain
/// reply. A `BOOK|` with an empty day token degrades to a plain reply rather
/// than a booking attempt for nothing.
pub fn parse_directive(raw: &str) -> Directive {
    if raw.contains("ESCALATE") {
        return Directive::Escalate;
    }

    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("BOOK|") {
        let mut tokens = rest.splitn(2, '|');
        let day = tokens.next().unwrap_or_default().trim();
        let time = tokens
            .next()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_owned);

        if !day.is_empty() {
            return Directive::BookRequest { day: day.to_owned(), time };
        }
    }

    Directive::PlainReply(trimmed.to_owned())
}
