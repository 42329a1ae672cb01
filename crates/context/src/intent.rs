//! Keyword intent inference and scope selection.
//!
//! Rules are checked in a fixed order and the first match wins. Single
//! keywords match whole words (a trailing plural `s` is tolerated); phrases
//! match as substrings of the whitespace-normalized message.

use sanskara_core::context::{ContextRequest, ContextScope, Intent};
use sanskara_core::state::Record;
use serde_json::json;

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "namaste",
    "good morning",
    "good afternoon",
    "good evening",
];

const OPEN_ENDED: &[&str] = &[
    "what should i do",
    "what next",
    "help me",
    "what do you recommend",
    "where do i start",
    "what's the plan",
    "how are things going",
    "what's my progress",
    "what am i missing",
    "anything urgent",
    "what needs attention",
];

const STATUS: &[&str] = &[
    "how is",
    "how am i doing",
    "where do i stand",
    "what's left",
    "progress",
    "planning going",
    "status",
    "overview",
    "summary",
];

const TASK: &[&str] = &[
    "mark as complete",
    "update task",
    "finish task",
    "check off",
    "update status",
    "mark",
    "complete",
    "done",
    "finish",
];

const RITUAL: &[&str] = &[
    "ritual",
    "tradition",
    "ceremony",
    "custom",
    "culture",
    "religious",
    "hindu",
    "sanskrit",
    "puja",
    "pooja",
];

const VENDOR: &[&str] = &[
    "vendor",
    "photographer",
    "caterer",
    "venue",
    "book",
    "shortlist",
    "decorator",
    "florist",
    "dj",
    "band",
    "makeup",
    "mehendi",
];

const BUDGET: &[&str] = &[
    "how much",
    "spent so far",
    "cost of",
    "budget",
    "cost",
    "expense",
    "payment",
    "money",
    "price",
    "spend",
    "afford",
    "expensive",
    "cheap",
    "financial",
];

const TIMELINE: &[&str] = &[
    "next deadline",
    "this week",
    "upcoming tasks",
    "due date",
    "deadline",
    "timeline",
    "schedule",
    "when",
    "date",
    "time",
    "due",
    "urgent",
    "overdue",
];

/// Lowercased message split into words, plus the words rejoined with single
/// spaces for phrase matching.
struct Normalized {
    words: Vec<String>,
    joined: String,
}

impl Normalized {
    fn new(message: &str) -> Self {
        let lower = message.to_lowercase();
        let words: Vec<String> = lower
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|w| !w.is_empty())
            .map(str::to_owned)
            .collect();
        let joined = words.join(" ");
        Self { words, joined }
    }

    fn matches(&self, keyword: &str) -> bool {
        if keyword.contains(' ') {
            self.joined.contains(keyword)
        } else {
            self.words
                .iter()
                .any(|w| w == keyword || w.strip_suffix('s') == Some(keyword))
        }
    }

    fn any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.matches(k))
    }
}

/// Classify a user message.
pub fn infer_intent(message: &str) -> Intent {
    let trimmed = message.trim();
    if trimmed.chars().count() < 5 {
        return Intent::ProactiveGreeting;
    }

    let text = Normalized::new(trimmed);
    let rules: [(&[&str], Intent); 8] = [
        (GREETINGS, Intent::ProactiveGreeting),
        (OPEN_ENDED, Intent::OpenEnded),
        (STATUS, Intent::StatusCheck),
        (TASK, Intent::TaskManagement),
        (RITUAL, Intent::RitualInquiry),
        (VENDOR, Intent::VendorSearch),
        (BUDGET, Intent::BudgetManagement),
        (TIMELINE, Intent::TimelinePlanning),
    ];

    rules
        .iter()
        .find(|(keywords, _)| text.any(keywords))
        .map_or(Intent::GeneralPlanning, |(_, intent)| *intent)
}

/// The scope an intent needs. Proactive intents get the full picture.
pub fn scope_for(intent: Intent) -> ContextScope {
    if intent.is_proactive() {
        return ContextScope::Proactive;
    }
    match intent {
        Intent::VendorSearch => ContextScope::Vendor,
        Intent::BudgetManagement => ContextScope::Budget,
        Intent::TimelinePlanning => ContextScope::Timeline,
        Intent::TaskManagement => ContextScope::Workflow,
        Intent::RitualInquiry => ContextScope::Minimal,
        _ => ContextScope::Proactive,
    }
}

/// Build a turn's request from the raw user message. An empty message is a
/// proactive greeting.
pub fn build_request(
    wedding_id: impl Into<String>,
    user_id: impl Into<String>,
    message: &str,
    k_turns: usize,
    top_k: usize,
) -> ContextRequest {
    let intent = infer_intent(message);
    ContextRequest::new(wedding_id, user_id, intent, scope_for(intent))
        .with_message(message)
        .with_k_turns(k_turns)
        .with_top_k(top_k)
}

/// A small topic hint for the orchestrator. Empty when nothing stands out.
pub fn thread_hint(message: &str) -> Record {
    let text = Normalized::new(message);
    let hint = if text.any(&["venue", "hall", "banquet", "resort"]) {
        json!({"topic": "vendors", "category": "venue"})
    } else if text.any(&["dj", "band", "music", "sangeet"]) {
        json!({"topic": "vendors", "category": "entertainment"})
    } else if text.any(&["budget", "cost", "expense", "money"]) {
        json!({"topic": "budget"})
    } else if text.any(&["timeline", "deadline", "due", "schedule"]) {
        json!({"topic": "timeline"})
    } else if text.any(&["guest", "rsvp", "invite", "whatsapp"]) {
        json!({"topic": "guests"})
    } else {
        return Record::new();
    };

    match hint {
        serde_json::Value::Object(map) => map,
        _ => Record::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_greeting_messages_are_proactive() {
        assert_eq!(infer_intent(""), Intent::ProactiveGreeting);
        assert_eq!(infer_intent("yo"), Intent::ProactiveGreeting);
        assert_eq!(infer_intent("Hello there!"), Intent::ProactiveGreeting);
        assert_eq!(infer_intent("Good morning"), Intent::ProactiveGreeting);
    }

    #[test]
    fn greetings_match_whole_words_only() {
        // "this" and "which" must not read as "hi"
        assert_eq!(infer_intent("Which photographer is this?"), Intent::VendorSearch);
    }

    #[test]
    fn rule_order_is_respected() {
        assert_eq!(infer_intent("what should i do next?"), Intent::OpenEnded);
        assert_eq!(infer_intent("Give me an overview of the budget"), Intent::StatusCheck);
        assert_eq!(infer_intent("Mark the venue task as done"), Intent::TaskManagement);
        assert_eq!(infer_intent("Explain the haldi ceremony"), Intent::RitualInquiry);
        assert_eq!(infer_intent("Find caterers in Pune"), Intent::VendorSearch);
        assert_eq!(infer_intent("How much have we spent so far?"), Intent::BudgetManagement);
        assert_eq!(infer_intent("When is the next deadline?"), Intent::TimelinePlanning);
        assert_eq!(infer_intent("Let's talk about the color palette"), Intent::GeneralPlanning);
    }

    #[test]
    fn scopes_follow_intent() {
        assert_eq!(scope_for(Intent::VendorSearch), ContextScope::Vendor);
        assert_eq!(scope_for(Intent::TaskManagement), ContextScope::Workflow);
        assert_eq!(scope_for(Intent::RitualInquiry), ContextScope::Minimal);
        assert_eq!(scope_for(Intent::StatusCheck), ContextScope::Proactive);
        assert_eq!(scope_for(Intent::GeneralPlanning), ContextScope::Proactive);
    }

    #[test]
    fn build_request_carries_windows() {
        let req = build_request("w1", "u1", "What does the budget look like?", 4, 3);
        assert_eq!(req.intent(), Intent::BudgetManagement);
        assert_eq!(req.scope(), ContextScope::Budget);
        assert_eq!(req.k_turns(), 4);
        assert_eq!(req.top_k(), 3);
        assert_eq!(req.message(), "What does the budget look like?");
    }

    #[test]
    fn thread_hints() {
        assert_eq!(thread_hint("Is the banquet hall free?")["category"], "venue");
        assert_eq!(thread_hint("Need a DJ for the sangeet")["category"], "entertainment");
        assert_eq!(thread_hint("Track expenses please")["topic"], "budget");
        assert_eq!(thread_hint("RSVP reminders")["topic"], "guests");
        assert!(thread_hint("Tell me a story").is_empty());
    }
}
