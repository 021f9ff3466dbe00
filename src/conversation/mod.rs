// src/conversation/mod.rs — Hosted video-conversation provider

pub mod tavus;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::evaluator::parser::truncate_chars;
use crate::infra::config::ConversationConfig;
use crate::infra::errors::ConversationError;

/// Creates and ends hosted conversations. Transcripts arrive later by webhook.
#[async_trait]
pub trait ConversationProvider: Send + Sync {
    async fn create_conversation(
        &self,
        request: &CreateConversation,
    ) -> Result<Conversation, ConversationError>;

    async fn end_conversation(
        &self,
        conversation_id: &str,
        reason: &str,
    ) -> Result<EndOutcome, ConversationError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateConversation {
    pub persona_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica_id: Option<String>,
    pub conversation_name: String,
    pub conversational_context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub properties: ConversationProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationProperties {
    pub max_call_duration: u32,
    pub participant_left_timeout: u32,
    pub participant_absent_timeout: u32,
    pub enable_recording: bool,
    pub enable_closed_captions: bool,
    pub language: String,
}

impl ConversationProperties {
    pub fn from_config(config: &ConversationConfig) -> Self {
        Self {
            max_call_duration: config.max_call_duration_secs,
            participant_left_timeout: config.participant_left_timeout_secs,
            participant_absent_timeout: config.participant_absent_timeout_secs,
            enable_recording: config.enable_recording,
            enable_closed_captions: config.enable_closed_captions,
            language: config.language.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub conversation_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    Ended,
    /// The provider no longer knows the conversation (404); treated as success.
    AlreadyEnded,
}

/// Interviewer instructions for a category, plus an optional CV summary
/// truncated to `max_chars` characters.
pub fn interview_context(category: &str, cv_summary: Option<&str>, max_chars: usize) -> String {
    let mut context = format!(
        "You are conducting a realistic {category} job interview. Ask one question at a time, \
         follow up on vague answers, and keep a professional, encouraging tone. \
         Do not give feedback or scores during the interview."
    );

    if let Some(cv) = cv_summary.map(str::trim).filter(|cv| !cv.is_empty()) {
        context.push_str("\n\nCandidate background (from their CV):\n");
        context.push_str(&truncate_chars(cv, max_chars));
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_without_cv() {
        let ctx = interview_context("software engineering", None, 100);
        assert!(ctx.contains("software engineering"));
        assert!(!ctx.contains("Candidate background"));
    }

    #[test]
    fn test_context_blank_cv_ignored() {
        let ctx = interview_context("sales", Some("   "), 100);
        assert!(!ctx.contains("Candidate background"));
    }

    #[test]
    fn test_context_cv_truncated() {
        let cv = "x".repeat(5000);
        let ctx = interview_context("finance", Some(&cv), 2000);
        let tail = ctx.split("(from their CV):\n").nth(1).unwrap();
        assert_eq!(tail.chars().count(), 2000);

        let accented = "é".repeat(30);
        let ctx = interview_context("finance", Some(&accented), 10);
        assert!(ctx.ends_with(&"é".repeat(10)));
    }

    #[test]
    fn test_properties_from_config() {
        let cfg = ConversationConfig::default();
        let props = ConversationProperties::from_config(&cfg);
        assert_eq!(props.max_call_duration, 1800);
        assert!(props.enable_closed_captions);
        assert!(!props.enable_recording);
    }

    #[test]
    fn test_create_request_skips_empty_optionals() {
        let req = CreateConversation {
            persona_id: "p1".into(),
            replica_id: None,
            conversation_name: "Mock interview".into(),
            conversational_context: "ctx".into(),
            callback_url: None,
            properties: ConversationProperties::from_config(&ConversationConfig::default()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("replica_id").is_none());
        assert!(json.get("callback_url").is_none());
        assert_eq!(json["properties"]["language"], "english");
    }
}
