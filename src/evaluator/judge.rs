// src/evaluator/judge.rs — Scoring-service prompt and call

use std::time::Duration;

use crate::core::types::TranscriptMessage;
use crate::infra::errors::ScoringError;
use crate::provider::{ChatRequest, ChatResponse, Message, ModelProvider};

pub const SCORING_INSTRUCTION: &str = "\
You are an experienced interview assessor. Read the interview transcript below and \
evaluate the candidate's answers only (ignore the interviewer's lines).

Score three dimensions from 0 to 100:
- clarity: how clear, structured and easy to follow the answers are
- grammar: correctness of grammar, vocabulary and sentence construction
- substance: depth, relevance and concreteness of the content

Respond with ONLY a JSON object with exactly these six fields:
{\"clarity_score\": <0-100>, \"clarity_reason\": \"<one or two sentences>\",
 \"grammar_score\": <0-100>, \"grammar_reason\": \"<one or two sentences>\",
 \"substance_score\": <0-100>, \"substance_reason\": \"<one or two sentences>\"}";

/// Render messages as a role-labelled block, one line per message.
pub fn render_transcript(messages: &[TranscriptMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_request(model: &str, messages: &[TranscriptMessage]) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![Message::user(format!(
            "## Transcript\n{}",
            render_transcript(messages)
        ))],
        max_tokens: Some(800),
        temperature: Some(0.2),
        system: Some(SCORING_INSTRUCTION.to_string()),
        json_response: true,
    }
}

/// Single bounded request/response. A timeout is reported like any other failure.
pub async fn request_scores(
    provider: &dyn ModelProvider,
    request: ChatRequest,
    timeout: Duration,
) -> Result<ChatResponse, ScoringError> {
    match tokio::time::timeout(timeout, provider.chat(request)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ScoringError::Timeout {
            secs: timeout.as_secs(),
        }),
    }
}
