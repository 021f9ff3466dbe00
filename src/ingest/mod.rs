// src/ingest/mod.rs — Webhook ingestion: validate, normalize, merge
//
// Nothing is written until the whole payload has been validated. The
// transcript is upserted by conversation id, so redelivery overwrites.

use serde_json::Value;

use crate::core::types::{SpeakerRole, TranscriptCounts, TranscriptMessage};
use crate::evaluator::ScoringEngine;
use crate::infra::errors::IngestError;
use crate::store::StoreHandle;

/// The only event type that carries a transcript worth persisting.
pub const TRANSCRIPT_READY_EVENT: &str = "application.transcription_ready";

/// A payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidPayload {
    Transcript {
        conversation_id: String,
        timestamp: Option<String>,
        messages: Vec<TranscriptMessage>,
    },
    /// Unrelated notification: acknowledged, never written.
    Ignored {
        conversation_id: String,
        event_type: String,
    },
}

/// Result of one successful ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub conversation_id: String,
    pub counts: TranscriptCounts,
    /// False when normalization left nothing to store.
    pub persisted: bool,
    /// True when a session row carried the conversation id.
    pub questions_answered_updated: bool,
    pub scored: bool,
    pub weighted_score: Option<u8>,
}

/// Fail-fast checks, in order: conversation id, event type, transcript shape.
/// Only the transcript-ready event has to carry a transcript.
pub fn validate(body: &Value) -> Result<ValidPayload, IngestError> {
    let obj = body
        .as_object()
        .ok_or_else(|| IngestError::InvalidBody(json_kind(body).to_string()))?;

    let conversation_id = obj
        .get("conversation_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(IngestError::MissingConversationId)?
        .to_string();

    let event_type = obj
        .get("event_type")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if event_type != TRANSCRIPT_READY_EVENT {
        return Ok(ValidPayload::Ignored {
            conversation_id,
            event_type: event_type.to_string(),
        });
    }

    let transcript = obj
        .get("properties")
        .and_then(|p| p.get("transcript"))
        .ok_or_else(|| IngestError::InvalidTranscript("missing".into()))?;
    let entries = transcript
        .as_array()
        .ok_or_else(|| IngestError::InvalidTranscript(json_kind(transcript).to_string()))?;
    if let Some(pos) = entries.iter().position(|e| !e.is_object()) {
        return Err(IngestError::InvalidTranscript(format!(
            "entry {pos} is {}",
            json_kind(&entries[pos])
        )));
    }

    Ok(ValidPayload::Transcript {
        conversation_id,
        timestamp: obj
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string),
        messages: normalize(entries),
    })
}

/// Keep user/assistant turns with non-empty trimmed content, in order.
pub fn normalize(entries: &[Value]) -> Vec<TranscriptMessage> {
    entries
        .iter()
        .filter_map(|entry| {
            let role = SpeakerRole::parse(entry.get("role")?.as_str()?)?;
            let content = entry.get("content")?.as_str()?.trim();
            if content.is_empty() {
                return None;
            }
            Some(TranscriptMessage::new(role, content))
        })
        .collect()
}

/// Persist a normalized transcript and fold its user count into the session.
///
/// Scoring runs only after the transcript write succeeded; its failure is
/// logged and reported as `scored = false`, never as an error.
pub async fn ingest(
    store: &StoreHandle,
    scoring: Option<&ScoringEngine>,
    conversation_id: &str,
    messages: Vec<TranscriptMessage>,
) -> Result<IngestReport, IngestError> {
    let mut report = IngestReport {
        conversation_id: conversation_id.to_string(),
        ..Default::default()
    };

    if messages.is_empty() {
        tracing::info!("Transcript for {conversation_id} has no substantive messages; not stored");
        return Ok(report);
    }

    let counts = store
        .upsert_transcript(conversation_id, messages.clone())
        .await
        .map_err(|e| IngestError::Store(e.to_string()))?;
    report.counts = counts;
    report.persisted = true;

    report.questions_answered_updated = store
        .update_questions_answered(conversation_id, counts.user_message_count)
        .await
        .map_err(|e| IngestError::Store(e.to_string()))?;
    if !report.questions_answered_updated {
        tracing::warn!("No session row for conversation {conversation_id}; transcript stored alone");
    }

    tracing::info!(
        "Stored transcript for {conversation_id}: {} messages ({} user, {} assistant)",
        counts.message_count,
        counts.user_message_count,
        counts.assistant_message_count
    );

    if let Some(engine) = scoring {
        match engine.score_conversation(conversation_id, &messages).await {
            Ok(outcome) => {
                report.scored = true;
                report.weighted_score = Some(outcome.card.weighted_score);
            }
            Err(e) => {
                tracing::warn!("Scoring failed for {conversation_id} (transcript kept): {e}");
            }
        }
    }

    Ok(report)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload(event: &str, transcript: Value) -> Value {
        json!({
            "conversation_id": "c-1",
            "event_type": event,
            "timestamp": "2026-10-19T10:00:00Z",
            "properties": { "transcript": transcript }
        })
    }

    #[test]
    fn test_normalize_drops_system_and_empty() {
        let entries = vec![
            json!({"role": "system", "content": "You are an interviewer"}),
            json!({"role": "assistant", "content": "  Tell me about yourself. "}),
            json!({"role": "user", "content": "   "}),
            json!({"role": "user", "content": "I build compilers."}),
            json!({"role": "tool", "content": "x"}),
            json!({"content": "no role"}),
        ];
        let msgs = normalize(&entries);
        assert_eq!(
            msgs,
            vec![
                TranscriptMessage::new(SpeakerRole::Assistant, "Tell me about yourself."),
                TranscriptMessage::new(SpeakerRole::User, "I build compilers."),
            ]
        );
    }

    #[test]
    fn test_validate_transcript_ready() {
        let body = payload(
            TRANSCRIPT_READY_EVENT,
            json!([{"role": "user", "content": "hi"}]),
        );
        match validate(&body).unwrap() {
            ValidPayload::Transcript {
                conversation_id,
                timestamp,
                messages,
            } => {
                assert_eq!(conversation_id, "c-1");
                assert_eq!(timestamp.as_deref(), Some("2026-10-19T10:00:00Z"));
                assert_eq!(messages.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validate_other_event_is_ignored() {
        let body = payload("system.shutdown", json!([]));
        assert_eq!(
            validate(&body).unwrap(),
            ValidPayload::Ignored {
                conversation_id: "c-1".into(),
                event_type: "system.shutdown".into()
            }
        );
    }

    #[test]
    fn test_validate_other_event_without_transcript_is_ignored() {
        let body = json!({
            "conversation_id": "c-9",
            "event_type": "system.shutdown",
            "properties": { "shutdown_reason": "end_call" }
        });
        assert_eq!(
            validate(&body).unwrap(),
            ValidPayload::Ignored {
                conversation_id: "c-9".into(),
                event_type: "system.shutdown".into()
            }
        );
        let bare = json!({"conversation_id": "c-9", "event_type": "application.recording_ready"});
        assert!(matches!(validate(&bare), Ok(ValidPayload::Ignored { .. })));
    }

    #[test]
    fn test_validate_missing_conversation_id_checked_first() {
        let body = json!({"event_type": "whatever", "properties": {"transcript": "nope"}});
        assert!(matches!(
            validate(&body),
            Err(IngestError::MissingConversationId)
        ));
        let blank = json!({"conversation_id": "  ", "properties": {"transcript": []}});
        assert!(matches!(
            validate(&blank),
            Err(IngestError::MissingConversationId)
        ));
    }

    #[test]
    fn test_validate_transcript_shape() {
        let not_array = payload(TRANSCRIPT_READY_EVENT, json!({"role": "user"}));
        assert!(matches!(
            validate(&not_array),
            Err(IngestError::InvalidTranscript(_))
        ));

        let bad_entry = payload(TRANSCRIPT_READY_EVENT, json!([{"role": "user"}, 7]));
        let err = validate(&bad_entry).unwrap_err();
        assert!(err.to_string().contains("entry 1 is a number"));

        let missing = json!({"conversation_id": "c-1", "event_type": TRANSCRIPT_READY_EVENT});
        assert!(matches!(
            validate(&missing),
            Err(IngestError::InvalidTranscript(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_object_body() {
        let err = validate(&json!([1, 2])).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("an array"));
    }
}
