// src/core/types.rs — Domain types shared by the client and server halves

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persisted lifecycle status of a session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Created,
    Active,
    Completed,
    Cancelled,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Error => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(SessionStatus::Created),
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            "error" => Ok(SessionStatus::Error),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

/// Speaker of a transcript message. Anything else is dropped at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    User,
    Assistant,
}

impl SpeakerRole {
    pub fn parse(role: &str) -> Option<Self> {
        match role.trim().to_ascii_lowercase().as_str() {
            "user" => Some(SpeakerRole::User),
            "assistant" => Some(SpeakerRole::Assistant),
            _ => None,
        }
    }

    /// Label used when rendering a transcript for the scoring service.
    pub fn label(&self) -> &'static str {
        match self {
            SpeakerRole::User => "Candidate",
            SpeakerRole::Assistant => "Interviewer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: SpeakerRole,
    pub content: String,
}

impl TranscriptMessage {
    pub fn new(role: SpeakerRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Derived counts stored beside a transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptCounts {
    pub message_count: u32,
    pub user_message_count: u32,
    pub assistant_message_count: u32,
}

impl TranscriptCounts {
    pub fn from_messages(messages: &[TranscriptMessage]) -> Self {
        let user = messages
            .iter()
            .filter(|m| m.role == SpeakerRole::User)
            .count() as u32;
        Self {
            message_count: messages.len() as u32,
            user_message_count: user,
            assistant_message_count: messages.len() as u32 - user,
        }
    }
}

/// Who wrote the session's `score` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Manual,
    Auto,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSource::Manual => "manual",
            ScoreSource::Auto => "auto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(ScoreSource::Manual),
            "auto" => Some(ScoreSource::Auto),
            _ => None,
        }
    }
}

/// One clamped sub-score with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScore {
    pub score: u8,
    pub reason: String,
}

/// Full scoring result for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub clarity: SubScore,
    pub grammar: SubScore,
    pub substance: SubScore,
    pub weighted_score: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_str() {
        for s in [
            SessionStatus::Created,
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
            SessionStatus::Error,
        ] {
            assert_eq!(s.as_str().parse::<SessionStatus>().unwrap(), s);
        }
        assert!("ending".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_speaker_role_parse() {
        assert_eq!(SpeakerRole::parse("user"), Some(SpeakerRole::User));
        assert_eq!(SpeakerRole::parse(" Assistant "), Some(SpeakerRole::Assistant));
        assert_eq!(SpeakerRole::parse("system"), None);
        assert_eq!(SpeakerRole::parse(""), None);
    }

    #[test]
    fn test_counts_from_messages() {
        let msgs = vec![
            TranscriptMessage::new(SpeakerRole::Assistant, "Tell me about yourself."),
            TranscriptMessage::new(SpeakerRole::User, "I build storage engines."),
            TranscriptMessage::new(SpeakerRole::Assistant, "Why?"),
        ];
        let counts = TranscriptCounts::from_messages(&msgs);
        assert_eq!(counts.message_count, 3);
        assert_eq!(counts.user_message_count, 1);
        assert_eq!(counts.assistant_message_count, 2);
    }

    #[test]
    fn test_score_source_parse() {
        assert_eq!(ScoreSource::parse("manual"), Some(ScoreSource::Manual));
        assert_eq!(ScoreSource::parse("auto"), Some(ScoreSource::Auto));
        assert_eq!(ScoreSource::parse("other"), None);
    }
}
