// src/infra/errors.rs — Error types for Rehearsal

use thiserror::Error;

use crate::session::state::SessionPhase;

/// Failures talking to the scoring model service.
#[derive(Error, Debug)]
pub enum RehearsalError {
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },
}

impl RehearsalError {
    pub fn is_retriable(&self) -> bool {
        match self {
            RehearsalError::Provider { retriable, .. } => *retriable,
        }
    }
}

/// Failures from the hosted conversation provider (create / end).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversationError {
    #[error("Conversation provider rejected the API key (HTTP 401)")]
    Unauthorized,

    #[error("Unknown persona or replica (HTTP 404): {0}")]
    NotFound(String),

    #[error("Malformed conversation request (HTTP 400): {0}")]
    BadRequest(String),

    #[error("Conversation provider unreachable: {0}")]
    Network(String),

    #[error("Conversation provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Unexpected conversation provider response: {0}")]
    InvalidResponse(String),
}

impl ConversationError {
    /// Message shown to the person running the interview.
    pub fn user_message(&self) -> &'static str {
        match self {
            ConversationError::Unauthorized => {
                "The interview service rejected our credentials. Check the conversation API key."
            }
            ConversationError::NotFound(_) => {
                "The configured interviewer persona or replica does not exist."
            }
            ConversationError::BadRequest(_) => {
                "The interview request was rejected as malformed. Check the interview settings."
            }
            ConversationError::Network(_) => {
                "Could not reach the interview service. Check your connection and try again."
            }
            ConversationError::Http { .. } | ConversationError::InvalidResponse(_) => {
                "The interview service returned an unexpected error. Please try again."
            }
        }
    }

    /// Transient failures the user may retry; credential and request errors are not.
    pub fn is_retriable(&self) -> bool {
        match self {
            ConversationError::Network(_) => true,
            ConversationError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Failures inside one scoring attempt. None of these touch stored data.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Scoring service error: {0}")]
    Provider(#[from] RehearsalError),

    #[error("Scoring service timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Scoring response contained no JSON object")]
    NoJson,

    #[error("Scoring response JSON is invalid: {0}")]
    InvalidJson(String),

    #[error("Failed to persist score: {0}")]
    Store(String),
}

impl ScoringError {
    /// Worth running again later: the service was slow or briefly unavailable.
    pub fn is_retriable(&self) -> bool {
        match self {
            ScoringError::Provider(e) => e.is_retriable(),
            ScoringError::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Rejections and failures at the webhook boundary.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Request body is not a JSON object: {0}")]
    InvalidBody(String),

    #[error("Missing conversation_id")]
    MissingConversationId,

    #[error("properties.transcript must be an array of message objects: {0}")]
    InvalidTranscript(String),

    #[error("Failed to store transcript: {0}")]
    Store(String),
}

impl IngestError {
    /// Malformed input is the sender's fault; anything else is ours.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, IngestError::Store(_))
    }
}

/// Failures surfaced by the session controller.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("A {0} request is already in progress")]
    InFlight(&'static str),

    #[error("Cannot {action} while session is {from}")]
    InvalidTransition {
        from: SessionPhase,
        action: &'static str,
    },
}

impl SessionError {
    /// Actionable text for the user; detailed cause goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Config(msg) => format!("Interview is not configured: {msg}"),
            SessionError::Conversation(e) => e.user_message().to_string(),
            SessionError::Store(_) => {
                "Could not save the interview session. Please try again.".to_string()
            }
            SessionError::InFlight(_) | SessionError::InvalidTransition { .. } => self.to_string(),
        }
    }

    /// Transient provider failure: the same request may succeed if run again.
    pub fn is_retriable(&self) -> bool {
        match self {
            SessionError::Conversation(e) => e.is_retriable(),
            _ => false,
        }
    }
}
