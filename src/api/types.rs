// src/api/types.rs

use serde::{Deserialize, Serialize};

use crate::ingest::IngestReport;

/// Webhook reply for a processed transcript. Diagnostic only.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookProcessed {
    pub success: bool,
    pub conversation_id: String,
    pub message_count: u32,
    pub user_message_count: u32,
    pub assistant_message_count: u32,
    pub questions_answered_updated: bool,
    pub scored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_score: Option<u8>,
}

impl From<IngestReport> for WebhookProcessed {
    fn from(report: IngestReport) -> Self {
        Self {
            success: true,
            conversation_id: report.conversation_id,
            message_count: report.counts.message_count,
            user_message_count: report.counts.user_message_count,
            assistant_message_count: report.counts.assistant_message_count,
            questions_answered_updated: report.questions_answered_updated,
            scored: report.scored,
            weighted_score: report.weighted_score,
        }
    }
}

/// Webhook reply for an acknowledged but unrelated event.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookIgnored {
    pub success: bool,
    pub ignored: bool,
    pub event_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
