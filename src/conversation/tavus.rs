// src/conversation/tavus.rs — Tavus-style conversation API client
//
// POST {base}/conversations            create, returns id + join URL
// POST {base}/conversations/{id}/end   end; 404 means already ended

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::{Conversation, ConversationProvider, CreateConversation, EndOutcome};
use crate::evaluator::parser::truncate_chars;
use crate::infra::errors::ConversationError;

pub struct TavusClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TavusClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

/// Map a non-success creation status to the error the user sees.
pub(crate) fn classify_create_error(status: StatusCode, body: &str) -> ConversationError {
    let body = truncate_chars(body, 300);
    match status {
        StatusCode::UNAUTHORIZED => ConversationError::Unauthorized,
        StatusCode::NOT_FOUND => ConversationError::NotFound(body),
        StatusCode::BAD_REQUEST => ConversationError::BadRequest(body),
        other => ConversationError::Http {
            status: other.as_u16(),
            message: body,
        },
    }
}

/// 200/201/204 and 404 all count as a finished conversation.
pub(crate) fn classify_end_status(status: StatusCode, body: &str) -> Result<EndOutcome, ConversationError> {
    match status {
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(EndOutcome::Ended),
        StatusCode::NOT_FOUND => Ok(EndOutcome::AlreadyEnded),
        other => Err(ConversationError::Http {
            status: other.as_u16(),
            message: truncate_chars(body, 300),
        }),
    }
}

fn network_error(e: reqwest::Error) -> ConversationError {
    ConversationError::Network(e.to_string())
}

#[async_trait]
impl ConversationProvider for TavusClient {
    async fn create_conversation(
        &self,
        request: &CreateConversation,
    ) -> Result<Conversation, ConversationError> {
        let resp = self
            .client
            .post(self.url("conversations"))
            .header("x-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(network_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_create_error(status, &body));
        }

        let conversation: Conversation = resp
            .json()
            .await
            .map_err(|e| ConversationError::InvalidResponse(e.to_string()))?;

        if conversation.conversation_id.trim().is_empty() {
            return Err(ConversationError::InvalidResponse(
                "empty conversation_id".into(),
            ));
        }

        tracing::info!(
            "Created conversation {} ({})",
            conversation.conversation_id,
            request.conversation_name
        );
        Ok(conversation)
    }

    async fn end_conversation(
        &self,
        conversation_id: &str,
        reason: &str,
    ) -> Result<EndOutcome, ConversationError> {
        let resp = self
            .client
            .post(self.url(&format!("conversations/{conversation_id}/end")))
            .header("x-api-key", &self.api_key)
            .json(&serde_json::json!({ "reason": reason }))
            .send()
            .await
            .map_err(network_error)?;

        let status = resp.status();
        let body = if status.is_success() {
            String::new()
        } else {
            resp.text().await.unwrap_or_default()
        };
        classify_end_status(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_create_errors_distinct() {
        assert_eq!(
            classify_create_error(StatusCode::UNAUTHORIZED, "nope"),
            ConversationError::Unauthorized
        );
        assert!(matches!(
            classify_create_error(StatusCode::NOT_FOUND, "persona"),
            ConversationError::NotFound(_)
        ));
        assert!(matches!(
            classify_create_error(StatusCode::BAD_REQUEST, "bad"),
            ConversationError::BadRequest(_)
        ));
        assert!(matches!(
            classify_create_error(StatusCode::BAD_GATEWAY, ""),
            ConversationError::Http { status: 502, .. }
        ));
    }

    #[test]
    fn test_classify_end_status() {
        assert_eq!(classify_end_status(StatusCode::OK, ""), Ok(EndOutcome::Ended));
        assert_eq!(classify_end_status(StatusCode::CREATED, ""), Ok(EndOutcome::Ended));
        assert_eq!(classify_end_status(StatusCode::NO_CONTENT, ""), Ok(EndOutcome::Ended));
        assert_eq!(
            classify_end_status(StatusCode::NOT_FOUND, ""),
            Ok(EndOutcome::AlreadyEnded)
        );
        assert!(classify_end_status(StatusCode::INTERNAL_SERVER_ERROR, "boom").is_err());
    }

    #[test]
    fn test_url_building() {
        let c = TavusClient::new("k".into(), "https://api.test/v2/".into(), Duration::from_secs(5));
        assert_eq!(c.url("conversations"), "https://api.test/v2/conversations");
    }

    #[test]
    fn test_error_body_truncated_on_char_boundary() {
        let body = "é".repeat(400);
        match classify_create_error(StatusCode::NOT_FOUND, &body) {
            ConversationError::NotFound(msg) => assert_eq!(msg.chars().count(), 300),
            other => panic!("unexpected {other:?}"),
        }
    }
}
