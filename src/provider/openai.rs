// src/provider/openai.rs — OpenAI-compatible Chat Completions provider

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider, TokenUsage};
use crate::evaluator::parser::truncate_chars;
use crate::infra::errors::RehearsalError;

pub struct OpenAIProvider {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIProvider {
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Build the JSON body for `/chat/completions`.
pub(crate) fn build_body(request: &ChatRequest) -> serde_json::Value {
    let mut msgs = Vec::new();
    if let Some(system) = &request.system {
        msgs.push(serde_json::json!({"role": "system", "content": system}));
    }
    for m in &request.messages {
        msgs.push(serde_json::json!({"role": m.role.as_str(), "content": m.content}));
    }

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": msgs,
    });

    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = serde_json::json!(temp);
    }
    if request.json_response {
        body["response_format"] = serde_json::json!({"type": "json_object"});
    }
    body
}

/// Extract content and usage from a completion response.
pub(crate) fn parse_response(resp: &serde_json::Value) -> ChatResponse {
    let content = resp["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    let usage = TokenUsage {
        input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    ChatResponse { content, usage }
}

/// Non-success status: rate limits and server errors are transient.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> RehearsalError {
    RehearsalError::Provider {
        provider: "openai".into(),
        message: format!("HTTP {}: {}", status, truncate_chars(body, 300)),
        retriable: status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS,
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn id(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, RehearsalError> {
        let body = build_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RehearsalError::Provider {
                provider: "openai".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_body));
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| RehearsalError::Provider {
                provider: "openai".into(),
                message: format!("Failed to parse response: {}", e),
                retriable: false,
            })?;

        Ok(parse_response(&resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;

    #[test]
    fn test_build_body_json_mode() {
        let req = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![Message::user("score this")],
            temperature: Some(0.2),
            system: Some("You are an interview assessor.".into()),
            json_response: true,
            ..Default::default()
        };
        let body = build_body(&req);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "score this");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_response() {
        let resp = serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": "{\"clarity_score\": 80}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 900, "completion_tokens": 120}
        });
        let parsed = parse_response(&resp);
        assert_eq!(parsed.content, "{\"clarity_score\": 80}");
        assert_eq!(parsed.usage.total(), 1020);
    }

    #[test]
    fn test_parse_response_missing_content() {
        let parsed = parse_response(&serde_json::json!({"choices": []}));
        assert!(parsed.content.is_empty());
        assert_eq!(parsed.usage.total(), 0);
    }

    #[test]
    fn test_status_error_retriable_classes() {
        use reqwest::StatusCode;
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "slow down").is_retriable());
        assert!(status_error(StatusCode::BAD_GATEWAY, "").is_retriable());
        assert!(!status_error(StatusCode::UNAUTHORIZED, "bad key").is_retriable());
        let e = status_error(StatusCode::BAD_REQUEST, &"x".repeat(1000));
        assert!(e.to_string().len() < 400);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let p = OpenAIProvider::with_base_url("k".into(), "http://localhost:1234/v1/".into());
        assert_eq!(p.base_url, "http://localhost:1234/v1");
        assert_eq!(p.id(), "openai");
    }
}
