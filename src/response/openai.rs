use super::generator::{GenerationError, ResponseGenerator};
use super::prompt::{PromptParts, SYSTEM_PROMPT};
use crate::config::OpenAiConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiChatGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChatGenerator {
    pub fn new(client: reqwest::Client, config: &OpenAiConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.chat_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, parts: &PromptParts) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: parts.user_message(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

fn extract_reply(response: ChatResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GenerationError::InvalidResponse("no message content in first choice".to_string()))
}

#[async_trait]
impl ResponseGenerator for OpenAiChatGenerator {
    async fn build_response(&self, window: &[String]) -> Result<String, GenerationError> {
        let parts = PromptParts::from_window(window).ok_or(GenerationError::EmptyWindow)?;
        let request = self.build_request(&parts);

        debug!(
            model = %self.model,
            window_entries = window.len(),
            has_previous_context = parts.previous_context.is_some(),
            "Requesting mirroring reply"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let reply = extract_reply(parsed)?;
        info!(chars = reply.len(), "Mirroring reply generated");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base_url: &str) -> OpenAiConfig {
        let mut config = crate::config::AppConfig::default().openai;
        config.api_key = "sk-test".to_string();
        config.base_url = base_url.to_string();
        config
    }

    fn window(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_request_shape() {
        let generator = OpenAiChatGenerator::new(reqwest::Client::new(), &config_for("http://x"));
        let parts = PromptParts::from_window(&window(&["I'm tired", "also angry"])).unwrap();
        let body = serde_json::to_value(generator.build_request(&parts)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 250);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(
            body["messages"][1]["content"],
            "Previous context:\nI'm tired\n\nCurrent vent:\nalso angry"
        );
    }

    #[test]
    fn test_extract_reply_requires_content() {
        let empty: ChatResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(extract_reply(empty), Err(GenerationError::InvalidResponse(_))));

        let null_content: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        }))
        .unwrap();
        assert!(extract_reply(null_content).is_err());
    }

    #[tokio::test]
    async fn test_empty_window_never_calls_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let generator = OpenAiChatGenerator::new(reqwest::Client::new(), &config_for(&server.uri()));
        assert!(matches!(
            generator.build_response(&[]).await,
            Err(GenerationError::EmptyWindow)
        ));
    }

    #[tokio::test]
    async fn test_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-4o-mini", "max_tokens": 250 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "A quiet exhaustion." },
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let generator = OpenAiChatGenerator::new(reqwest::Client::new(), &config_for(&server.uri()));
        let reply = generator.build_response(&window(&["I'm tired"])).await.unwrap();
        assert_eq!(reply, "A quiet exhaustion.");
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let generator = OpenAiChatGenerator::new(reqwest::Client::new(), &config_for(&server.uri()));
        let err = generator.build_response(&window(&["x"])).await.unwrap_err();
        assert!(matches!(err, GenerationError::Api { status: 429, .. }));
    }
}
