// src/niche/openai.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};

use crate::utils::error::NicheError;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Anything that can answer a chat request with text.
#[async_trait]
pub trait ChatCompletion {
    async fn complete(&self, request: ChatRequest) -> Result<String, NicheError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// A stalled request fails after `timeout`, so one slow batch cannot hang the run.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, NicheError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NicheError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Reads `OPENAI_API_KEY`; a missing or blank key is a configuration error.
    pub fn from_env(timeout: Duration) -> Result<Self, NicheError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NicheError::Config("OPENAI_API_KEY is not set".into()))?;
        Self::new(api_key, timeout)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, NicheError> {
        let start = std::time::Instant::now();

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| NicheError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NicheError::Api { status: status.as_u16(), body });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| NicheError::Shape(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .ok_or(NicheError::EmptyResponse)?
            .message
            .content
            .unwrap_or_default();

        tracing::debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion"
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OpenAiClient::new("sk-test", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.api_key, "sk-test");
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: DEFAULT_MODEL.into(),
            messages: vec![Message::system("only JSON"), Message::user("hi")],
            temperature: Some(0.2),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert!(json["temperature"].is_number());

        let bare = ChatRequest { temperature: None, ..request };
        assert!(serde_json::to_value(&bare).unwrap().get("temperature").is_none());
    }

    #[tokio::test]
    async fn test_stalled_endpoint_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the connection and never answer.
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = OpenAiClient::new("sk-test", Duration::from_millis(200))
            .unwrap()
            .with_base_url(format!("http://{}/v1", addr));
        let request = ChatRequest {
            model: DEFAULT_MODEL.into(),
            messages: vec![Message::user("hi")],
            temperature: None,
        };

        let started = std::time::Instant::now();
        let result = client.complete(request).await;

        assert!(matches!(result, Err(NicheError::Network(_))), "got {:?}", result);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_response_content_may_be_null() {
        let raw: ChatResponseRaw =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#).unwrap();
        assert_eq!(raw.choices[0].message.content, None);
    }
}
