use async_trait::async_trait;
use regex::Regex;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::ModelEndpointConfig;
use crate::error::ModelError;

static THINKING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think(?:ing)?>.*?</think(?:ing)?>").expect("thinking regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    JsonSchema { name: String, schema: Value },
    JsonObject,
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub response_format: ResponseFormat,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError>;
}

#[derive(Clone)]
pub struct HttpModelProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: f64,
}

impl HttpModelProvider {
    pub fn from_config(config: &ModelEndpointConfig) -> Option<Self> {
        let api_key = env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())?;
        Some(Self::new(
            api_key,
            config.api_base.clone(),
            config.model.clone(),
            config.temperature,
        ))
    }

    pub fn new(api_key: String, api_base: String, model: String, temperature: f64) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_base,
            model,
            temperature,
        }
    }
}

#[async_trait]
impl ModelProvider for HttpModelProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let body = ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            response_format: wire_format(&request.response_format),
        };

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() || err.is_timeout() || err.is_request() {
                    ModelError::Transient(format!("{} request failed: {}", self.model, err))
                } else {
                    ModelError::Rejected {
                        status: 0,
                        detail: err.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ModelError::from_status(
                status.as_u16(),
                error_body.trim().to_string(),
            ));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| ModelError::InvalidResponse(format!("response parse failed: {}", err)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::InvalidResponse("response missing choices".to_string()))?;
        debug!(model = %self.model, chars = content.len(), "model completion received");
        Ok(content)
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    response_format: Value,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

fn wire_format(format: &ResponseFormat) -> Value {
    match format {
        ResponseFormat::JsonSchema { name, schema } => serde_json::json!({
            "type": "json_schema",
            "json_schema": { "name": name, "strict": true, "schema": schema },
        }),
        ResponseFormat::JsonObject => serde_json::json!({ "type": "json_object" }),
    }
}

pub fn strip_thinking(text: &str) -> String {
    THINKING_RE.replace_all(text, "").trim().to_string()
}

pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

pub fn extract_json(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start >= end {
        return None;
    }
    Some(text[start..=end].to_string())
}

pub fn clean_json_response(text: &str) -> Option<String> {
    let without_thinking = strip_thinking(text);
    extract_json(&strip_code_fences(&without_thinking))
}
