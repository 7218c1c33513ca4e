use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::SummaryApiConfig;
use crate::error::{AppError, Result};

// Determinism-leaning sampling for digest output.
const TEMPERATURE: f64 = 0.2;
const TOP_P: f64 = 0.9;

/// Seam for the chat-completion endpoint so pipeline stages can be tested
/// against a mock.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send one system + user message pair, returning the raw assistant text.
    async fn chat(&self, system_prompt: &str, user_content: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct SummaryClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl SummaryClient {
    pub fn new(config: &SummaryApiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config("summary_api.api_key is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatApi for SummaryClient {
    async fn chat(&self, system_prompt: &str, user_content: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_content.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            top_p: TOP_P,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Summarization request failed");
            return Err(AppError::ExternalService {
                service: "summarization API",
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = response.json().await?;
        first_choice_content(response)
    }
}

fn first_choice_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(AppError::MalformedResponse)
}
