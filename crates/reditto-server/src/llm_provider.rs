//! OpenAI-compatible chat client for the upstream model service.
//!
//! [`ModelGateway`] is the narrow seam the pipeline talks to: one prompt in,
//! the raw text of the first completion choice out, or a classified failure.
//! [`OpenRouterGateway`] is the production implementation. It makes exactly
//! one HTTP attempt per call; retrying is left to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use reditto_core::PipelineError;

use crate::config::UpstreamConfig;

/// Longest slice of an upstream error body kept for logging.
const ERROR_BODY_LOG_LIMIT: usize = 512;

/// The user turn of a chat completion.
#[derive(Debug, Clone, PartialEq)]
pub enum UserContent {
    Text(String),
    /// An instruction plus an inline image given as a `data:` URL.
    TextWithImage { text: String, image_url: String },
}

/// Everything needed for a single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub model: String,
    pub system: &'static str,
    pub user: UserContent,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Sends one prompt to the model and returns the first choice's text.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn send(&self, prompt: &ChatPrompt) -> Result<String, PipelineError>;
}

/// [`ModelGateway`] backed by an OpenRouter (or compatible) endpoint.
pub struct OpenRouterGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    app_url: Option<String>,
    app_title: Option<String>,
}

impl OpenRouterGateway {
    pub fn new(client: reqwest::Client, config: &UpstreamConfig) -> Self {
        OpenRouterGateway {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            app_url: config.app_url.clone(),
            app_title: config.app_title.clone(),
        }
    }
}

#[async_trait]
impl ModelGateway for OpenRouterGateway {
    async fn send(&self, prompt: &ChatPrompt) -> Result<String, PipelineError> {
        let mut req = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest::from(prompt));
        if let Some(url) = &self.app_url {
            req = req.header("HTTP-Referer", url);
        }
        if let Some(title) = &self.app_title {
            req = req.header("X-Title", title);
        }

        let response = req
            .send()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PipelineError::RateLimited {
                retry_after: retry_after(response.headers()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamError {
                status: status.as_u16(),
                detail: truncate(&body, ERROR_BODY_LOG_LIMIT),
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable(err.to_string()))?;
        first_choice_text(&body_text)
    }
}

/// Extracts the first choice's content from a completion envelope.
///
/// A 2xx body that is not JSON at all is malformed; one that is JSON but has
/// no usable content is an empty response.
pub fn first_choice_text(body: &str) -> Result<String, PipelineError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|_| PipelineError::malformed("completion envelope is not JSON"))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(content_text)
        .filter(|text| !text.is_empty())
        .ok_or(PipelineError::UpstreamEmptyResponse)?;

    Ok(content)
}

/// Content is usually a string; some providers return a list of text parts.
fn content_text(content: Value) -> String {
    match content {
        Value::String(s) => s,
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

impl<'a> From<&'a ChatPrompt> for ChatRequest<'a> {
    fn from(prompt: &'a ChatPrompt) -> Self {
        let user = match &prompt.user {
            UserContent::Text(text) => MessageContent::Text(text),
            UserContent::TextWithImage { text, image_url } => MessageContent::Parts(vec![
                ContentPart::Text { text },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: image_url },
                },
            ]),
        };
        ChatRequest {
            model: &prompt.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(prompt.system),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<Value>,
}
