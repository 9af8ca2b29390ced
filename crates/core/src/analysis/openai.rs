//! Chat-completions client for OpenAI-compatible endpoints.

use super::client::{ModelClient, ModelRequest};
use crate::error::{AnalysisError, AnalysisResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Connection settings for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// `None` makes every call fail with a configuration error instead of failing at startup.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> AnalysisResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, request: &ModelRequest) -> AnalysisResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AnalysisError::Configuration("OPENAI_API_KEY is not set".into()))?;

        tracing::debug!(model = %self.config.model, with_image = request.image_data_url.is_some(), "calling model");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request_body(&self.config.model, request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Upstream("model request timed out".into())
                } else {
                    AnalysisError::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Upstream(e.to_string()))?;

        if !status.is_success() {
            let error = classify_failure(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), %error, "model call failed");
            return Err(error);
        }

        completion_content(&body)
    }
}

/// Builds the chat-completions payload. JSON mode is always requested.
pub(crate) fn request_body(model: &str, request: &ModelRequest) -> Value {
    let user = match &request.image_data_url {
        Some(url) => json!([
            { "type": "text", "text": request.user },
            { "type": "image_url", "image_url": { "url": url } }
        ]),
        None => Value::String(request.user.clone()),
    };

    json!({
        "model": model,
        "response_format": { "type": "json_object" },
        "temperature": 0.2,
        "messages": [
            { "role": "system", "content": request.system },
            { "role": "user", "content": user }
        ]
    })
}

/// Pulls `choices[0].message.content` out of a successful response.
pub(crate) fn completion_content(body: &str) -> AnalysisResult<String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| AnalysisError::InvalidResponse(format!("response is not JSON: {e}")))?;

    value["choices"]
        .get(0)
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| AnalysisError::InvalidResponse("no content in response".into()))
}

/// Maps a failed response onto the error taxonomy callers act on.
pub(crate) fn classify_failure(status: u16, body: &str) -> AnalysisError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let field = |name: &str| {
        error
            .and_then(|e| e.get(name))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };
    let code = field("code");
    let kind = field("type");
    let has = |needle: &str| code == needle || kind == needle;

    let message = match field("message") {
        m if !m.is_empty() => m,
        _ => format!("model returned HTTP {status}"),
    };

    if has("insufficient_quota") {
        AnalysisError::QuotaExceeded
    } else if status == 429 || has("rate_limit_exceeded") {
        AnalysisError::RateLimited
    } else if has("context_length_exceeded") {
        AnalysisError::ContextLengthExceeded
    } else if status == 401
        || status == 403
        || has("invalid_api_key")
        || has("model_not_found")
    {
        AnalysisError::Configuration(message)
    } else {
        AnalysisError::Upstream(message)
    }
}
