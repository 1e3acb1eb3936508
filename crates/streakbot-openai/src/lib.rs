//! OpenAI adapter (text completion).
//!
//! Implements the core `CompletionClient` port over the OpenAI Responses API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use streakbot_core::{
    completion::{CompletionClient, CompletionRequest},
    errors::Error,
    Result,
};

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    reasoning_effort: Option<String>,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("openai http client build failed: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            reasoning_effort: None,
            http,
        })
    }

    /// Reasoning effort for reasoning models (`minimal`, `low`, ...); `None` omits the field.
    pub fn with_reasoning_effort(mut self, effort: Option<String>) -> Self {
        self.reasoning_effort = effort;
        self
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, req: CompletionRequest) -> Result<String> {
        let body = build_body(&self.model, self.reasoning_effort.as_deref(), &req);

        let resp = self
            .http
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Completion(format!("openai request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "openai responses failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| Error::Completion(format!("openai json error: {e}")))?;

        let text = extract_output_text(&v);
        if text.trim().is_empty() {
            let status = v.get("status").and_then(Value::as_str).unwrap_or("unknown");
            let reason = v
                .pointer("/incomplete_details/reason")
                .and_then(Value::as_str)
                .unwrap_or("none");
            return Err(Error::Completion(format!(
                "openai returned no text (status={status}, reason={reason})"
            )));
        }

        tracing::debug!(model = %self.model, chars = text.chars().count(), "completion ok");
        Ok(text)
    }
}

/// Responses API payload: system instruction, auxiliary system context, then the user turn.
fn build_body(model: &str, reasoning_effort: Option<&str>, req: &CompletionRequest) -> Value {
    let mut input = vec![json!({ "role": "system", "content": req.system })];
    input.extend(
        req.context
            .iter()
            .map(|c| json!({ "role": "system", "content": c })),
    );
    input.push(json!({ "role": "user", "content": req.prompt }));

    let mut body = json!({
        "model": model,
        "input": input,
        "max_output_tokens": req.max_output_tokens,
    });
    if let Some(effort) = reasoning_effort {
        body["reasoning"] = json!({ "effort": effort });
    }
    body
}

/// Output text of a Responses API result.
///
/// Prefers the aggregated `output_text`; otherwise joins every `output_text` content
/// part of `message` items.
fn extract_output_text(v: &Value) -> String {
    if let Some(s) = v.get("output_text").and_then(Value::as_str) {
        return s.to_string();
    }

    v.get("output")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("message"))
                .filter_map(|item| item.get("content").and_then(Value::as_array))
                .flatten()
                .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}
