//! HTTP completion client for the Responses API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use bolletta_core::{CompletionClient, ModelConfig, UpstreamError};

/// Blocking client for an OpenAI-compatible Responses endpoint.
///
/// Must be created and used off the async runtime (see `spawn_blocking`).
pub struct ResponsesClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

impl ResponsesReply {
    /// First text part of the answer; non-message items carry no content.
    fn into_text(self) -> Option<String> {
        self.output
            .into_iter()
            .flat_map(|item| item.content)
            .find_map(|part| part.text)
    }
}

impl ResponsesClient {
    /// Build a client, reading the API key from the configured variable.
    pub fn from_config(config: &ModelConfig) -> Result<Self, UpstreamError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                UpstreamError::NotConfigured(format!(
                    "environment variable {} is not set",
                    config.api_key_env
                ))
            })?;

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::ServiceFailure(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }
}

impl CompletionClient for ResponsesClient {
    fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        debug!("POST {} ({} prompt characters)", self.endpoint, prompt.len());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ResponsesRequest {
                model: &self.model,
                input: prompt,
            })
            .send()
            .map_err(|e| UpstreamError::ServiceFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(UpstreamError::ServiceFailure(format!("HTTP {}: {}", status, body)));
        }

        let reply: ResponsesReply = response
            .json()
            .map_err(|e| UpstreamError::MalformedJson(e.to_string()))?;

        reply
            .into_text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| UpstreamError::MalformedJson("response has no output text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text_skips_reasoning_items() {
        let reply: ResponsesReply = serde_json::from_str(
            r#"{
                "id": "resp_1",
                "output": [
                    {"type": "reasoning", "summary": []},
                    {"type": "message", "content": [{"type": "output_text", "text": "{\"mesi\": 2}"}]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(reply.into_text().as_deref(), Some("{\"mesi\": 2}"));
    }

    #[test]
    fn test_empty_reply() {
        let reply: ResponsesReply = serde_json::from_str(r#"{"output": []}"#).unwrap();
        assert_eq!(reply.into_text(), None);
    }

    #[test]
    fn test_missing_api_key() {
        let config = ModelConfig {
            api_key_env: "BOLLETTA_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ModelConfig::default()
        };

        let err = ResponsesClient::from_config(&config).err().unwrap();
        assert!(matches!(err, UpstreamError::NotConfigured(_)));
    }
}
