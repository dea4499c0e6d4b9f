use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::types::{ChatMessage, LlmClient};
use super::AnalysisError;
use crate::config::AnalyzerConfig;

/// HTTP client for an OpenAI-compatible chat-completions endpoint
/// (Cerebras-hosted Llama by default).
pub struct ChatCompletionsClient {
    client: reqwest::blocking::Client,
    config: AnalyzerConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalysisError::HttpClient(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

/// Request body for /v1/chat/completions
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    seed: u64,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    /// Some gateways return the text at the top level instead.
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

/// Pull the completion text out of a response body, logging truncation
/// and token usage on the way.
fn read_completion(body: ChatResponse) -> Result<String, AnalysisError> {
    if let Some(first) = body.choices.first() {
        if first.finish_reason.as_deref() == Some("length") {
            tracing::warn!("LLM response was truncated by the max_tokens limit");
        }
    }

    if let Some(usage) = &body.usage {
        tracing::info!(
            prompt_tokens = ?usage.prompt_tokens,
            completion_tokens = ?usage.completion_tokens,
            total_tokens = ?usage.total_tokens,
            "LLM token usage"
        );
    }

    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .or(body.content)
        .ok_or_else(|| AnalysisError::ResponseShape("no choices[0].message.content".into()))
}

impl LlmClient for ChatCompletionsClient {
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, AnalysisError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AnalysisError::MissingApiKey)?;

        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
            seed: self.config.seed,
        };

        tracing::debug!(model = %self.config.model, temperature, "Sending chat completion");

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    AnalysisError::Connection(self.config.base_url.clone())
                } else if e.is_timeout() {
                    AnalysisError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.config.timeout_secs
                    ))
                } else {
                    AnalysisError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "LLM API error");
            return Err(AnalysisError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| AnalysisError::ResponseShape(e.to_string()))?;

        read_completion(parsed)
    }
}

/// Mock LLM client for testing. Replies from a script in order and keeps
/// repeating the last reply; records every request it receives.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    requests: Mutex<Vec<(Vec<ChatMessage>, f32)>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::scripted(&[response])
    }

    pub fn scripted(responses: &[&str]) -> Self {
        Self {
            replies: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(String::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far, as (messages, temperature).
    pub fn requests(&self) -> Vec<(Vec<ChatMessage>, f32)> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl LlmClient for MockLlmClient {
    fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, AnalysisError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((messages.to_vec(), temperature));

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = self.replies.lock().unwrap_or_else(|e| e.into_inner()).pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

/// LLM client that always fails, for error-path tests.
pub struct FailingLlmClient;

impl LlmClient for FailingLlmClient {
    fn complete(&self, _messages: &[ChatMessage], _temperature: f32) -> Result<String, AnalysisError> {
        Err(AnalysisError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ChatResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn reads_first_choice_content() {
        let body = parse(
            r#"{"choices":[{"message":{"role":"assistant","content":"Lab Results"},"finish_reason":"stop"}],
                "usage":{"prompt_tokens":10,"completion_tokens":2,"total_tokens":12}}"#,
        );
        assert_eq!(read_completion(body).unwrap(), "Lab Results");
    }

    #[test]
    fn falls_back_to_top_level_content() {
        let body = parse(r#"{"content":"{\"findings\":[]}"}"#);
        assert_eq!(read_completion(body).unwrap(), "{\"findings\":[]}");
    }

    #[test]
    fn truncated_response_still_returned() {
        let body = parse(r#"{"choices":[{"message":{"content":"{\"findings\":[{"},"finish_reason":"length"}]}"#);
        assert_eq!(read_completion(body).unwrap(), "{\"findings\":[{");
    }

    #[test]
    fn empty_body_is_shape_error() {
        let result = read_completion(parse("{}"));
        assert!(matches!(result, Err(AnalysisError::ResponseShape(_))));
    }

    #[test]
    fn request_serializes_sampling_settings() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let body = ChatRequest {
            model: "llama3.1-8b",
            messages: &messages,
            temperature: 0.0,
            max_tokens: 32_000,
            top_p: 1.0,
            seed: 12345,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["seed"], 12345);
        assert_eq!(json["max_tokens"], 32_000);
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let client = ChatCompletionsClient::new(AnalyzerConfig {
            base_url: "http://127.0.0.1:9/v1/chat/completions".into(),
            ..AnalyzerConfig::default()
        })
        .unwrap();
        let result = client.complete(&[ChatMessage::user("hi")], 0.1);
        assert!(matches!(result, Err(AnalysisError::MissingApiKey)));
    }

    #[test]
    fn mock_replays_script_then_repeats_last() {
        let mock = MockLlmClient::scripted(&["one", "two"]);
        let msgs = [ChatMessage::user("q")];
        assert_eq!(mock.complete(&msgs, 0.1).unwrap(), "one");
        assert_eq!(mock.complete(&msgs, 0.2).unwrap(), "two");
        assert_eq!(mock.complete(&msgs, 0.3).unwrap(), "two");
        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        assert!((requests[1].1 - 0.2).abs() < f32::EPSILON);
    }
}
