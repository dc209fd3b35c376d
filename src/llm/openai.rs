use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{ensure_success, ChatModel, ChatRequest};

/// OpenAI-compatible `/chat/completions` provider (Groq, OpenAI, vLLM, ...).
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiChat {
    /// Builds a provider for `base_url` (e.g. [`super::GROQ_BASE_URL`]).
    pub fn new(api_key: &str, base_url: &str, model: String, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing chat API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing chat model name");
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                .context("invalid chat API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build chat HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
        })
    }
}

impl ChatModel for OpenAiChat {
    fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .context("failed to call chat completions")?;
        let parsed: CompletionResponse = ensure_success(resp, "chat completions")?
            .json()
            .context("failed to parse chat completion response")?;
        let answer = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .unwrap_or_default();
        if answer.trim().is_empty() {
            bail!("chat completion response missing answer text");
        }
        Ok(answer)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: [Message<'a>; 2],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn request() -> ChatRequest {
        ChatRequest {
            system: "Answer from context.\n\nDiabetes raises blood sugar.".into(),
            user: "What is diabetes?".into(),
            temperature: 0.1,
            max_tokens: 256,
        }
    }

    #[test]
    fn sends_system_and_user_messages() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/openai/v1/chat/completions")
            .match_header("authorization", "Bearer gsk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "llama-3.1-8b-instant",
                "max_tokens": 256,
                "messages": [
                    {"role": "system", "content": "Answer from context.\n\nDiabetes raises blood sugar."},
                    {"role": "user", "content": "What is diabetes?"}
                ]
            })))
            .with_status(200)
            .with_body(
                json!({"choices": [{"message": {"role": "assistant", "content": "A blood sugar disorder."}}]})
                    .to_string(),
            )
            .create();

        let chat = OpenAiChat::new(
            "gsk-test",
            &format!("{}/openai/v1", server.url()),
            "llama-3.1-8b-instant".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        let answer = chat.complete(&request()).unwrap();

        mock.assert();
        assert_eq!(answer, "A blood sugar disorder.");
    }

    #[test]
    fn empty_choices_are_malformed() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create();
        let chat = OpenAiChat::new("k", &server.url(), "m".into(), Duration::from_secs(5)).unwrap();
        let err = chat.complete(&request()).unwrap_err();
        assert!(err.to_string().contains("missing answer"), "{err}");
    }

    #[test]
    fn provider_errors_propagate() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create();
        let chat = OpenAiChat::new("k", &server.url(), "m".into(), Duration::from_secs(5)).unwrap();
        let err = chat.complete(&request()).unwrap_err();
        assert!(err.to_string().contains("503"), "{err}");
    }
}
