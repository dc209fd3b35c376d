//! Chat-completion providers used to generate answers.

use anyhow::{bail, Result};
use reqwest::blocking::Response;

mod anthropic;
mod openai;

pub use anthropic::{AnthropicChat, ANTHROPIC_BASE_URL};
pub use openai::OpenAiChat;

/// Groq's OpenAI-compatible API root.
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Text generation service.
pub trait ChatModel: Send + Sync {
    /// Returns the generated answer for a system + user prompt pair.
    fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Prompt envelope shared by the providers.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Instructions plus retrieved context.
    pub system: String,
    /// The user's question.
    pub user: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: usize,
}

fn ensure_success(resp: Response, provider: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp
        .text()
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    bail!("{provider} returned {status}: {text}")
}
