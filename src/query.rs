//! Question answering over the vector index: embed, search, prompt, generate.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::embedder::Embedder;
use crate::llm::{ChatModel, ChatRequest};
use crate::vector_store::{ScoredRecord, VectorIndex};

/// Instruction template; `{context}` is replaced by the retrieved chunks.
pub const SYSTEM_PROMPT: &str = "You are a medical assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\n{context}";

/// Retrieval and generation knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Sampling temperature passed to the chat model.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: usize,
    /// System prompt template containing a `{context}` placeholder.
    pub system_template: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            temperature: 0.1,
            max_tokens: 512,
            system_template: SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Stateless answer pipeline over injected providers.
pub struct QueryService {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatModel>,
    config: QueryConfig,
}

impl QueryService {
    /// Wires the pipeline together.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chat: Arc<dyn ChatModel>,
        config: QueryConfig,
    ) -> Result<Self> {
        anyhow::ensure!(config.top_k > 0, "top_k must be positive");
        anyhow::ensure!(
            config.system_template.contains("{context}"),
            "system prompt template must contain a {{context}} placeholder"
        );
        Ok(Self {
            embedder,
            index,
            chat,
            config,
        })
    }

    /// Returns the active config.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Embeds the question into a single vector.
    pub fn embed_question(&self, question: &str) -> Result<Vec<f32>> {
        self.embedder.embed_one(question)
    }

    /// Fetches the `top_k` nearest chunks.
    pub fn search(&self, vector: &[f32]) -> Result<Vec<ScoredRecord>> {
        self.index.query(vector, self.config.top_k)
    }

    /// Builds the chat request for a question and its context block.
    pub fn build_prompt(&self, question: &str, context: &str) -> ChatRequest {
        ChatRequest {
            system: self.config.system_template.replace("{context}", context),
            user: question.to_string(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    /// Sends the prompt to the chat model.
    pub fn generate(&self, request: &ChatRequest) -> Result<String> {
        self.chat.complete(request)
    }

    /// Runs embed → search → prompt → generate for one question.
    pub fn answer(&self, question: &str) -> Result<String> {
        let vector = self.embed_question(question)?;
        let hits = self.search(&vector)?;
        debug!(
            hits = hits.len(),
            sources = ?hits.iter().map(|hit| hit.source.as_str()).collect::<Vec<_>>(),
            "retrieved context"
        );
        let context = render_context(&hits);
        let request = self.build_prompt(question, &context);
        let answer = self.generate(&request)?;
        info!(chars = answer.len(), "generated answer");
        Ok(answer)
    }
}

/// Joins retrieved chunk texts with blank lines, best hit first.
pub fn render_context(hits: &[ScoredRecord]) -> String {
    hits.iter()
        .map(|hit| hit.text.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}
