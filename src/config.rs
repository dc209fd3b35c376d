//! Command-line/env argument groups shared by the ingest and server binaries.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use crate::chunker::{ChunkConfig, Chunker, DEFAULT_CHUNK_CHARS, DEFAULT_CHUNK_OVERLAP};
use crate::embedder::huggingface::DEFAULT_HF_MODEL;
use crate::embedder::{Embedder, HuggingFaceEmbedder, OpenAiEmbedder};
use crate::llm::{AnthropicChat, ChatModel, OpenAiChat, ANTHROPIC_BASE_URL, GROQ_BASE_URL};
use crate::query::QueryConfig;
use crate::vector_store::pinecone::DEFAULT_CONTROL_URL;
use crate::vector_store::{IndexSpec, PineconeClient, DEFAULT_DIMENSION};

/// Hosted embedding backends.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EmbedProvider {
    /// Hugging Face Inference feature extraction.
    Huggingface,
    /// OpenAI-compatible `/embeddings` endpoint.
    Openai,
}

/// Hosted chat backends.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChatProvider {
    /// OpenAI-compatible chat completions (Groq by default).
    Openai,
    /// Anthropic Messages API.
    Anthropic,
}

/// Embedding client settings.
#[derive(Args, Debug, Clone)]
pub struct EmbedderArgs {
    /// Embedding backend
    #[arg(long, env = "MEDICHAT_EMBED_PROVIDER", value_enum, default_value_t = EmbedProvider::Huggingface)]
    pub embed_provider: EmbedProvider,

    /// Embedding model identifier
    #[arg(long, env = "MEDICHAT_EMBED_MODEL", default_value = DEFAULT_HF_MODEL)]
    pub embed_model: String,

    /// Hugging Face access token
    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true)]
    pub hf_api_token: Option<String>,

    /// Hugging Face models root
    #[arg(
        long,
        env = "MEDICHAT_HF_BASE",
        default_value = "https://router.huggingface.co/hf-inference/models"
    )]
    pub hf_base_url: String,

    /// OpenAI-compatible embeddings API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible embeddings API root
    #[arg(long, env = "MEDICHAT_OPENAI_BASE", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Optional output dimension override (OpenAI-compatible only)
    #[arg(long, env = "MEDICHAT_EMBED_DIMENSIONS")]
    pub embed_dimensions: Option<usize>,

    /// Max inputs per embedding request
    #[arg(long, env = "MEDICHAT_EMBED_BATCH", default_value_t = 32)]
    pub embed_batch: usize,

    /// Seconds before embedding requests time out
    #[arg(long, env = "MEDICHAT_EMBED_TIMEOUT_SECS", default_value_t = 30)]
    pub embed_timeout_secs: u64,

    /// Attempts per embedding request (1 disables retries)
    #[arg(long, env = "MEDICHAT_EMBED_MAX_ATTEMPTS", default_value_t = 1)]
    pub embed_max_attempts: usize,
}

impl EmbedderArgs {
    /// Builds the configured embedding client.
    pub fn build(&self) -> Result<Arc<dyn Embedder>> {
        let timeout = Duration::from_secs(self.embed_timeout_secs.max(1));
        let embedder: Arc<dyn Embedder> = match self.embed_provider {
            EmbedProvider::Huggingface => {
                let token = self
                    .hf_api_token
                    .as_deref()
                    .context("HF_API_TOKEN must be set for the huggingface embedder")?;
                Arc::new(HuggingFaceEmbedder::new(
                    token,
                    &self.hf_base_url,
                    &self.embed_model,
                    timeout,
                    self.embed_max_attempts,
                    self.embed_batch,
                )?)
            }
            EmbedProvider::Openai => {
                let key = self
                    .openai_api_key
                    .as_deref()
                    .context("OPENAI_API_KEY must be set for the openai embedder")?;
                Arc::new(OpenAiEmbedder::new(
                    key,
                    &self.openai_base_url,
                    self.embed_model.clone(),
                    self.embed_dimensions,
                    timeout,
                    self.embed_max_attempts,
                    self.embed_batch,
                )?)
            }
        };
        Ok(embedder)
    }
}

/// Pinecone connection and index shape.
#[derive(Args, Debug, Clone)]
pub struct PineconeArgs {
    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    /// Pinecone control-plane URL
    #[arg(long, env = "MEDICHAT_PINECONE_CONTROL", default_value = DEFAULT_CONTROL_URL)]
    pub pinecone_control_url: String,

    /// Index holding the document chunks
    #[arg(long, env = "MEDICHAT_INDEX", default_value = "medical-chatbot")]
    pub index_name: String,

    /// Optional namespace inside the index
    #[arg(long, env = "MEDICHAT_NAMESPACE")]
    pub namespace: Option<String>,

    /// Vector dimension; must match the embedding model
    #[arg(long, env = "MEDICHAT_DIMENSION", default_value_t = DEFAULT_DIMENSION)]
    pub dimension: usize,

    /// Serverless cloud used when creating the index
    #[arg(long, env = "MEDICHAT_CLOUD", default_value = "aws")]
    pub cloud: String,

    /// Serverless region used when creating the index
    #[arg(long, env = "MEDICHAT_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Seconds before Pinecone requests time out
    #[arg(long, env = "MEDICHAT_PINECONE_TIMEOUT_SECS", default_value_t = 30)]
    pub pinecone_timeout_secs: u64,
}

impl PineconeArgs {
    /// Builds the Pinecone client.
    pub fn client(&self) -> Result<PineconeClient> {
        let key = self
            .pinecone_api_key
            .as_deref()
            .context("PINECONE_API_KEY must be set")?;
        Ok(PineconeClient::new(
            key,
            &self.pinecone_control_url,
            Duration::from_secs(self.pinecone_timeout_secs.max(1)),
        )?
        .with_namespace(self.namespace.clone()))
    }

    /// Index shape used for provisioning.
    pub fn index_spec(&self) -> Result<IndexSpec> {
        Ok(IndexSpec::new(self.index_name.clone())?
            .with_dimension(self.dimension)
            .with_placement(self.cloud.clone(), self.region.clone()))
    }
}

/// Chunk window sizing.
#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    /// Maximum characters per chunk
    #[arg(long, env = "MEDICHAT_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_CHARS)]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    #[arg(long, env = "MEDICHAT_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,
}

impl ChunkArgs {
    /// Validated chunker.
    pub fn chunker(&self) -> Result<Chunker> {
        Ok(Chunker::new(ChunkConfig::new(
            self.chunk_size,
            self.chunk_overlap,
        )?))
    }
}

/// Answer generation settings.
#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Chat backend
    #[arg(long, env = "MEDICHAT_CHAT_PROVIDER", value_enum, default_value_t = ChatProvider::Openai)]
    pub chat_provider: ChatProvider,

    /// API key for the OpenAI-compatible chat backend
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub chat_api_key: Option<String>,

    /// OpenAI-compatible chat API root
    #[arg(long, env = "MEDICHAT_CHAT_BASE", default_value = GROQ_BASE_URL)]
    pub chat_base_url: String,

    /// Chat model identifier for the OpenAI-compatible backend
    #[arg(long, env = "MEDICHAT_CHAT_MODEL", default_value = "llama-3.1-8b-instant")]
    pub chat_model: String,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Anthropic model identifier
    #[arg(long, env = "MEDICHAT_ANTHROPIC_MODEL", default_value = "claude-3-5-haiku-latest")]
    pub anthropic_model: String,

    /// Sampling temperature
    #[arg(long, env = "MEDICHAT_TEMPERATURE", default_value_t = 0.1)]
    pub temperature: f32,

    /// Completion token cap
    #[arg(long, env = "MEDICHAT_MAX_TOKENS", default_value_t = 512)]
    pub max_tokens: usize,

    /// Chunks retrieved per question
    #[arg(long, env = "MEDICHAT_TOP_K", default_value_t = 3)]
    pub top_k: usize,

    /// Seconds before chat requests time out
    #[arg(long, env = "MEDICHAT_CHAT_TIMEOUT_SECS", default_value_t = 60)]
    pub chat_timeout_secs: u64,
}

impl ChatArgs {
    /// Builds the configured chat model.
    pub fn build(&self) -> Result<Arc<dyn ChatModel>> {
        let timeout = Duration::from_secs(self.chat_timeout_secs.max(1));
        let chat: Arc<dyn ChatModel> = match self.chat_provider {
            ChatProvider::Openai => {
                let key = self
                    .chat_api_key
                    .as_deref()
                    .context("GROQ_API_KEY must be set for the openai chat provider")?;
                Arc::new(OpenAiChat::new(
                    key,
                    &self.chat_base_url,
                    self.chat_model.clone(),
                    timeout,
                )?)
            }
            ChatProvider::Anthropic => {
                let key = self
                    .anthropic_api_key
                    .as_deref()
                    .context("ANTHROPIC_API_KEY must be set for the anthropic chat provider")?;
                Arc::new(AnthropicChat::new(
                    key,
                    ANTHROPIC_BASE_URL,
                    self.anthropic_model.clone(),
                    timeout,
                )?)
            }
        };
        Ok(chat)
    }

    /// Retrieval/generation knobs for the query service.
    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            top_k: self.top_k,
            temperature: self.temperature,
            max_tokens: self.max_tokens.max(1),
            ..QueryConfig::default()
        }
    }
}
