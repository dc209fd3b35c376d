//! Hugging Face Inference feature-extraction client.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use super::{post_json, Embedder};

/// Default sentence-transformers model (384-dimensional output).
pub const DEFAULT_HF_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Blocking client for `POST {base}/{model}/pipeline/feature-extraction`.
#[derive(Clone)]
pub struct HuggingFaceEmbedder {
    client: Client,
    endpoint: String,
    max_attempts: usize,
    batch_size: usize,
}

impl HuggingFaceEmbedder {
    /// Builds a new client.
    ///
    /// # Arguments
    /// * `api_token` - Hugging Face access token (usually from `HF_API_TOKEN`)
    /// * `base_url` - Models root, e.g. `https://router.huggingface.co/hf-inference/models`
    /// * `model` - Model repository id, e.g. `sentence-transformers/all-MiniLM-L6-v2`
    pub fn new(
        api_token: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
        max_attempts: usize,
        batch_size: usize,
    ) -> Result<Self> {
        anyhow::ensure!(!api_token.trim().is_empty(), "missing Hugging Face API token");
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "Hugging Face base URL must be an http(s) URL"
        );
        anyhow::ensure!(!model.trim().is_empty(), "missing Hugging Face model id");
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_token.trim()))
                .context("invalid Hugging Face API token")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Hugging Face HTTP client")?;
        let endpoint = format!(
            "{}/{}/pipeline/feature-extraction",
            base_url.trim_end_matches('/'),
            model.trim().trim_matches('/')
        );
        Ok(Self {
            client,
            endpoint,
            max_attempts: max_attempts.max(1),
            batch_size: batch_size.max(1),
        })
    }

    /// Fully-resolved feature-extraction URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Embedder for HuggingFaceEmbedder {
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        anyhow::ensure!(
            inputs.len() <= self.batch_size,
            "batch of {} exceeds configured max {}",
            inputs.len(),
            self.batch_size
        );
        let request = FeatureExtractionRequest {
            inputs,
            options: RequestOptions {
                wait_for_model: true,
            },
        };
        let embeddings: Vec<Vec<f32>> = post_json(
            &self.client,
            &self.endpoint,
            &request,
            self.max_attempts,
            "Hugging Face",
        )?;
        anyhow::ensure!(
            embeddings.len() == inputs.len(),
            "Hugging Face returned {} embeddings for {} inputs",
            embeddings.len(),
            inputs.len()
        );
        Ok(embeddings)
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [&'a str],
    options: RequestOptions,
}

#[derive(Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn builds_model_endpoint() {
        let embedder = HuggingFaceEmbedder::new(
            "hf_token",
            "https://router.huggingface.co/hf-inference/models/",
            DEFAULT_HF_MODEL,
            Duration::from_secs(5),
            1,
            16,
        )
        .unwrap();
        assert_eq!(
            embedder.endpoint(),
            "https://router.huggingface.co/hf-inference/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction"
        );
    }

    #[test]
    fn posts_inputs_and_reads_matrix() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock(
                "POST",
                "/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction",
            )
            .match_header("authorization", "Bearer hf_token")
            .match_body(Matcher::Json(json!({
                "inputs": ["diabetes", "insulin"],
                "options": {"wait_for_model": true}
            })))
            .with_status(200)
            .with_body("[[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]")
            .create();

        let embedder = HuggingFaceEmbedder::new(
            "hf_token",
            &format!("{}/models", server.url()),
            DEFAULT_HF_MODEL,
            Duration::from_secs(5),
            1,
            16,
        )
        .unwrap();
        let vectors = embedder.embed_batch(&["diabetes", "insulin"]).unwrap();

        mock.assert();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn count_mismatch_is_an_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body("[[0.1, 0.2]]")
            .create();
        let embedder = HuggingFaceEmbedder::new(
            "hf_token",
            &server.url(),
            DEFAULT_HF_MODEL,
            Duration::from_secs(5),
            1,
            16,
        )
        .unwrap();
        assert!(embedder.embed_batch(&["a", "b"]).is_err());
    }
}
