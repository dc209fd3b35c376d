//! Embedding providers and the trait the pipeline and query service call through.

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub mod huggingface;
pub mod openai;

pub use huggingface::HuggingFaceEmbedder;
pub use openai::OpenAiEmbedder;

/// Maps text to fixed-length vectors.
pub trait Embedder: Send + Sync {
    /// Embeds a batch of inputs, returning one vector per input in order.
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Maximum number of inputs accepted per [`Embedder::embed_batch`] call.
    fn batch_size(&self) -> usize;

    /// Embeds a single input.
    fn embed_one(&self, input: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[input])?;
        anyhow::ensure!(
            vectors.len() == 1,
            "embedder returned {} vectors for a single input",
            vectors.len()
        );
        vectors.pop().ok_or_else(|| anyhow!("embedder returned no vector"))
    }
}

/// Embeds every input, splitting into provider-sized batches.
pub fn embed_all(embedder: &dyn Embedder, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
    let batch_size = embedder.batch_size().max(1);
    let mut vectors = Vec::with_capacity(inputs.len());
    for batch in inputs.chunks(batch_size) {
        let embedded = embedder.embed_batch(batch)?;
        anyhow::ensure!(
            embedded.len() == batch.len(),
            "embedding count {} mismatched batch of {}",
            embedded.len(),
            batch.len()
        );
        vectors.extend(embedded);
    }
    Ok(vectors)
}

/// POSTs a JSON body and decodes the JSON reply.
///
/// Attempts the request at most `max_attempts` times; only rate limits,
/// server errors and transport failures are retried.
pub(crate) fn post_json<B, R>(
    client: &Client,
    endpoint: &str,
    body: &B,
    max_attempts: usize,
    provider: &str,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1usize;
    loop {
        match client.post(endpoint).json(body).send() {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return resp
                        .json()
                        .with_context(|| format!("failed to parse {provider} embedding response"));
                }
                let text = resp
                    .text()
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                if is_retryable_status(status) && attempt < max_attempts {
                    warn!(%status, attempt, "{provider} embeddings request failed; retrying");
                    thread::sleep(retry_backoff(attempt));
                    attempt += 1;
                    continue;
                }
                anyhow::bail!("{provider} embeddings request failed ({status}): {text}");
            }
            Err(err) => {
                if (err.is_timeout() || err.is_connect()) && attempt < max_attempts {
                    warn!(error = %err, attempt, "{provider} embeddings transport error; retrying");
                    thread::sleep(retry_backoff(attempt));
                    attempt += 1;
                    continue;
                }
                return Err(anyhow::Error::new(err)
                    .context(format!("failed to call {provider} embeddings endpoint")));
            }
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs.iter().map(|s| vec![s.len() as f32]).collect())
        }

        fn batch_size(&self) -> usize {
            2
        }
    }

    #[test]
    fn embed_all_batches_and_preserves_order() {
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };
        let vectors = embed_all(&embedder, &["a", "bb", "ccc", "dddd", "eeeee"]).unwrap();
        assert_eq!(
            vectors,
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]]
        );
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn embed_one_unwraps_single_vector() {
        let embedder = CountingEmbedder {
            calls: AtomicUsize::new(0),
        };
        assert_eq!(embedder.embed_one("four").unwrap(), vec![4.0]);
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(retry_backoff(1), Duration::from_millis(1000));
        assert_eq!(retry_backoff(9), retry_backoff(5));
    }
}
