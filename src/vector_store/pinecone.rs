//! Pinecone REST client: control plane (index catalog) and data plane (upsert/query).

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::{IndexCatalog, IndexSpec, ScoredRecord, VectorIndex, VectorRecord};

/// Public control-plane endpoint.
pub const DEFAULT_CONTROL_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";
const READY_POLL: Duration = Duration::from_millis(500);

/// Control-plane client; hands out [`PineconeIndex`] handles for data-plane calls.
#[derive(Clone)]
pub struct PineconeClient {
    client: Client,
    control_url: String,
    namespace: Option<String>,
    ready_timeout: Duration,
}

impl PineconeClient {
    /// Builds a client authenticated with `api_key`.
    pub fn new(api_key: &str, control_url: &str, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Pinecone API key");
        Url::parse(control_url)
            .with_context(|| format!("invalid Pinecone control URL {control_url}"))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid Pinecone API key")?,
        );
        headers.insert("x-pinecone-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Pinecone HTTP client")?;
        Ok(Self {
            client,
            control_url: control_url.trim_end_matches('/').to_string(),
            namespace: None,
            ready_timeout: Duration::from_secs(120),
        })
    }

    /// Namespace used by index handles opened through [`IndexCatalog::open_index`].
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.trim().is_empty());
        self
    }

    /// How long [`IndexCatalog::create_index`] waits for a new index to report ready.
    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }

    /// Fetches an index description; `None` when the index does not exist.
    pub fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.control_url, name);
        let resp = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("failed to describe Pinecone index {name}"))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp, "describe index")?;
        let description = resp
            .json()
            .context("failed to parse Pinecone index description")?;
        Ok(Some(description))
    }

    /// Resolves the data-plane host of `name` and returns a handle bound to it.
    pub fn index(&self, name: &str, namespace: Option<String>) -> Result<PineconeIndex> {
        let description = self
            .describe_index(name)?
            .ok_or_else(|| anyhow!("Pinecone index {name} does not exist; run ingestion first"))?;
        let host = description
            .host
            .filter(|host| !host.trim().is_empty())
            .ok_or_else(|| anyhow!("Pinecone index {name} has no host yet"))?;
        PineconeIndex::new(self.client.clone(), &host, namespace)
    }

    fn wait_until_ready(&self, name: &str) -> Result<()> {
        let started = Instant::now();
        loop {
            let ready = self
                .describe_index(name)?
                .and_then(|desc| desc.status)
                .map(|status| status.ready)
                .unwrap_or(false);
            if ready {
                return Ok(());
            }
            if started.elapsed() >= self.ready_timeout {
                bail!(
                    "Pinecone index {name} not ready after {:?}",
                    self.ready_timeout
                );
            }
            debug!(index = name, "waiting for index to become ready");
            thread::sleep(READY_POLL);
        }
    }
}

impl IndexCatalog for PineconeClient {
    fn has_index(&self, name: &str) -> Result<bool> {
        Ok(self.describe_index(name)?.is_some())
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let body = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric.to_string(),
            spec: CreateIndexSpec {
                serverless: Serverless {
                    cloud: &spec.cloud,
                    region: &spec.region,
                },
            },
        };
        let resp = self
            .client
            .post(format!("{}/indexes", self.control_url))
            .json(&body)
            .send()
            .with_context(|| format!("failed to create Pinecone index {}", spec.name))?;
        if resp.status() == StatusCode::CONFLICT {
            info!(index = %spec.name, "index was created concurrently");
        } else {
            ensure_success(resp, "create index")?;
        }
        self.wait_until_ready(&spec.name)
    }

    fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        Ok(Arc::new(self.index(name, self.namespace.clone())?))
    }
}

/// Subset of the describe-index payload this crate reads.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexDescription {
    /// Index name.
    pub name: String,
    /// Configured dimension.
    #[serde(default)]
    pub dimension: Option<usize>,
    /// Configured metric.
    #[serde(default)]
    pub metric: Option<String>,
    /// Data-plane host (no scheme).
    #[serde(default)]
    pub host: Option<String>,
    /// Provisioning status.
    #[serde(default)]
    pub status: Option<IndexStatus>,
}

/// Provisioning status block.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexStatus {
    /// Whether the index accepts requests.
    #[serde(default)]
    pub ready: bool,
    /// Provider state label (`Initializing`, `Ready`, ...).
    #[serde(default)]
    pub state: Option<String>,
}

/// Data-plane handle for one index.
#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    base: Url,
    namespace: Option<String>,
}

impl PineconeIndex {
    fn new(client: Client, host: &str, namespace: Option<String>) -> Result<Self> {
        let host = host.trim();
        let raw = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        let base = Url::parse(&raw).with_context(|| format!("invalid Pinecone host {host}"))?;
        Ok(Self {
            client,
            base,
            namespace: namespace.filter(|ns| !ns.is_empty()),
        })
    }

    /// Data-plane base URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("failed to build Pinecone URL for {path}"))
    }
}

impl VectorIndex for PineconeIndex {
    fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let body = UpsertRequest {
            vectors: records
                .iter()
                .map(|record| UpsertVector {
                    id: &record.id,
                    values: &record.values,
                    metadata: RecordMetadata {
                        text: &record.text,
                        source: &record.source,
                    },
                })
                .collect(),
            namespace: self.namespace.as_deref(),
        };
        let resp = self
            .client
            .post(self.endpoint("vectors/upsert")?)
            .json(&body)
            .send()
            .context("failed to call Pinecone upsert")?;
        let parsed: UpsertResponse = ensure_success(resp, "upsert")?
            .json()
            .context("failed to parse Pinecone upsert response")?;
        Ok(parsed.upserted_count)
    }

    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };
        let resp = self
            .client
            .post(self.endpoint("query")?)
            .json(&body)
            .send()
            .context("failed to call Pinecone query")?;
        let parsed: QueryResponse = ensure_success(resp, "query")?
            .json()
            .context("failed to parse Pinecone query response")?;
        parsed
            .matches
            .into_iter()
            .map(|hit| {
                let metadata = hit.metadata.unwrap_or_default();
                let text = metadata
                    .text
                    .ok_or_else(|| anyhow!("Pinecone match {} is missing text metadata", hit.id))?;
                Ok(ScoredRecord {
                    id: hit.id,
                    score: hit.score,
                    text,
                    source: metadata.source.unwrap_or_default(),
                })
            })
            .collect()
    }
}

fn ensure_success(resp: Response, operation: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    bail!("Pinecone {operation} failed ({status}): {body}")
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: String,
    spec: CreateIndexSpec<'a>,
}

#[derive(Serialize)]
struct CreateIndexSpec<'a> {
    serverless: Serverless<'a>,
}

#[derive(Serialize)]
struct Serverless<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: RecordMetadata<'a>,
}

#[derive(Serialize)]
struct RecordMetadata<'a> {
    text: &'a str,
    source: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<MatchMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchMetadata {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    source: Option<String>,
}
