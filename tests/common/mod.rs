#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use medichat::{
    ChatModel, ChatRequest, Embedder, IndexCatalog, IndexSpec, ScoredRecord, VectorIndex,
    VectorRecord,
};

/// Bag-of-words embedder: each lowercase word is hashed into one bucket.
pub struct KeywordEmbedder {
    pub dimension: usize,
}

impl KeywordEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut values = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.len() > 2)
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dimension;
            values[bucket] += 1.0;
        }
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        } else {
            values[0] = 1.0;
        }
        values
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

impl Embedder for KeywordEmbedder {
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|input| self.vector(input)).collect())
    }

    fn batch_size(&self) -> usize {
        16
    }
}

/// Embedder whose output width shrinks by one after the first call.
pub struct DriftingEmbedder {
    pub dimension: usize,
    calls: Mutex<usize>,
}

impl DriftingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: Mutex::new(0),
        }
    }
}

impl Embedder for DriftingEmbedder {
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut calls = self.calls.lock().unwrap();
        let width = if *calls == 0 {
            self.dimension
        } else {
            self.dimension - 1
        };
        *calls += 1;
        Ok(inputs.iter().map(|_| vec![0.5; width]).collect())
    }

    fn batch_size(&self) -> usize {
        1
    }
}

/// In-memory index scored by cosine similarity.
#[derive(Default)]
pub struct MemoryIndex {
    records: Mutex<BTreeMap<String, VectorRecord>>,
}

impl MemoryIndex {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn records(&self) -> Vec<VectorRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

impl VectorIndex for MemoryIndex {
    fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut stored = self.records.lock().unwrap();
        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        let stored = self.records.lock().unwrap();
        let mut hits: Vec<ScoredRecord> = stored
            .values()
            .map(|record| ScoredRecord {
                id: record.id.clone(),
                score: cosine(vector, &record.values),
                text: record.text.clone(),
                source: record.source.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }
}

/// In-memory catalog that counts create calls.
#[derive(Default)]
pub struct MemoryCatalog {
    indexes: Mutex<HashMap<String, (IndexSpec, Arc<MemoryIndex>)>>,
    creates: Mutex<usize>,
}

impl MemoryCatalog {
    pub fn creates(&self) -> usize {
        *self.creates.lock().unwrap()
    }

    pub fn index(&self, name: &str) -> Option<Arc<MemoryIndex>> {
        self.indexes
            .lock()
            .unwrap()
            .get(name)
            .map(|(_, index)| Arc::clone(index))
    }

    pub fn spec(&self, name: &str) -> Option<IndexSpec> {
        self.indexes
            .lock()
            .unwrap()
            .get(name)
            .map(|(spec, _)| spec.clone())
    }
}

impl IndexCatalog for MemoryCatalog {
    fn has_index(&self, name: &str) -> Result<bool> {
        Ok(self.indexes.lock().unwrap().contains_key(name))
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        *self.creates.lock().unwrap() += 1;
        self.indexes
            .lock()
            .unwrap()
            .entry(spec.name.clone())
            .or_insert_with(|| (spec.clone(), Arc::new(MemoryIndex::default())));
        Ok(())
    }

    fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let index: Arc<dyn VectorIndex> = self
            .index(name)
            .ok_or_else(|| anyhow!("index {name} not found"))?;
        Ok(index)
    }
}

/// Chat model that echoes the system prompt it was given.
#[derive(Default)]
pub struct ContextChat {
    pub last: Mutex<Option<ChatRequest>>,
}

impl ChatModel for ContextChat {
    fn complete(&self, request: &ChatRequest) -> Result<String> {
        *self.last.lock().unwrap() = Some(request.clone());
        Ok(format!("From the documents: {}", request.system))
    }
}

/// Chat model whose provider is always down.
pub struct DownChat;

impl ChatModel for DownChat {
    fn complete(&self, _request: &ChatRequest) -> Result<String> {
        bail!("chat provider unavailable")
    }
}
