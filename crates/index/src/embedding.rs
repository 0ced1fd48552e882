use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::{anyhow, Result};
use reqwest::blocking::Client;
use serde::Deserialize;

#[derive(Debug, Clone, Copy)]
pub struct HashEmbedderConfig {
    pub dimensions: usize,
    pub seed: u64,
}

impl Default for HashEmbedderConfig {
    fn default() -> Self {
        Self {
            dimensions: 128,
            seed: 2024,
        }
    }
}

#[derive(Clone)]
pub enum EmbeddingBackend {
    Hash(HashEmbedderConfig),
    OpenAi(OpenAiEmbeddingClient),
}

/// Embedding-model wrapper. The hash backend is a deterministic
/// bag-of-words projection good enough for offline runs and tests; the
/// OpenAI backend calls the hosted embeddings endpoint. Construction takes
/// explicit settings; callers own the configuration layer.
#[derive(Clone)]
pub struct EmbeddingClient {
    backend: EmbeddingBackend,
}

impl EmbeddingClient {
    pub fn hash(config: HashEmbedderConfig) -> Self {
        Self {
            backend: EmbeddingBackend::Hash(config),
        }
    }

    pub fn openai(model: &str, api_key: &str) -> Self {
        Self {
            backend: EmbeddingBackend::OpenAi(OpenAiEmbeddingClient::new(model, api_key)),
        }
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match &self.backend {
            EmbeddingBackend::Hash(config) => Ok(hash_embed(text, config)),
            EmbeddingBackend::OpenAi(client) => {
                let inputs = vec![text.to_string()];
                let mut output = client.embed_batch(&inputs)?;
                output
                    .pop()
                    .ok_or_else(|| anyhow!("embeddings response was empty"))
            }
        }
    }

    pub fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        match &self.backend {
            EmbeddingBackend::Hash(config) => {
                Ok(inputs.iter().map(|text| hash_embed(text, config)).collect())
            }
            EmbeddingBackend::OpenAi(client) => client.embed_batch(inputs),
        }
    }
}

fn hash_embed(text: &str, config: &HashEmbedderConfig) -> Vec<f32> {
    let dims = config.dimensions.max(1);
    let mut vector = vec![0f32; dims];
    for token in text.split_whitespace() {
        let mut hasher = DefaultHasher::new();
        hasher.write_u64(config.seed);
        token.to_lowercase().hash(&mut hasher);
        let bucket = (hasher.finish() as usize) % dims;
        vector[bucket] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
    vector
}

#[derive(Clone)]
pub struct OpenAiEmbeddingClient {
    http: Client,
    model: String,
    api_key: String,
}

impl OpenAiEmbeddingClient {
    pub fn new(model: &str, api_key: &str) -> Self {
        Self {
            http: Client::new(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let payload = serde_json::json!({
            "model": self.model,
            "input": inputs,
        });
        let response = self
            .http
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "embeddings request failed: {}",
                response.status()
            ));
        }
        let parsed: EmbeddingResponse = response.json()?;
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
