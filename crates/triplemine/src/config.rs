use std::env;

use anyhow::{anyhow, Result};
use triplemine_index::{EmbeddingClient, HashEmbedderConfig};
use triplemine_llm::{LlmConfig, LlmProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CONTEXT_WINDOW: usize = 512;
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub context_window: usize,
    pub embedding: EmbeddingSettings,
}

#[derive(Debug, Clone)]
pub enum EmbeddingSettings {
    Hash { dimensions: usize },
    OpenAi { model: String, api_key: String },
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from a key lookup. Every missing required
    /// key is collected so the startup error names all of them at once.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut missing: Vec<&'static str> = Vec::new();
        let provider_name =
            lookup("TRIPLEMINE_PROVIDER").unwrap_or_else(|| "openai".to_string());
        let provider = LlmProvider::from_str(&provider_name)
            .ok_or_else(|| anyhow!("unknown provider {provider_name}"))?;
        let (api_key, model) = match provider {
            LlmProvider::OpenAi => (
                required(&lookup, "TRIPLEMINE_API_KEY", &mut missing),
                required(&lookup, "TRIPLEMINE_MODEL", &mut missing),
            ),
            LlmProvider::Local => (String::new(), "local".to_string()),
        };
        let base_url =
            lookup("TRIPLEMINE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let context_window = lookup("TRIPLEMINE_CONTEXT_WINDOW")
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_CONTEXT_WINDOW);
        let embedding_provider = lookup("TRIPLEMINE_EMBEDDING_PROVIDER")
            .unwrap_or_else(|| "hash".to_string())
            .to_lowercase();
        let embedding = match embedding_provider.as_str() {
            "hash" => EmbeddingSettings::Hash {
                dimensions: lookup("TRIPLEMINE_EMBED_DIMENSIONS")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(HashEmbedderConfig::default().dimensions),
            },
            "openai" => EmbeddingSettings::OpenAi {
                model: lookup("TRIPLEMINE_EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                api_key: required(&lookup, "TRIPLEMINE_API_KEY", &mut missing),
            },
            other => return Err(anyhow!("unknown embedding provider {other}")),
        };
        if !missing.is_empty() {
            return Err(anyhow!(
                "missing required configuration: {}",
                missing.join(", ")
            ));
        }
        Ok(Self {
            provider,
            model,
            api_key,
            base_url,
            context_window,
            embedding,
        })
    }

    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            provider: self.provider,
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
        }
    }

    pub fn embedding_client(&self) -> EmbeddingClient {
        match &self.embedding {
            EmbeddingSettings::Hash { dimensions } => EmbeddingClient::hash(HashEmbedderConfig {
                dimensions: *dimensions,
                ..HashEmbedderConfig::default()
            }),
            EmbeddingSettings::OpenAi { model, api_key } => {
                EmbeddingClient::openai(model, api_key)
            }
        }
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value,
        _ => {
            if !missing.contains(&key) {
                missing.push(key);
            }
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_keys_are_reported_together() {
        let err = PipelineConfig::from_lookup(lookup_from(&[])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("TRIPLEMINE_API_KEY"));
        assert!(message.contains("TRIPLEMINE_MODEL"));
    }

    #[test]
    fn local_provider_needs_no_credentials() {
        let config =
            PipelineConfig::from_lookup(lookup_from(&[("TRIPLEMINE_PROVIDER", "local")]))
                .unwrap();
        assert_eq!(config.provider, LlmProvider::Local);
        assert_eq!(config.model, "local");
        assert_eq!(config.context_window, DEFAULT_CONTEXT_WINDOW);
        assert!(matches!(config.embedding, EmbeddingSettings::Hash { .. }));
    }

    #[test]
    fn openai_provider_reads_credentials_and_window() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("TRIPLEMINE_API_KEY", "sk-test"),
            ("TRIPLEMINE_MODEL", "gpt-4.1-mini"),
            ("TRIPLEMINE_BASE_URL", "http://localhost:8000/v1"),
            ("TRIPLEMINE_CONTEXT_WINDOW", "256"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert_eq!(config.context_window, 256);
    }

    #[test]
    fn unknown_provider_fails_fast() {
        let err =
            PipelineConfig::from_lookup(lookup_from(&[("TRIPLEMINE_PROVIDER", "bogus")]))
                .unwrap_err();
        assert!(err.to_string().contains("unknown provider"));
    }

    #[test]
    fn openai_embeddings_require_the_api_key() {
        let err = PipelineConfig::from_lookup(lookup_from(&[
            ("TRIPLEMINE_PROVIDER", "local"),
            ("TRIPLEMINE_EMBEDDING_PROVIDER", "openai"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("TRIPLEMINE_API_KEY"));
    }
}
