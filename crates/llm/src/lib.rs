use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Local,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Local => "local",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "openai" => Some(LlmProvider::OpenAi),
            "local" => Some(LlmProvider::Local),
            _ => None,
        }
    }
}

/// Connection settings for the completion service. Callers build this from
/// their own configuration layer; the client itself never reads the
/// environment.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl LlmResponse {
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub async fn chat(&self, req: &LlmRequest) -> Result<LlmResponse> {
        match self.config.provider {
            LlmProvider::OpenAi => self.chat_openai(req).await,
            LlmProvider::Local => Ok(self.chat_local(req)),
        }
    }

    pub fn chat_blocking(&self, req: &LlmRequest) -> Result<LlmResponse> {
        let rt = Runtime::new().context("failed to create tokio runtime")?;
        rt.block_on(self.chat(req))
    }

    /// One chat-completion round against an OpenAI-compatible endpoint.
    /// Sampling is pinned to temperature 0; no streaming.
    async fn chat_openai(&self, req: &LlmRequest) -> Result<LlmResponse> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let mut messages = Vec::new();
        if let Some(system) = &req.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": req.user }));
        let payload = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": 0,
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("completion request to {url} failed"))?
            .error_for_status()
            .context("completion service returned an error")?
            .json::<ChatResponse>()
            .await
            .context("failed to decode completion response")?;
        let text = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("missing text in completion response"))?;
        let usage = response.usage.unwrap_or_default();
        Ok(LlmResponse {
            content: text,
            prompt_tokens: usage.prompt_tokens.unwrap_or(0),
            completion_tokens: usage.completion_tokens.unwrap_or(0),
        })
    }

    fn chat_local(&self, req: &LlmRequest) -> LlmResponse {
        LlmResponse {
            content: synthesize_local_response(req),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }
}

/// Offline stand-in for the completion service. Question prompts get a
/// fenced JSON object in the shape the generator expects; anything else gets
/// a trimmed echo of the request.
fn synthesize_local_response(req: &LlmRequest) -> String {
    let user_lower = req.user.to_lowercase();
    if user_lower.contains("questions") {
        let topic = first_words(&req.user, 6);
        let questions: Vec<String> = (1..=5)
            .map(|n| format!("What does point {n} of \"{topic}\" describe?"))
            .collect();
        let payload = json!({ "questions": questions });
        return format!("```json\n{}\n```", payload);
    }
    first_words(&req.user, 40)
}

fn first_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<&str>>()
        .join(" ")
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Default, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_client() -> LlmClient {
        LlmClient::new(LlmConfig {
            provider: LlmProvider::Local,
            base_url: String::new(),
            api_key: String::new(),
            model: "local".to_string(),
        })
    }

    #[test]
    fn provider_names_round_trip() {
        assert_eq!(LlmProvider::from_str("OpenAI"), Some(LlmProvider::OpenAi));
        assert_eq!(LlmProvider::from_str("local"), Some(LlmProvider::Local));
        assert_eq!(LlmProvider::from_str("bogus"), None);
        assert_eq!(LlmProvider::OpenAi.as_str(), "openai");
    }

    #[test]
    fn local_provider_answers_question_prompts_with_fenced_json() {
        let client = local_client();
        let response = client
            .chat_blocking(&LlmRequest {
                system: None,
                user: "Generate 5 distinct questions about: token budgets.".to_string(),
            })
            .unwrap();
        assert!(response.content.starts_with("```json"));
        assert!(response.content.contains("\"questions\""));
        assert_eq!(response.total_tokens(), 0);
    }

    #[test]
    fn local_provider_echoes_other_prompts() {
        let client = local_client();
        let response = client
            .chat_blocking(&LlmRequest {
                system: None,
                user: "just a plain request".to_string(),
            })
            .unwrap();
        assert_eq!(response.content, "just a plain request");
    }
}
