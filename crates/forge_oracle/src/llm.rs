//! HTTP oracle backed by a chat-completion API.
//!
//! Supports OpenAI and Anthropic, selected via environment variables.
//! Each turn is one completion call; when a reply is cut off by the token
//! limit and budget remains, the next turn asks the model to continue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{OracleError, OracleResult};
use crate::oracle::{GenerationOracle, OracleEvent, OracleStream};

const MAX_RETRIES: u32 = 3;
const MAX_TOKENS: u32 = 8192;

const SYSTEM_PROMPT: &str = "You are a senior TypeScript engineer generating a complete, \
buildable project. Emit every file you create or change as:\n\n\
### FILE: <relative_path>\n```<language>\n<complete file content>\n```\n\n\
Always return complete file contents, never fragments.";

const CONTINUE_PROMPT: &str = "Your previous reply was cut off. Continue exactly where you left off.";

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o",
            Self::Anthropic => "claude-sonnet-4-5",
        }
    }
}

#[derive(Debug, Clone)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

struct Completion {
    content: String,
    truncated: bool,
}

struct LlmClient {
    provider: LlmProvider,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

/// Oracle that talks to a hosted LLM.
pub struct LlmOracle {
    client: Arc<LlmClient>,
}

impl LlmOracle {
    /// Create a new oracle with explicit configuration
    pub fn new(provider: LlmProvider, api_key: impl Into<String>, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| provider.default_model().to_string());
        Self {
            client: Arc::new(LlmClient {
                provider,
                api_key: api_key.into(),
                model,
                http: reqwest::Client::new(),
            }),
        }
    }

    /// Create an oracle from environment variables
    ///
    /// Checks in order:
    /// 1. ANTHROPIC_API_KEY
    /// 2. OPENAI_API_KEY
    ///
    /// `FORGE_LLM_MODEL` overrides the provider's default model.
    pub fn from_env() -> OracleResult<Self> {
        let custom_model = std::env::var("FORGE_LLM_MODEL").ok().filter(|m| !m.is_empty());

        if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
            if !api_key.is_empty() {
                return Ok(Self::new(LlmProvider::Anthropic, api_key, custom_model));
            }
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.is_empty() {
                return Ok(Self::new(LlmProvider::OpenAI, api_key, custom_model));
            }
        }

        Err(OracleError::NotConfigured)
    }

    pub fn provider(&self) -> LlmProvider {
        self.client.provider
    }

    pub fn model(&self) -> &str {
        &self.client.model
    }
}

#[async_trait]
impl GenerationOracle for LlmOracle {
    fn name(&self) -> &str {
        self.client.provider.as_str()
    }

    async fn is_available(&self) -> bool {
        !self.client.api_key.is_empty()
    }

    async fn query(&self, prompt: &str, turn_budget: u32) -> OracleResult<OracleStream> {
        if turn_budget == 0 {
            return Err(OracleError::InvalidTurnBudget);
        }

        let state = TurnState {
            client: Arc::clone(&self.client),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            turns_used: 0,
            budget: turn_budget,
            finished: false,
        };

        let events = stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }
            if state.turns_used >= state.budget {
                state.finished = true;
                let done = OracleEvent::Completed {
                    turns_used: state.turns_used,
                };
                return Some((Ok(done), state));
            }

            match state.client.complete(&state.messages).await {
                Ok(completion) => {
                    state.turns_used += 1;
                    if completion.truncated {
                        debug!("Reply truncated after turn {}", state.turns_used);
                        state.messages.push(ChatMessage {
                            role: "assistant",
                            content: completion.content.clone(),
                        });
                        state.messages.push(ChatMessage {
                            role: "user",
                            content: CONTINUE_PROMPT.to_string(),
                        });
                    } else {
                        // Nothing left to do; the next poll emits Completed.
                        state.budget = state.turns_used;
                    }
                    Some((Ok(OracleEvent::Text(completion.content)), state))
                }
                Err(e) => {
                    state.finished = true;
                    Some((Err(e), state))
                }
            }
        });

        Ok(events.boxed())
    }
}

struct TurnState {
    client: Arc<LlmClient>,
    messages: Vec<ChatMessage>,
    turns_used: u32,
    budget: u32,
    finished: bool,
}

impl LlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> OracleResult<Completion> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 2s, 4s
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }

            let request = match self.provider {
                LlmProvider::OpenAI => self.openai_request(messages),
                LlmProvider::Anthropic => self.anthropic_request(messages),
            };

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("{} network error (attempt {}/{}): {}", self.provider.as_str(), attempt + 1, MAX_RETRIES, e);
                    last_error = Some(OracleError::Request(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(OracleError::Request(format!(
                    "{} API error {} (attempt {}/{}): {}",
                    self.provider.as_str(),
                    status,
                    attempt + 1,
                    MAX_RETRIES,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(OracleError::Request(format!(
                    "{} API error {}: {}",
                    self.provider.as_str(),
                    status,
                    body
                )));
            }

            return match self.provider {
                LlmProvider::OpenAI => {
                    let result: OpenAIResponse = response
                        .json()
                        .await
                        .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
                    let choice = result
                        .choices
                        .into_iter()
                        .next()
                        .ok_or_else(|| OracleError::InvalidResponse("No choices returned".to_string()))?;
                    Ok(Completion {
                        content: choice.message.content.unwrap_or_default(),
                        truncated: choice.finish_reason.as_deref() == Some("length"),
                    })
                }
                LlmProvider::Anthropic => {
                    let result: AnthropicResponse = response
                        .json()
                        .await
                        .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
                    let content: String = result
                        .content
                        .into_iter()
                        .filter_map(|block| block.text)
                        .collect();
                    Ok(Completion {
                        content,
                        truncated: result.stop_reason.as_deref() == Some("max_tokens"),
                    })
                }
            };
        }

        Err(last_error.unwrap_or_else(|| OracleError::Request("Max retries exceeded".to_string())))
    }

    fn openai_request(&self, messages: &[ChatMessage]) -> reqwest::RequestBuilder {
        let mut openai_messages = vec![OpenAIMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        }];
        openai_messages.extend(messages.iter().map(|m| OpenAIMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));

        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: openai_messages,
            max_completion_tokens: Some(MAX_TOKENS),
        };

        self.http
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
    }

    fn anthropic_request(&self, messages: &[ChatMessage]) -> reqwest::RequestBuilder {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: Some(SYSTEM_PROMPT.to_string()),
            messages: messages
                .iter()
                .map(|m| AnthropicMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
        };

        self.http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_detection() {
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("FORGE_LLM_MODEL");

        assert!(matches!(LlmOracle::from_env(), Err(OracleError::NotConfigured)));

        std::env::set_var("OPENAI_API_KEY", "test-key");
        let oracle = LlmOracle::from_env().unwrap();
        assert_eq!(oracle.provider(), LlmProvider::OpenAI);

        // Anthropic wins when both are present
        std::env::set_var("ANTHROPIC_API_KEY", "test-key");
        let oracle = LlmOracle::from_env().unwrap();
        assert_eq!(oracle.provider(), LlmProvider::Anthropic);

        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_default_models() {
        let openai = LlmOracle::new(LlmProvider::OpenAI, "key", None);
        assert_eq!(openai.model(), "gpt-4o");

        let anthropic = LlmOracle::new(LlmProvider::Anthropic, "key", None);
        assert_eq!(anthropic.model(), "claude-sonnet-4-5");
    }

    #[test]
    fn test_custom_model() {
        let oracle = LlmOracle::new(LlmProvider::OpenAI, "key", Some("gpt-4.1-mini".to_string()));
        assert_eq!(oracle.model(), "gpt-4.1-mini");
        assert_eq!(oracle.name(), "openai");
    }

    #[tokio::test]
    async fn test_zero_turn_budget_rejected() {
        let oracle = LlmOracle::new(LlmProvider::Anthropic, "key", None);
        assert!(matches!(
            oracle.query("hello", 0).await,
            Err(OracleError::InvalidTurnBudget)
        ));
    }

    #[tokio::test]
    async fn test_empty_key_unavailable() {
        let oracle = LlmOracle::new(LlmProvider::OpenAI, "", None);
        assert!(!oracle.is_available().await);
    }
}
