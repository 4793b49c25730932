//! HTTP decision provider
//!
//! Model-agnostic client for LLM APIs. Supports the Anthropic messages
//! API and OpenAI-compatible chat APIs (OpenRouter, DeepSeek, etc).
//! OpenAI-format requests stream: each delta grows the narrative and is
//! forwarded through the partial sink with skill directives stripped.
//! The directive in the final text decides the skill; a missing or
//! garbled directive falls back to the actor's first skill.

use crate::core::error::{EngineError, Result};
use crate::decision::context;
use crate::decision::parser::{extract_skill_tag, strip_skill_tags};
use crate::decision::provider::{
    Confidence, Decision, DecisionProvider, DecisionRequest,
};
use crate::core::types::SkillId;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// API format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    Anthropic,
    OpenAi,
}

/// Async HTTP client implementing `DecisionProvider`
pub struct LlmProvider {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
    temperature: f32,
}

impl LlmProvider {
    /// Create a provider with explicit configuration
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            api_format,
            temperature: 0.7,
        }
    }

    /// Detect API format from URL
    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            // OpenRouter, DeepSeek, OpenAI and compatible APIs
            ApiFormat::OpenAi
        }
    }

    /// Create a provider from environment variables
    ///
    /// Required: LLM_API_KEY
    /// Optional: LLM_API_URL (defaults to the Anthropic API)
    /// Optional: LLM_MODEL (defaults to claude-3-haiku-20240307)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| EngineError::DecisionError("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".into());
        let model =
            std::env::var("LLM_MODEL").unwrap_or_else(|_| "claude-3-haiku-20240307".into());

        Ok(Self::new(api_key, api_url, model))
    }

    async fn complete_anthropic(&self, request: &DecisionRequest) -> Result<String> {
        let mut messages: Vec<Message> = context::history_messages(request)
            .into_iter()
            .map(|(role, content)| Message {
                role: role.into(),
                content,
            })
            .collect();
        messages.push(Message {
            role: "user".into(),
            content: context::user_message(request),
        });

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            system: context::system_prompt(request),
            messages,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::DecisionError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EngineError::DecisionError(format!(
                "API error: {}",
                error_text
            )));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| EngineError::DecisionError(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| EngineError::DecisionError("Empty response".into()))
    }

    async fn complete_openai_stream(
        &self,
        request: &DecisionRequest,
        partials: &Option<UnboundedSender<String>>,
    ) -> Result<String> {
        let mut messages = vec![Message {
            role: "system".into(),
            content: context::system_prompt(request),
        }];
        messages.extend(
            context::history_messages(request)
                .into_iter()
                .map(|(role, content)| Message {
                    role: role.into(),
                    content,
                }),
        );
        messages.push(Message {
            role: "user".into(),
            content: context::user_message(request),
        });

        let body = OpenAiRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            temperature: self.temperature,
            stream: true,
            messages,
        };

        let mut response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::DecisionError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EngineError::DecisionError(format!(
                "API error: {}",
                error_text
            )));
        }

        // Server-sent events: one `data: {json}` line per delta.
        // Chunks can split lines anywhere, so buffer until newline.
        let mut full = String::new();
        let mut line_buf = String::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| EngineError::DecisionError(e.to_string()))?
        {
            line_buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = line_buf.find('\n') {
                let line: String = line_buf.drain(..=pos).collect();
                let line = line.trim();
                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };
                if data == "[DONE]" {
                    continue;
                }
                let Ok(delta) = serde_json::from_str::<StreamChunk>(data) else {
                    continue;
                };
                if let Some(content) = delta
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.as_deref())
                {
                    full.push_str(content);
                    if let Some(sink) = partials {
                        let _ = sink.send(strip_skill_tags(&full));
                    }
                }
            }
        }

        if full.is_empty() {
            return Err(EngineError::DecisionError("Empty response".into()));
        }
        Ok(full)
    }
}

impl DecisionProvider for LlmProvider {
    async fn decide(
        &mut self,
        request: DecisionRequest,
        partials: Option<UnboundedSender<String>>,
    ) -> Result<Decision> {
        let raw = match self.api_format {
            ApiFormat::Anthropic => {
                let text = self.complete_anthropic(&request).await?;
                if let Some(sink) = &partials {
                    let _ = sink.send(strip_skill_tags(&text));
                }
                text
            }
            ApiFormat::OpenAi => self.complete_openai_stream(&request, &partials).await?,
        };

        let (tag, narrative) = extract_skill_tag(&raw);
        let fallback = request
            .actor
            .skills
            .first()
            .map(|s| s.id.clone())
            .ok_or_else(|| EngineError::DecisionError("actor has no skills".into()))?;

        let (skill_id, confidence) = match tag {
            Some(id) => (SkillId::new(id), Confidence::High),
            None => {
                tracing::warn!("reply carried no skill directive, using first skill");
                (fallback, Confidence::Low)
            }
        };

        Ok(Decision {
            skill_id,
            narrative,
            confidence,
        })
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible streaming format
#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = LlmProvider::new(
            "test-key".into(),
            "https://openrouter.ai/api/v1/chat/completions".into(),
            "test-model".into(),
        );
        assert_eq!(provider.api_key, "test-key");
        assert_eq!(provider.api_format, ApiFormat::OpenAi);
    }

    #[test]
    fn test_anthropic_url_detection() {
        let provider = LlmProvider::new(
            "k".into(),
            "https://api.anthropic.com/v1/messages".into(),
            "m".into(),
        );
        assert_eq!(provider.api_format, ApiFormat::Anthropic);
    }

    #[test]
    fn test_stream_chunk_parsing() {
        let data = r#"{"choices":[{"delta":{"content":"Hel"}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(data).unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hel"));

        // Role-only deltas carry no content
        let data = r#"{"choices":[{"delta":{}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(data).unwrap();
        assert!(chunk.choices[0].delta.content.is_none());
    }

    #[test]
    fn test_from_env_missing_key() {
        if std::env::var("LLM_API_KEY").is_err() {
            assert!(LlmProvider::from_env().is_err());
        }
    }
}
