// Copyright 2025 Codewiki Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The provider-agnostic chat abstraction over OpenAI, Anthropic, DeepSeek and Ollama.
//!
//! Every provider call is wrapped by the shared retry utility
//! ([`codewiki_core::retry`]); a call is retried only when the underlying error looks
//! transient (timeouts, 5xx, connection resets), never on 4xx/validation failures.

pub mod providers;
pub use providers::*;

use codewiki_core::config::LlmConfig;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub available: bool,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub response_model: Option<String>,
    pub response_id: Option<String>,
    /// Legacy combined total; probed from `usage.total_tokens` first, falling back to
    /// `input_tokens + output_tokens` when a provider only reports the split.
    pub tokens_used: Option<u32>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub finish_reason: Option<String>,
    pub duration_ms: u32,
}

/// A tool the model may call, described the way the wire format (OpenAI-style function
/// calling) expects: a name, a human description, and a JSON Schema for its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Whether the model must, may, or must not call a tool this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    None,
    Auto,
    Required,
}

/// One invocation the model asked to make.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskToolResponse {
    pub content: String,
    pub tool_calls: Vec<ToolInfo>,
}

impl AskToolResponse {
    /// Serializes `tool_calls` as the canonical `<tool_calls><tool>{...}</tool>...
    /// </tool_calls>` block and appends it after `content`, matching the format a
    /// caller re-parses a tool call out of a plain-text response with.
    pub fn format_with_tool_calls(&self) -> String {
        if self.tool_calls.is_empty() {
            return self.content.clone();
        }
        let mut out = self.content.clone();
        out.push_str("\n<tool_calls>\n");
        for call in &self.tool_calls {
            let body = serde_json::json!({"id": call.id, "name": call.name, "args": call.args});
            out.push_str("<tool>\n");
            out.push_str(&serde_json::to_string_pretty(&body).unwrap_or_default());
            out.push_str("\n</tool>\n");
        }
        out.push_str("</tool_calls>");
        out
    }
}

#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        model: Option<String>,
    ) -> anyhow::Result<ChatResponse>;

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: Option<String>,
    ) -> anyhow::Result<tokio::sync::mpsc::Receiver<String>>;

    /// Single-shot tool-calling: the model may answer directly or ask to invoke one or
    /// more of `tools`, constrained by `tool_choice`. The default implementation refuses
    /// to serve `Required` without any tools offered and otherwise falls back to a plain
    /// [`chat`](Self::chat) call with no tool calls recorded, for providers that don't
    /// support function calling at all.
    async fn ask_tools(
        &self,
        messages: Vec<ChatMessage>,
        model: Option<String>,
        tools: Vec<ToolSpec>,
        tool_choice: ToolChoice,
    ) -> anyhow::Result<AskToolResponse> {
        if tool_choice == ToolChoice::Required && tools.is_empty() {
            anyhow::bail!("tool_choice is Required but no tools were provided");
        }
        let response = self.chat(messages, model).await?;
        Ok(AskToolResponse { content: response.content, tool_calls: Vec::new() })
    }

    /// Streaming counterpart of [`ask_tools`](Self::ask_tools). The default
    /// implementation forwards to [`stream_chat`](Self::stream_chat); a provider with
    /// real function calling overrides this to append the `<tool_calls>` block (see
    /// [`AskToolResponse::format_with_tool_calls`]) once streaming ends.
    async fn ask_tools_stream(
        &self,
        messages: Vec<ChatMessage>,
        model: Option<String>,
        tools: Vec<ToolSpec>,
        tool_choice: ToolChoice,
    ) -> anyhow::Result<tokio::sync::mpsc::Receiver<String>> {
        if tool_choice == ToolChoice::Required && tools.is_empty() {
            anyhow::bail!("tool_choice is Required but no tools were provided");
        }
        self.stream_chat(messages, model).await
    }

    fn list_models(&self) -> Vec<String>;
    fn name(&self) -> &str;

    /// A 32-way concurrent pressure test: fires the same trivial prompt 32 times and
    /// considers the provider "strong enough" only if every single call succeeds
    /// within 30 seconds. Used to gate a provider in or out of load-bearing pipeline
    /// stages before committing a whole run to it.
    async fn is_strong_enough(&self) -> bool {
        let probe = || async {
            let messages = vec![ChatMessage::user("Are you strong enough!?")];
            match tokio::time::timeout(std::time::Duration::from_secs(30), self.chat(messages, None)).await {
                Ok(Ok(response)) => !response.content.contains("**ERROR**"),
                _ => false,
            }
        };
        let results = futures::future::join_all((0..32).map(|_| probe())).await;
        results.into_iter().all(|ok| ok)
    }
}

/// Wraps `reasoning_content` deltas in `<think>...</think>` ahead of the regular content
/// delta, closing the tag exactly once when real content resumes. Matches the
/// reasoning-mode streaming convention of DeepSeek-style `reasoning_content` fields.
#[derive(Debug, Default)]
pub struct ReasoningStreamWrapper {
    reasoning_open: bool,
}

impl ReasoningStreamWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats one chunk's reasoning and content deltas, emitting `<think>`/`</think>`
    /// transitions as needed. Either delta may be empty or absent.
    pub fn push(&mut self, reasoning_delta: Option<&str>, content_delta: Option<&str>) -> String {
        let mut out = String::new();
        if let Some(reasoning) = reasoning_delta.filter(|r| !r.is_empty()) {
            if !self.reasoning_open {
                self.reasoning_open = true;
                out.push_str("<think>");
            }
            out.push_str(reasoning);
        }
        if let Some(content) = content_delta.filter(|c| !c.is_empty()) {
            if self.reasoning_open {
                out.push_str("</think>");
                self.reasoning_open = false;
            }
            out.push_str(content);
        }
        out
    }
}

/// Appends the localized notice used when a provider reports its response was cut off
/// by the context-length limit (`finish_reason == "length"`).
pub fn add_truncate_notice(content: &str, chinese: bool) -> String {
    let mut out = content.to_string();
    if chinese {
        out.push_str("……\n由于大模型的上下文窗口大小限制，回答已经被大模型截断。");
    } else {
        out.push_str("...\nThe answer is truncated by your chosen LLM due to its limitation on context length.");
    }
    out
}

/// Resolves the legacy combined token count: prefer an explicit total, else sum the
/// split, else `None`.
pub fn resolve_token_total(total: Option<u32>, input: Option<u32>, output: Option<u32>) -> Option<u32> {
    total.or_else(|| match (input, output) {
        (Some(i), Some(o)) => Some(i + o),
        _ => None,
    })
}

fn is_retryable(err: &anyhow::Error) -> bool {
    let message = err.to_string().to_lowercase();
    ["timeout", "timed out", "connection reset", "502", "503", "504", "temporarily"]
        .iter()
        .any(|kw| message.contains(kw))
}

pub struct LLMProviderManager {
    providers: DashMap<String, Arc<dyn LLMProvider>>,
}

impl LLMProviderManager {
    pub fn new(llm_config: &LlmConfig) -> anyhow::Result<Self> {
        let providers = DashMap::new();

        if let Some(key) = llm_config.openai.api_key.clone() {
            providers.insert("openai".to_string(), Arc::new(OpenAIProvider::new(key)?) as Arc<dyn LLMProvider>);
            info!("initialized openai provider");
        } else {
            warn!("openai api key not set, openai provider disabled");
        }

        if let Some(key) = llm_config.anthropic.api_key.clone() {
            providers.insert("anthropic".to_string(), Arc::new(AnthropicProvider::new(key)?) as Arc<dyn LLMProvider>);
            info!("initialized anthropic provider");
        } else {
            warn!("anthropic api key not set, anthropic provider disabled");
        }

        if let Some(key) = llm_config.deepseek.api_key.clone() {
            providers.insert("deepseek".to_string(), Arc::new(DeepSeekProvider::new(key)?) as Arc<dyn LLMProvider>);
            info!("initialized deepseek provider");
        } else {
            warn!("deepseek api key not set, deepseek provider disabled");
        }

        if let Some(base_url) = llm_config.ollama.base_url.clone() {
            providers.insert("ollama".to_string(), Arc::new(OllamaProvider::new(base_url)?) as Arc<dyn LLMProvider>);
            info!("initialized ollama provider");
        }

        Ok(Self { providers })
    }

    pub async fn chat(
        &self,
        provider_id: &str,
        model: Option<String>,
        messages: Vec<ChatMessage>,
    ) -> anyhow::Result<ChatResponse> {
        let provider = self
            .providers
            .get(provider_id)
            .ok_or_else(|| anyhow::anyhow!("provider not found: {provider_id}"))?
            .clone();

        codewiki_core::retry(
            || {
                let provider = provider.clone();
                let messages = messages.clone();
                let model = model.clone();
                async move { provider.chat(messages, model).await }
            },
            codewiki_core::DEFAULT_MAX_ATTEMPTS,
            is_retryable,
            |attempt| codewiki_core::default_delay(attempt).max(Duration::from_millis(200)),
        )
        .await
    }

    pub async fn stream_chat(
        &self,
        provider_id: &str,
        model: Option<String>,
        messages: Vec<ChatMessage>,
    ) -> anyhow::Result<tokio::sync::mpsc::Receiver<String>> {
        let provider = self
            .providers
            .get(provider_id)
            .ok_or_else(|| anyhow::anyhow!("provider not found: {provider_id}"))?;
        provider.stream_chat(messages, model).await
    }

    pub async fn ask_tools(
        &self,
        provider_id: &str,
        model: Option<String>,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSpec>,
        tool_choice: ToolChoice,
    ) -> anyhow::Result<AskToolResponse> {
        let provider = self
            .providers
            .get(provider_id)
            .ok_or_else(|| anyhow::anyhow!("provider not found: {provider_id}"))?
            .clone();
        provider.ask_tools(messages, model, tools, tool_choice).await
    }

    pub async fn ask_tools_stream(
        &self,
        provider_id: &str,
        model: Option<String>,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolSpec>,
        tool_choice: ToolChoice,
    ) -> anyhow::Result<tokio::sync::mpsc::Receiver<String>> {
        let provider = self
            .providers
            .get(provider_id)
            .ok_or_else(|| anyhow::anyhow!("provider not found: {provider_id}"))?;
        provider.ask_tools_stream(messages, model, tools, tool_choice).await
    }

    /// Runs [`LLMProvider::is_strong_enough`]'s 32-way pressure test against the named
    /// provider.
    pub async fn is_strong_enough(&self, provider_id: &str) -> anyhow::Result<bool> {
        let provider = self
            .providers
            .get(provider_id)
            .ok_or_else(|| anyhow::anyhow!("provider not found: {provider_id}"))?
            .clone();
        Ok(provider.is_strong_enough().await)
    }

    /// Registers or replaces a provider under `id`, for providers that aren't
    /// constructed from `LlmConfig` directly (e.g. ones wrapping another manager).
    pub fn register_provider(&self, id: impl Into<String>, provider: Arc<dyn LLMProvider>) {
        self.providers.insert(id.into(), provider);
    }

    pub fn list_providers(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|entry| {
                let (id, provider) = entry.pair();
                ProviderInfo {
                    id: id.clone(),
                    name: provider.name().to_string(),
                    available: true,
                    models: provider.list_models(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_total_prefers_explicit_total() {
        assert_eq!(resolve_token_total(Some(10), Some(3), Some(4)), Some(10));
    }

    #[test]
    fn token_total_falls_back_to_sum() {
        assert_eq!(resolve_token_total(None, Some(3), Some(4)), Some(7));
    }

    #[test]
    fn token_total_none_when_nothing_reported() {
        assert_eq!(resolve_token_total(None, None, None), None);
    }

    #[test]
    fn reasoning_wrapper_opens_and_closes_think_once() {
        let mut wrapper = ReasoningStreamWrapper::new();
        let mut out = String::new();
        out.push_str(&wrapper.push(Some("pondering"), None));
        out.push_str(&wrapper.push(Some(" further"), None));
        out.push_str(&wrapper.push(None, Some("the answer")));
        out.push_str(&wrapper.push(None, Some(" is 42")));
        assert_eq!(out, "<think>pondering further</think>the answer is 42");
    }

    #[test]
    fn reasoning_wrapper_skips_think_tags_without_reasoning() {
        let mut wrapper = ReasoningStreamWrapper::new();
        assert_eq!(wrapper.push(None, Some("hello")), "hello");
    }

    #[test]
    fn truncate_notice_is_localized() {
        assert!(add_truncate_notice("partial", false).ends_with("limitation on context length."));
        assert!(add_truncate_notice("partial", true).contains("大模型"));
    }

    #[test]
    fn ask_tool_response_formats_canonical_block() {
        let response = AskToolResponse {
            content: "Let me check.".to_string(),
            tool_calls: vec![ToolInfo { id: "call-1".to_string(), name: "file".to_string(), args: serde_json::json!({"op": "read", "path": "a.rs"}) }],
        };
        let formatted = response.format_with_tool_calls();
        assert!(formatted.starts_with("Let me check.\n<tool_calls>\n<tool>"));
        assert!(formatted.trim_end().ends_with("</tool_calls>"));
        assert!(formatted.contains("\"name\": \"file\""));
    }

    #[test]
    fn ask_tool_response_without_calls_is_just_content() {
        let response = AskToolResponse { content: "done".to_string(), tool_calls: Vec::new() };
        assert_eq!(response.format_with_tool_calls(), "done");
    }

    struct StaticProvider {
        content: &'static str,
    }

    #[async_trait::async_trait]
    impl LLMProvider for StaticProvider {
        async fn chat(&self, _messages: Vec<ChatMessage>, model: Option<String>) -> anyhow::Result<ChatResponse> {
            Ok(ChatResponse {
                content: self.content.to_string(),
                provider: "static".to_string(),
                model: model.unwrap_or_default(),
                response_model: None,
                response_id: None,
                tokens_used: None,
                input_tokens: None,
                output_tokens: None,
                finish_reason: None,
                duration_ms: 0,
            })
        }

        async fn stream_chat(&self, _messages: Vec<ChatMessage>, _model: Option<String>) -> anyhow::Result<tokio::sync::mpsc::Receiver<String>> {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            Ok(rx)
        }

        fn list_models(&self) -> Vec<String> {
            vec!["static-1".to_string()]
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    #[tokio::test]
    async fn default_ask_tools_falls_back_to_chat_with_no_tool_calls() {
        let provider = StaticProvider { content: "hi" };
        let response = provider.ask_tools(vec![ChatMessage::user("hello")], None, Vec::new(), ToolChoice::Auto).await.unwrap();
        assert_eq!(response.content, "hi");
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn default_ask_tools_rejects_required_without_tools() {
        let provider = StaticProvider { content: "hi" };
        let result = provider.ask_tools(vec![ChatMessage::user("hello")], None, Vec::new(), ToolChoice::Required).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn default_is_strong_enough_passes_when_chat_succeeds() {
        let provider = StaticProvider { content: "fine" };
        assert!(provider.is_strong_enough().await);
    }

    #[tokio::test]
    async fn default_is_strong_enough_fails_on_error_marker() {
        let provider = StaticProvider { content: "**ERROR** out of tokens" };
        assert!(!provider.is_strong_enough().await);
    }
}
