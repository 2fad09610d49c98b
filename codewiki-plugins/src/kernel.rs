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

//! The LLM-facing kernel: binds a provider, a model, native function plugins and
//! semantic (prompt-directory) functions into one callable surface.

use crate::context::DocumentContext;
use crate::error::{PluginError, Result};
use crate::native::NativeFunction;
use crate::semantic::{load_plugin_directory, SemanticFunction};
use codewiki_llm::{ChatMessage, ChatResponse, LLMProvider, ToolChoice, ToolSpec};
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionChoiceBehavior {
    Auto,
    None,
}

/// Upper bound on tool-call round-trips in [`Kernel::invoke_prompt_with_tools`] before
/// falling back to a plain answer, so a model that never stops requesting tools cannot
/// loop a stage forever.
const MAX_TOOL_ROUNDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelCacheKey {
    pub base_url: String,
    pub api_key: String,
    pub working_dir: String,
    pub model: String,
    pub analysis_mode: String,
}

pub struct Kernel {
    provider: Arc<dyn LLMProvider>,
    model: String,
    working_dir: PathBuf,
    native_functions: HashMap<&'static str, Arc<dyn NativeFunction>>,
    semantic_functions: HashMap<String, SemanticFunction>,
}

impl Kernel {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            model: model.into(),
            working_dir: working_dir.into(),
            native_functions: HashMap::new(),
            semantic_functions: HashMap::new(),
        }
    }

    pub fn register_native(&mut self, function: Arc<dyn NativeFunction>) {
        self.native_functions.insert(function.name(), function);
    }

    /// Loads every `config.json` + `skprompt.txt` pair directly under `plugins_dir`
    /// as a named semantic function.
    pub fn load_semantic_plugins(&mut self, plugins_dir: &std::path::Path) -> Result<usize> {
        let functions = load_plugin_directory(plugins_dir)?;
        let count = functions.len();
        for function in functions {
            self.semantic_functions.insert(function.name.clone(), function);
        }
        Ok(count)
    }

    pub fn working_dir(&self) -> &std::path::Path {
        &self.working_dir
    }

    fn tool_system_message(&self, behavior: FunctionChoiceBehavior) -> Option<ChatMessage> {
        if behavior != FunctionChoiceBehavior::Auto || self.native_functions.is_empty() {
            return None;
        }
        let mut lines = vec!["You may call the following tools by name:".to_string()];
        let mut names: Vec<_> = self.native_functions.keys().collect();
        names.sort();
        for name in names {
            let function = &self.native_functions[name];
            lines.push(format!("- {}: {}", function.name(), function.description()));
        }
        Some(ChatMessage::system(lines.join("\n")))
    }

    /// Renders a raw prompt template (not a named semantic function) and sends it
    /// as a single user turn.
    pub async fn invoke_prompt(&self, prompt: &str, system: Option<&str>) -> anyhow::Result<ChatResponse> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));
        self.provider.chat(messages, Some(self.model.clone())).await
    }

    pub async fn invoke_prompt_stream(&self, prompt: &str, system: Option<&str>) -> anyhow::Result<Receiver<String>> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));
        self.provider.stream_chat(messages, Some(self.model.clone())).await
    }

    fn tool_specs(&self) -> Vec<ToolSpec> {
        self.native_functions
            .values()
            .map(|f| ToolSpec { name: f.name().to_string(), description: f.description().to_string(), parameters: f.parameters() })
            .collect()
    }

    /// Renders a raw prompt template and drives it through a real tool-calling loop:
    /// the provider's [`LLMProvider::ask_tools`] is given every registered native
    /// function, each requested call is actually invoked via [`Self::call_native`], and
    /// its result is fed back as a turn until the model answers without requesting any
    /// more tools or [`MAX_TOOL_ROUNDS`] is reached. With `FunctionChoiceBehavior::None`
    /// or no registered native functions this degrades to a plain [`Self::invoke_prompt`].
    pub async fn invoke_prompt_with_tools(
        &self,
        prompt: &str,
        system: Option<&str>,
        behavior: FunctionChoiceBehavior,
        context: &DocumentContext,
    ) -> anyhow::Result<ChatResponse> {
        if behavior != FunctionChoiceBehavior::Auto || self.native_functions.is_empty() {
            return self.invoke_prompt(prompt, system).await;
        }

        let tools = self.tool_specs();
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));

        for _ in 0..MAX_TOOL_ROUNDS {
            let response = self.provider.ask_tools(messages.clone(), Some(self.model.clone()), tools.clone(), ToolChoice::Auto).await?;

            if response.tool_calls.is_empty() {
                return Ok(ChatResponse {
                    content: response.content,
                    provider: self.provider.name().to_string(),
                    model: self.model.clone(),
                    response_model: None,
                    response_id: None,
                    tokens_used: None,
                    input_tokens: None,
                    output_tokens: None,
                    finish_reason: None,
                    duration_ms: 0,
                });
            }

            if !response.content.is_empty() {
                messages.push(ChatMessage::assistant(response.content.clone()));
            }
            for call in &response.tool_calls {
                let observation = match self.call_native(&call.name, call.args.clone(), context).await {
                    Ok(value) => value.to_string(),
                    Err(err) => format!("error: {err}"),
                };
                messages.push(ChatMessage::user(format!("Tool `{}` returned: {observation}", call.name)));
            }
        }

        self.provider.chat(messages, Some(self.model.clone())).await
    }

    /// Renders the named semantic function against `args` and invokes the model,
    /// optionally advertising native function tools (`FunctionChoiceBehavior::Auto`).
    pub async fn invoke_by_plugin(
        &self,
        plugin_name: &str,
        args: &HashMap<String, String>,
        behavior: FunctionChoiceBehavior,
        _context: &DocumentContext,
    ) -> Result<ChatResponse> {
        let function = self
            .semantic_functions
            .get(plugin_name)
            .ok_or_else(|| PluginError::NotFound(plugin_name.to_string()))?;
        let rendered = function.render(args)?;

        let mut messages = Vec::new();
        if let Some(tool_message) = self.tool_system_message(behavior) {
            messages.push(tool_message);
        }
        messages.push(ChatMessage::user(rendered));
        self.provider
            .chat(messages, Some(self.model.clone()))
            .await
            .map_err(PluginError::Llm)
    }

    pub async fn invoke_by_plugin_stream(
        &self,
        plugin_name: &str,
        args: &HashMap<String, String>,
        behavior: FunctionChoiceBehavior,
    ) -> Result<Receiver<String>> {
        let function = self
            .semantic_functions
            .get(plugin_name)
            .ok_or_else(|| PluginError::NotFound(plugin_name.to_string()))?;
        let rendered = function.render(args)?;

        let mut messages = Vec::new();
        if let Some(tool_message) = self.tool_system_message(behavior) {
            messages.push(tool_message);
        }
        messages.push(ChatMessage::user(rendered));
        self.provider
            .stream_chat(messages, Some(self.model.clone()))
            .await
            .map_err(PluginError::Llm)
    }

    pub async fn call_native(&self, name: &str, args: serde_json::Value, context: &DocumentContext) -> Result<serde_json::Value> {
        let function = self.native_functions.get(name).ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        function.invoke(args, context).await
    }
}

/// Caches kernel instances by `(base_url, api_key, working_dir, model, analysis_mode)`;
/// entries are immutable once inserted and shared across concurrent callers, with no
/// eviction — one kernel per distinct configuration for the lifetime of the process.
#[derive(Default)]
pub struct KernelCache {
    kernels: DashMap<KernelCacheKey, Arc<Kernel>>,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with(&self, key: KernelCacheKey, build: impl FnOnce() -> Kernel) -> Arc<Kernel> {
        if let Some(existing) = self.kernels.get(&key) {
            return existing.clone();
        }
        let kernel = Arc::new(build());
        self.kernels.insert(key.clone(), kernel.clone());
        kernel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct EchoProvider;

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn chat(&self, messages: Vec<ChatMessage>, model: Option<String>) -> anyhow::Result<ChatResponse> {
            Ok(ChatResponse {
                content: messages.last().map(|m| m.content.clone()).unwrap_or_default(),
                provider: "echo".to_string(),
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

        async fn stream_chat(&self, _messages: Vec<ChatMessage>, _model: Option<String>) -> anyhow::Result<mpsc::Receiver<String>> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        fn list_models(&self) -> Vec<String> {
            vec!["echo-1".to_string()]
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn invoke_prompt_roundtrips_through_provider() {
        let kernel = Kernel::new(Arc::new(EchoProvider), "echo-1", ".");
        let response = kernel.invoke_prompt("hello", None).await.unwrap();
        assert_eq!(response.content, "hello");
    }

    #[tokio::test]
    async fn invoke_by_plugin_renders_and_calls() {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("Greet");
        std::fs::create_dir(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join("config.json"), r#"{"input_parameters": []}"#).unwrap();
        std::fs::write(plugin_dir.join("skprompt.txt"), "hi there").unwrap();

        let mut kernel = Kernel::new(Arc::new(EchoProvider), "echo-1", ".");
        kernel.load_semantic_plugins(dir.path()).unwrap();

        let context = DocumentContext::new();
        let response = kernel
            .invoke_by_plugin("Greet", &HashMap::new(), FunctionChoiceBehavior::None, &context)
            .await
            .unwrap();
        assert_eq!(response.content, "hi there");
    }

    struct ToolCallingProvider {
        rounds: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl LLMProvider for ToolCallingProvider {
        async fn chat(&self, messages: Vec<ChatMessage>, model: Option<String>) -> anyhow::Result<ChatResponse> {
            Ok(ChatResponse {
                content: messages.last().map(|m| m.content.clone()).unwrap_or_default(),
                provider: "tool-calling".to_string(),
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

        async fn stream_chat(&self, _messages: Vec<ChatMessage>, _model: Option<String>) -> anyhow::Result<mpsc::Receiver<String>> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn ask_tools(
            &self,
            messages: Vec<ChatMessage>,
            model: Option<String>,
            _tools: Vec<codewiki_llm::ToolSpec>,
            _tool_choice: ToolChoice,
        ) -> anyhow::Result<codewiki_llm::AskToolResponse> {
            let round = self.rounds.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if round == 0 {
                return Ok(codewiki_llm::AskToolResponse {
                    content: String::new(),
                    tool_calls: vec![codewiki_llm::ToolInfo {
                        id: "call-1".to_string(),
                        name: "file".to_string(),
                        args: serde_json::json!({"op": "read", "path": "notes.txt"}),
                    }],
                });
            }
            let observation = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            let _ = model;
            Ok(codewiki_llm::AskToolResponse { content: observation, tool_calls: Vec::new() })
        }

        fn list_models(&self) -> Vec<String> {
            vec!["tool-1".to_string()]
        }

        fn name(&self) -> &str {
            "tool-calling"
        }
    }

    #[tokio::test]
    async fn invoke_prompt_with_tools_actually_invokes_native_function() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello from disk").unwrap();

        let mut kernel = Kernel::new(Arc::new(ToolCallingProvider { rounds: std::sync::atomic::AtomicUsize::new(0) }), "tool-1", dir.path());
        kernel.register_native(Arc::new(crate::native::FileFunction::new(dir.path())));

        let context = DocumentContext::new();
        let response = kernel
            .invoke_prompt_with_tools("read notes.txt please", None, FunctionChoiceBehavior::Auto, &context)
            .await
            .unwrap();

        assert!(response.content.contains("hello from disk"));
    }

    #[tokio::test]
    async fn invoke_prompt_with_tools_skips_loop_without_native_functions() {
        let kernel = Kernel::new(Arc::new(EchoProvider), "echo-1", ".");
        let context = DocumentContext::new();
        let response = kernel.invoke_prompt_with_tools("hello", None, FunctionChoiceBehavior::Auto, &context).await.unwrap();
        assert_eq!(response.content, "hello");
    }

    #[test]
    fn cache_returns_same_instance_for_same_key() {
        let cache = KernelCache::new();
        let key = KernelCacheKey {
            base_url: "https://api.openai.com".to_string(),
            api_key: "k".to_string(),
            working_dir: "/repo".to_string(),
            model: "gpt-4o-mini".to_string(),
            analysis_mode: "default".to_string(),
        };
        let a = cache.get_or_insert_with(key.clone(), || Kernel::new(Arc::new(EchoProvider), "gpt-4o-mini", "/repo"));
        let b = cache.get_or_insert_with(key, || Kernel::new(Arc::new(EchoProvider), "gpt-4o-mini", "/repo"));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
