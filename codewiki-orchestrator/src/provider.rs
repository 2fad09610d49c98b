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

//! Binds a [`Kernel`](codewiki_plugins::Kernel) to one provider out of the shared
//! [`LLMProviderManager`], so the orchestrator doesn't have to reach into the
//! manager's internals to satisfy `Kernel::new`'s `Arc<dyn LLMProvider>` parameter.

use codewiki_llm::{AskToolResponse, ChatMessage, ChatResponse, LLMProvider, LLMProviderManager, ToolChoice, ToolSpec};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;

pub struct ManagedProvider {
    manager: Arc<LLMProviderManager>,
    provider_id: String,
}

impl ManagedProvider {
    pub fn new(manager: Arc<LLMProviderManager>, provider_id: impl Into<String>) -> Self {
        Self { manager, provider_id: provider_id.into() }
    }
}

#[async_trait::async_trait]
impl LLMProvider for ManagedProvider {
    async fn chat(&self, messages: Vec<ChatMessage>, model: Option<String>) -> anyhow::Result<ChatResponse> {
        self.manager.chat(&self.provider_id, model, messages).await
    }

    async fn stream_chat(&self, messages: Vec<ChatMessage>, model: Option<String>) -> anyhow::Result<Receiver<String>> {
        self.manager.stream_chat(&self.provider_id, model, messages).await
    }

    async fn ask_tools(
        &self,
        messages: Vec<ChatMessage>,
        model: Option<String>,
        tools: Vec<ToolSpec>,
        tool_choice: ToolChoice,
    ) -> anyhow::Result<AskToolResponse> {
        self.manager.ask_tools(&self.provider_id, model, messages, tools, tool_choice).await
    }

    async fn ask_tools_stream(
        &self,
        messages: Vec<ChatMessage>,
        model: Option<String>,
        tools: Vec<ToolSpec>,
        tool_choice: ToolChoice,
    ) -> anyhow::Result<Receiver<String>> {
        self.manager.ask_tools_stream(&self.provider_id, model, messages, tools, tool_choice).await
    }

    async fn is_strong_enough(&self) -> bool {
        self.manager.is_strong_enough(&self.provider_id).await.unwrap_or(false)
    }

    fn list_models(&self) -> Vec<String> {
        self.manager
            .list_providers()
            .into_iter()
            .find(|p| p.id == self.provider_id)
            .map(|p| p.models)
            .unwrap_or_default()
    }

    fn name(&self) -> &str {
        &self.provider_id
    }
}
