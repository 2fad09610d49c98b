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

//! Codewiki Core
//!
//! Shared data model, configuration, error taxonomy and resilience primitives used by
//! every other crate in the pipeline.

pub mod config;
pub mod error;
pub mod model;
pub mod resilience;
pub mod retry;

pub use config::{
    CodeWikiGenConfig, CodewikiConfig, GitConfig, LlmConfig, Mem0Config, ProviderConfig,
    StorageConfig, VectorStoreConfig,
};
pub use error::{CodewikiError, Result};
pub use model::{
    Catalog, ClassifyType, CommitRecord, Content, ContentSource, MiniMap, MiniMapNode, Overview,
    PipelineStage, PipelineStatus, Repository, WikiDocument,
};
pub use resilience::{Bulkhead, CircuitBreaker, CircuitConfig, RetryPolicy};
pub use retry::{default_delay, retry, DEFAULT_MAX_ATTEMPTS};
