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

//! Unifies Elasticsearch and OpenSearch behind one interface for semantic search
//! over generated wiki content and ingested source files.

pub mod adapter;
pub mod body;
pub mod error;
pub mod query;
pub mod result;
pub mod sql;

pub use adapter::{ElasticsearchAdapter, OpenSearchAdapter, VectorStore};
pub use error::{VectorStoreError, Result};
pub use query::{
    Condition, DistanceType, FusionExpr, FusionParams, MatchDenseExpr, MatchExprs,
    MatchSparseExpr, MatchTensorExpr, MatchTextExpr, SearchRequest, SortField, SortMode,
    SortOrder,
};

use codewiki_core::config::VectorStoreConfig;
use std::sync::Arc;

/// Builds the configured adapter (Elasticsearch or OpenSearch) from the shared config.
pub fn build_adapter(config: &VectorStoreConfig) -> Result<Arc<dyn VectorStore>> {
    match config.engine.as_str() {
        "opensearch" => {
            let hosts = config.os_hosts.clone().ok_or_else(|| VectorStoreError::Config("os_hosts not configured".to_string()))?;
            Ok(Arc::new(OpenSearchAdapter::new(hosts, config.os_username.clone(), config.os_password.clone())))
        }
        _ => {
            let hosts = config.es_hosts.clone().ok_or_else(|| VectorStoreError::Config("es_hosts not configured".to_string()))?;
            Ok(Arc::new(ElasticsearchAdapter::new(hosts, config.es_username.clone(), config.es_password.clone())))
        }
    }
}
