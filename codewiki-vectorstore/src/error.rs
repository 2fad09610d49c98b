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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector store configuration error: {0}")]
    Config(String),
    #[error("space not found: {0}")]
    NotFound(String),
    #[error("transient remote error: {0}")]
    TransientRemote(String),
    #[error("failed to parse backend response: {0}")]
    Parse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl VectorStoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, VectorStoreError::TransientRemote(_))
    }
}

pub type Result<T> = std::result::Result<T, VectorStoreError>;

/// Classifies an HTTP status/body pair the same way the LLM adapter classifies
/// provider errors: rate limits, 5xx and connection trouble are retryable.
pub fn classify_http_error(status: reqwest::StatusCode, body: &str) -> VectorStoreError {
    let message = format!("{status}: {body}");
    let lower = message.to_lowercase();
    let retryable = ["rate limit", "429", "connection", "timeout", "network", "temporary", "busy", "overload", "service unavailable", "bad gateway", "gateway timeout", "too many requests"]
        .iter()
        .any(|kw| lower.contains(kw))
        || status.is_server_error();
    if retryable {
        VectorStoreError::TransientRemote(message)
    } else {
        VectorStoreError::Parse(message)
    }
}
