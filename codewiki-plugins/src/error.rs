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
pub enum PluginError {
    #[error("function not found: {0}")]
    NotFound(String),
    #[error("path escapes working directory: {0}")]
    PathEscape(String),
    #[error("invalid semantic function directory {0}: {1}")]
    InvalidDefinition(String, String),
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("function not enabled: {0}")]
    NotEnabled(String),
    #[error(transparent)]
    Llm(#[from] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PluginError>;
