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
pub enum OrchestratorError {
    #[error("wiki document not found: {0}")]
    DocumentNotFound(String),
    #[error("no llm provider configured for {0}")]
    NoProvider(String),
    #[error(transparent)]
    Storage(#[from] codewiki_storage::StorageError),
    #[error(transparent)]
    Plugin(#[from] codewiki_plugins::error::PluginError),
    #[error(transparent)]
    Scan(#[from] codewiki_scanner::ScanError),
    #[error(transparent)]
    Prompt(#[from] codewiki_prompts::PromptError),
    #[error(transparent)]
    Llm(#[from] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
