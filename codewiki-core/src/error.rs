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

//! Shared error taxonomy for the pipeline.
//!
//! Each crate defines its own narrow error enum and converts into [`CodewikiError`] at
//! its boundary via `#[from]`, mirroring the error kinds catalogued for the pipeline:
//! config, not-found, conflict, validation, IO, transient-remote, parse and cancelled.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodewikiError>;

#[derive(Debug, Error)]
pub enum CodewikiError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transient remote error: {0}")]
    TransientRemote(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl CodewikiError {
    /// Whether a caller implementing the shared retry utility should treat this error
    /// as retryable. Transient-remote errors are retryable; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CodewikiError::TransientRemote(_))
    }
}
