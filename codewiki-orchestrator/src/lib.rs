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

//! Drives a repository through the readme/catalogue/classify/minimap/overview/wiki
//! generation pipeline and persists each stage's output as it completes.

pub mod error;
pub mod minimap;
pub mod parse;
pub mod pipeline;
pub mod provider;

pub use error::{OrchestratorError, Result};
pub use pipeline::Orchestrator;
pub use provider::ManagedProvider;
