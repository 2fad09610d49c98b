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

//! The LLM-facing kernel and the native/semantic function plugins it exposes.

pub mod context;
pub mod error;
pub mod kernel;
pub mod native;
pub mod semantic;

pub use context::{DocumentContext, GitIssue};
pub use error::{PluginError, Result};
pub use kernel::{FunctionChoiceBehavior, Kernel, KernelCache, KernelCacheKey};
pub use native::{FileFunction, GiteeFunction, GithubFunction, NativeFunction, RagFunction};
pub use semantic::{load_plugin_directory, PromptParameter, SemanticFunction, SemanticFunctionConfig};
