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

//! SQLite-backed persistence for wiki documents and the artifacts each pipeline stage
//! produces.

pub mod error;
pub mod pool;
pub mod schema;
pub mod store;

pub use error::{Result, StorageError};
pub use pool::{PooledConnection, StoragePool};
pub use store::WikiStore;
