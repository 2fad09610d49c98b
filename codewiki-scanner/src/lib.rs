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

//! Repository traversal and the FileTree encodings.
//!
//! Directories are walked with [`ignore::WalkBuilder`], which gives full
//! git-conformant `.gitignore` semantics (anchors, `**`, negation) rather than the
//! bare-name pattern matcher the system this pipeline replaces used internally. Hidden
//! entries (dotfiles/dot-directories) are skipped, and files at or above one mebibyte
//! are skipped, matching the scan boundary this pipeline has always honored.
//!
//! All four encodings below sort directory entries the same way — directories before
//! files, then alphabetically by name — so that encoding a tree is deterministic
//! regardless of the order entries were discovered on disk.

pub mod format;
pub mod tree;

pub use format::{to_compact_json, to_compact_string, to_path_list, to_unix_tree};
pub use tree::{FileTreeNode, NodeType, PathInfo};

use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAX_FILE_SIZE_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("io error walking {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ignore error: {0}")]
    Ignore(#[from] ignore::Error),
}

/// Walks `root`, honoring `.gitignore`/`.ignore` files and skipping hidden entries and
/// files at or above [`MAX_FILE_SIZE_BYTES`]. Returns [`PathInfo`] for every surviving
/// entry, relative to `root`.
pub fn scan(root: impl AsRef<Path>) -> Result<Vec<PathInfo>, ScanError> {
    let root = root.as_ref();
    let mut infos = Vec::new();

    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .build();

    for entry in walker {
        let entry = entry.map_err(ScanError::Ignore)?;
        let path = entry.path();
        if path == root {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        let is_directory = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let metadata = entry.metadata().map_err(ScanError::Ignore)?;
        let size = metadata.len();

        if !is_directory && size >= MAX_FILE_SIZE_BYTES {
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        infos.push(PathInfo {
            path: relative.to_string_lossy().replace('\\', "/"),
            name,
            is_directory,
            size,
        });
    }

    Ok(infos)
}

/// Builds the newline-joined flat catalogue string: one `relative/path` per file, in
/// sorted order (the simplest of the four encodings, used as the smart-filter input).
pub fn get_catalogue(path_infos: &[PathInfo]) -> String {
    let mut files: Vec<&str> = path_infos
        .iter()
        .filter(|p| !p.is_directory)
        .map(|p| p.path.as_str())
        .collect();
    files.sort_unstable();
    files.join("\n")
}
