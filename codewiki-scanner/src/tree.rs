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

//! The FileTree itself: a name-indexed node tree built from a flat [`PathInfo`] list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInfo {
    pub path: String,
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    File,
    Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTreeNode {
    pub name: String,
    pub node_type: NodeType,
    /// Keyed by child name; a `BTreeMap` gives a stable default iteration order, which
    /// the encodings below then re-sort as needed (directories-first, alphabetical).
    pub children: BTreeMap<String, FileTreeNode>,
}

impl FileTreeNode {
    fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            children: BTreeMap::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.node_type, NodeType::File)
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.node_type, NodeType::Directory)
    }

    /// Children sorted directories-first, then alphabetically by name. Used by every
    /// encoding so that tree rendering is deterministic regardless of scan order.
    pub fn sorted_children(&self) -> Vec<&FileTreeNode> {
        let mut children: Vec<&FileTreeNode> = self.children.values().collect();
        children.sort_by(|a, b| a.is_file().cmp(&b.is_file()).then_with(|| a.name.cmp(&b.name)));
        children
    }
}

/// Builds a [`FileTreeNode`] tree from a flat path list. Paths starting with `.` are
/// skipped (scanning already excludes hidden entries, but this mirrors the original
/// tree-builder's own defensive check for inputs built by hand).
pub fn build_tree(path_infos: &[PathInfo]) -> FileTreeNode {
    let mut root = FileTreeNode::new("", NodeType::Directory);

    for info in path_infos {
        let normalized = info.path.replace('\\', "/");
        let parts: Vec<&str> = normalized
            .split('/')
            .filter(|p| !p.is_empty() && !p.starts_with('.'))
            .collect();
        if parts.is_empty() {
            continue;
        }

        let mut node = &mut root;
        for (idx, part) in parts.iter().enumerate() {
            let is_last = idx == parts.len() - 1;
            let node_type = if is_last && !info.is_directory {
                NodeType::File
            } else {
                NodeType::Directory
            };
            node = node
                .children
                .entry(part.to_string())
                .or_insert_with(|| FileTreeNode::new(*part, node_type));
            if is_last {
                node.node_type = node_type;
            }
        }
    }

    root
}

/// Flat `"{path}({D|F})"` listing of every descendant, recursing in sorted order.
pub fn get_all_paths(node: &FileTreeNode) -> Vec<String> {
    let mut out = Vec::new();
    collect_paths(node, "", &mut out);
    out
}

fn collect_paths(node: &FileTreeNode, current_path: &str, out: &mut Vec<String>) {
    for child in node.sorted_children() {
        let child_path = if current_path.is_empty() {
            child.name.clone()
        } else {
            format!("{current_path}/{}", child.name)
        };
        let marker = if child.is_file() { "F" } else { "D" };
        out.push(format!("{child_path}({marker})"));
        if child.is_directory() {
            collect_paths(child, &child_path, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(path: &str, is_directory: bool) -> PathInfo {
        PathInfo {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            is_directory,
            size: 0,
        }
    }

    #[test]
    fn builds_nested_tree() {
        let infos = vec![
            info("src", true),
            info("src/main.rs", false),
            info("src/lib.rs", false),
            info("README.md", false),
        ];
        let tree = build_tree(&infos);
        assert_eq!(tree.children.len(), 2);
        let src = tree.children.get("src").unwrap();
        assert!(src.is_directory());
        assert_eq!(src.children.len(), 2);
    }

    #[test]
    fn skips_dotfiles() {
        let infos = vec![info(".git/HEAD", false), info("a.txt", false)];
        let tree = build_tree(&infos);
        assert_eq!(tree.children.len(), 1);
        assert!(tree.children.contains_key("a.txt"));
    }

    #[test]
    fn sorted_children_are_directories_first_then_alphabetical() {
        let infos = vec![info("b.txt", false), info("a_dir", true), info("z.txt", false)];
        let tree = build_tree(&infos);
        let sorted: Vec<&str> = tree.sorted_children().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(sorted, vec!["a_dir", "b.txt", "z.txt"]);
    }
}
