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

//! The four FileTree encodings: compact, json, pathlist and unix.

use crate::tree::{FileTreeNode, NodeType};
use serde_json::Value;

/// Indented `name/` (directories) / `name` (files) listing, tagged with `D`/`F`.
pub fn to_compact_string(node: &FileTreeNode) -> String {
    let mut lines = vec!["/".to_string()];
    render_compact(node, 0, &mut lines);
    lines.join("\n")
}

fn render_compact(node: &FileTreeNode, indent: usize, lines: &mut Vec<String>) {
    for child in node.sorted_children() {
        let marker = if child.is_file() { "F" } else { "D" };
        lines.push(format!("{}{}/{}", "  ".repeat(indent), child.name, marker));
        if child.is_directory() {
            render_compact(child, indent + 1, lines);
        }
    }
}

/// Compact, no-whitespace JSON: a file node serializes as the string `"F"`; a
/// directory serializes as an object mapping each child name to its own serialization.
/// The tree's own (unnamed) root is unwrapped — only its children are emitted.
pub fn to_compact_json(node: &FileTreeNode) -> String {
    let value = serialize_compact(node);
    serde_json::to_string(&value).unwrap_or_default()
}

fn serialize_compact(node: &FileTreeNode) -> Value {
    let mut map = serde_json::Map::new();
    for child in node.sorted_children() {
        let value = match child.node_type {
            NodeType::File => Value::String("F".to_string()),
            NodeType::Directory => serialize_compact(child),
        };
        map.insert(child.name.clone(), value);
    }
    Value::Object(map)
}

/// Flat list of file paths, one per line. A directory holding exactly one child is
/// collapsed into that child's own path(s) without emitting the directory's own line —
/// this is the single-child collapse the pipeline's scanner has always performed.
pub fn to_path_list(node: &FileTreeNode) -> String {
    let mut lines = Vec::new();
    collect_path_list(node, "", &mut lines);
    lines.join("\n")
}

fn collect_path_list(node: &FileTreeNode, current_path: &str, out: &mut Vec<String>) {
    for child in node.sorted_children() {
        let child_path = if current_path.is_empty() {
            child.name.clone()
        } else {
            format!("{current_path}/{}", child.name)
        };
        match child.node_type {
            NodeType::File => out.push(child_path),
            NodeType::Directory => {
                if child.children.len() == 1 {
                    collect_path_list(child, &child_path, out);
                } else {
                    out.push(format!("{child_path}/"));
                    collect_path_list(child, &child_path, out);
                }
            }
        }
    }
}

/// Unix `tree`-style rendering with box-drawing connectors.
pub fn to_unix_tree(node: &FileTreeNode) -> String {
    let mut lines = vec![".".to_string()];
    render_unix(node, "", &mut lines);
    lines.join("\n")
}

fn render_unix(node: &FileTreeNode, prefix: &str, lines: &mut Vec<String>) {
    let children = node.sorted_children();
    let count = children.len();
    for (idx, child) in children.into_iter().enumerate() {
        let is_last = idx == count - 1;
        let connector = if is_last { "└── " } else { "├── " };
        let suffix = if child.is_directory() { "/" } else { "" };
        lines.push(format!("{prefix}{connector}{}{suffix}", child.name));
        if child.is_directory() {
            let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            render_unix(child, &child_prefix, lines);
        }
    }
}

/// Dispatches by format name; unknown formats fall back to `compact`.
pub fn encode(node: &FileTreeNode, format: &str) -> String {
    match format {
        "json" => to_compact_json(node),
        "pathlist" => to_path_list(node),
        "unix" => to_unix_tree(node),
        _ => to_compact_string(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{build_tree, PathInfo};

    fn infos() -> Vec<PathInfo> {
        vec![
            PathInfo { path: "src".into(), name: "src".into(), is_directory: true, size: 0 },
            PathInfo { path: "src/main.rs".into(), name: "main.rs".into(), is_directory: false, size: 0 },
            PathInfo { path: "docs".into(), name: "docs".into(), is_directory: true, size: 0 },
            PathInfo { path: "docs/guide.md".into(), name: "guide.md".into(), is_directory: false, size: 0 },
            PathInfo { path: "README.md".into(), name: "README.md".into(), is_directory: false, size: 0 },
        ]
    }

    #[test]
    fn compact_json_unwraps_root() {
        let tree = build_tree(&infos());
        let json = to_compact_json(&tree);
        let value: Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("src").is_some());
        assert_eq!(value["src"]["main.rs"], Value::String("F".to_string()));
    }

    #[test]
    fn path_list_collapses_single_child_dirs() {
        let tree = build_tree(&infos());
        let list = to_path_list(&tree);
        // `src` and `docs` each have exactly one child, so their own directory line is
        // collapsed away and only the leaf path appears.
        assert!(list.contains("src/main.rs"));
        assert!(!list.contains("src/\n"));
    }

    #[test]
    fn unix_tree_uses_box_drawing_connectors() {
        let tree = build_tree(&infos());
        let rendered = to_unix_tree(&tree);
        assert!(rendered.starts_with('.'));
        assert!(rendered.contains("└── ") || rendered.contains("├── "));
    }

    #[test]
    fn compact_string_sorts_directories_before_files() {
        let tree = build_tree(&infos());
        let rendered = to_compact_string(&tree);
        let lines: Vec<&str> = rendered.lines().collect();
        // docs, src (dirs, alphabetical) before README.md (file)
        let docs_idx = lines.iter().position(|l| l.contains("docs/D")).unwrap();
        let readme_idx = lines.iter().position(|l| l.contains("README.md/F")).unwrap();
        assert!(docs_idx < readme_idx);
    }
}
