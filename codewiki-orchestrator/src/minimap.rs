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

//! Parses the mind-map Markdown the LLM returns into a [`MiniMapNode`] tree.
//!
//! Heading level (the run of leading `#`) drives nesting; a heading may encode a
//! source path as `"# Title: path/to/file"`, with the URL taken from after the last
//! `:` on the line. Each recursive call reports how many lines it consumed, so the
//! caller never has to re-scan for where a child subtree ended.

use codewiki_core::model::MiniMapNode;

fn header_level(line: &str) -> usize {
    line.chars().take_while(|&c| c == '#').count()
}

fn title_and_url(line: &str) -> (String, String) {
    let content = line.trim_start_matches('#').trim();
    match content.rsplit_once(':') {
        Some((title, url)) => (title.trim().to_string(), url.trim().to_string()),
        None => (content.to_string(), String::new()),
    }
}

/// Parses all sibling headings at `min_level` starting at `lines[start]`, returning
/// the parsed nodes and the index of the first line not consumed.
fn parse_siblings(lines: &[&str], start: usize, min_level: usize) -> (Vec<MiniMapNode>, usize) {
    let mut nodes = Vec::new();
    let mut i = start;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }

        let level = header_level(line);
        if level == 0 {
            i += 1;
            continue;
        }
        if level < min_level {
            break;
        }
        if level > min_level {
            // An orphaned deeper heading with no parent at this scope; skip it rather
            // than silently attaching it to the wrong parent.
            i += 1;
            continue;
        }

        let (title, url) = title_and_url(line);
        let (children, next) = parse_siblings(lines, i + 1, level + 1);
        nodes.push(MiniMapNode { title, url, nodes: children });
        i = next;
    }

    (nodes, i)
}

/// Parses a full mind-map document. The first top-level heading becomes the root;
/// any further top-level headings are folded in as its children, matching the
/// original generator's convention of treating the document as a single tree.
pub fn parse(text: &str) -> MiniMapNode {
    let lines: Vec<&str> = text.lines().collect();
    let (mut top, _) = parse_siblings(&lines, 0, 1);

    if top.is_empty() {
        return MiniMapNode { title: String::new(), url: String::new(), nodes: Vec::new() };
    }
    let root = top.remove(0);
    if top.is_empty() {
        root
    } else {
        MiniMapNode { title: root.title, url: root.url, nodes: [root.nodes, top].concat() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_headings() {
        let text = "\
# Project: README.md
## Core: src/core.rs
### Scanner: src/scanner.rs
## Storage: src/storage.rs
";
        let root = parse(text);
        assert_eq!(root.title, "Project");
        assert_eq!(root.url, "README.md");
        assert_eq!(root.nodes.len(), 2);
        assert_eq!(root.nodes[0].title, "Core");
        assert_eq!(root.nodes[0].nodes[0].title, "Scanner");
        assert_eq!(root.nodes[1].title, "Storage");
    }

    #[test]
    fn heading_without_colon_has_empty_url() {
        let text = "# Just A Title\n";
        let root = parse(text);
        assert_eq!(root.title, "Just A Title");
        assert_eq!(root.url, "");
    }

    #[test]
    fn url_takes_text_after_last_colon() {
        let text = "# Windows Path: C:/repo/src/main.rs\n";
        let root = parse(text);
        assert_eq!(root.title, "Windows Path: C");
        assert_eq!(root.url, "/repo/src/main.rs");
    }

    #[test]
    fn blank_lines_and_non_heading_lines_are_ignored() {
        let text = "\
intro text

# Root: a.rs

some prose here
## Child: b.rs
";
        let root = parse(text);
        assert_eq!(root.title, "Root");
        assert_eq!(root.nodes.len(), 1);
        assert_eq!(root.nodes[0].title, "Child");
    }

    #[test]
    fn empty_document_yields_empty_node() {
        let root = parse("");
        assert_eq!(root.title, "");
        assert!(root.nodes.is_empty());
    }
}
