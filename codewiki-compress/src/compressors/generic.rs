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

//! The baseline compressor every per-language compressor specializes: preserve
//! comments verbatim, normalize structural lines to their signature, collapse
//! everything else to a declaration.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::Compressor;

pub struct GenericCompressor;

impl Compressor for GenericCompressor {
    fn compress(&self, content: &str) -> String {
        compress_generic(content)
    }

    fn name(&self) -> &'static str {
        "generic"
    }
}

static STRUCTURAL_PREFIXES: &[&str] = &[
    "class ", "interface ", "enum ", "struct ", "namespace ", "import ", "using ",
    "include ", "require ", "from ", "package ",
    "public ", "private ", "protected ", "internal ", "static ", "final ", "abstract ",
    "override ", "virtual ", "extern ", "const ",
    "function ", "def ", "func ", "sub ", "proc ", "method ", "procedure ", "fn ",
    "fun ", "async ", "await ", "export ",
    "var ", "let ", "dim ", "int ", "string ", "bool ", "float ", "double ", "void ",
    "auto ", "val ", "char ",
];

static FUNCTION_SIGNATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?\([^)]*\))").unwrap());
static ASSIGNMENT_LHS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)=").unwrap());
static CALL_SITE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+\s*)\([^)]*\)").unwrap());

fn is_structural_line(trimmed: &str) -> bool {
    if STRUCTURAL_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return true;
    }
    if trimmed.starts_with('@') || trimmed.starts_with('[') || trimmed.starts_with('#') {
        return true;
    }
    if trimmed.starts_with("<") {
        return true;
    }
    matches!(trimmed, "{" | "}" | "(" | ")" | "[" | "]")
        || trimmed
            .chars()
            .next()
            .map(|c| c.is_alphabetic() || c == '_')
            .unwrap_or(false)
            && trimmed.contains('(')
}

fn normalize_structural_line(line: &str) -> String {
    if let Some(caps) = FUNCTION_SIGNATURE.captures(line) {
        if let Some(sig) = caps.get(1) {
            return format!("{} {{ }}", sig.as_str());
        }
    }
    if let Some(caps) = ASSIGNMENT_LHS.captures(line) {
        if !line.contains("==") && !line.contains("!=") && !line.contains("<=") && !line.contains(">=") {
            if let Some(lhs) = caps.get(1) {
                return format!("{};", lhs.as_str().trim_end());
            }
        }
    }
    line.to_string()
}

fn normalize_implementation_line(line: &str) -> String {
    if line.contains('=')
        && !line.contains("==")
        && !line.contains("!=")
        && !line.contains("<=")
        && !line.contains(">=")
    {
        if let Some(idx) = line.find('=') {
            return format!("{};", line[..idx].trim_end());
        }
    }
    if CALL_SITE.is_match(line) {
        return CALL_SITE.replace_all(line, "$1();").to_string();
    }
    line.to_string()
}

pub fn compress_generic(content: &str) -> String {
    let mut out = Vec::new();
    let mut in_multi_line_comment = false;

    for raw_line in content.lines() {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if in_multi_line_comment {
            out.push(raw_line.to_string());
            if trimmed.contains("*/") {
                in_multi_line_comment = false;
            }
            continue;
        }

        if trimmed.starts_with("/*") {
            out.push(raw_line.to_string());
            if !trimmed.contains("*/") {
                in_multi_line_comment = true;
            }
            continue;
        }

        if trimmed.starts_with("//")
            || trimmed.starts_with('#')
            || trimmed.starts_with('*')
            || trimmed.starts_with("'''")
            || trimmed.starts_with("\"\"\"")
        {
            out.push(raw_line.to_string());
            continue;
        }

        let normalized = if is_structural_line(trimmed) {
            normalize_structural_line(trimmed)
        } else {
            normalize_implementation_line(trimmed)
        };

        if !normalized.trim().is_empty() {
            out.push(normalized);
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_comments_verbatim() {
        let src = "// a comment\nlet x = compute_something(a, b);\n";
        let compressed = compress_generic(src);
        assert!(compressed.contains("// a comment"));
    }

    #[test]
    fn collapses_function_signature() {
        let src = "function doWork(a, b) {\n    return a + b;\n}\n";
        let compressed = compress_generic(src);
        assert!(compressed.contains("function doWork(a, b) { }"));
    }

    #[test]
    fn strips_call_site_arguments() {
        let src = "doSomething(1, 2, 3);\n";
        let compressed = compress_generic(src);
        assert!(compressed.contains("doSomething();"));
    }

    #[test]
    fn drops_blank_lines() {
        let src = "\n\nlet a = 1;\n\n";
        let compressed = compress_generic(src);
        assert_eq!(compressed.lines().count(), 1);
    }
}
