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

//! Per-language structural compressors.
//!
//! A compressor strips implementation bodies from a source file while keeping its
//! structural skeleton (declarations, signatures, comments) intact, so the LLM sees a
//! file's shape without burning its context budget on logic. Every per-language
//! compressor specializes the same baseline algorithm implemented by
//! [`compressors::generic::GenericCompressor`]: preserve comments verbatim, detect
//! "structural" lines (class/function/import/visibility-keyword prefixes) and normalize
//! them to a signature-only form, and collapse everything else to its declaration only.

pub mod compressors;
pub mod registry;

pub use registry::CompressorRegistry;

/// A language-specific source compressor.
pub trait Compressor: Send + Sync {
    fn compress(&self, content: &str) -> String;
    fn name(&self) -> &'static str;
}

/// Detects a language from a file extension, returning the registry key used to look up
/// its compressor (and, for languages without a dedicated compressor, the fallback
/// `"generic"` key).
pub fn language_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "css" | "scss" | "less" => "css",
        "go" => "go",
        "html" | "htm" => "html",
        "java" => "java",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "javascript",
        "json" => "generic",
        "md" | "markdown" => "markdown",
        "php" => "php",
        "py" | "pyi" => "python",
        "rb" => "ruby",
        "rs" => "rust",
        "sh" | "bash" | "zsh" => "shell",
        "sql" => "sql",
        "swift" => "swift",
        "xml" | "xsd" | "xsl" => "xml",
        "yml" | "yaml" => "yaml",
        _ => "generic",
    }
}
