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

//! Rust keeps `struct`/`enum`/`trait` bodies and attribute lines (`#[derive(...)]`)
//! intact, since those are the public shape, and collapses `fn` bodies via the baseline.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compressors::generic::compress_generic;
use crate::Compressor;

pub struct RustCompressor;

static TYPE_DEF_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(pub(\(\w+\))?\s+)?(struct|enum|trait)\s").unwrap());
static FN_SIGNATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?\))\s*(->\s*[^\{]+)?\{").unwrap());

impl Compressor for RustCompressor {
    fn compress(&self, content: &str) -> String {
        let mut out = Vec::new();
        let mut lines = content.lines().peekable();
        let mut brace_depth_in_type: i32 = 0;
        let mut in_type_block = false;

        while let Some(line) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with("///") || trimmed.starts_with("//!") || trimmed.starts_with("//")
                || trimmed.starts_with('#')
            {
                out.push(line.to_string());
                continue;
            }
            if in_type_block {
                out.push(line.to_string());
                brace_depth_in_type += trimmed.matches('{').count() as i32;
                brace_depth_in_type -= trimmed.matches('}').count() as i32;
                if brace_depth_in_type <= 0 {
                    in_type_block = false;
                }
                continue;
            }
            if TYPE_DEF_START.is_match(trimmed) {
                out.push(line.to_string());
                brace_depth_in_type = trimmed.matches('{').count() as i32
                    - trimmed.matches('}').count() as i32;
                if brace_depth_in_type > 0 {
                    in_type_block = true;
                }
                continue;
            }
            if let Some(caps) = FN_SIGNATURE.captures(trimmed) {
                let sig = caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed);
                out.push(format!("{sig} {{ }}"));
                continue;
            }
            let single_line = format!("{line}\n");
            out.push(compress_generic(&single_line));
        }

        out.into_iter().filter(|l| !l.trim().is_empty()).collect::<Vec<_>>().join("\n")
    }

    fn name(&self) -> &'static str {
        "rust"
    }
}
