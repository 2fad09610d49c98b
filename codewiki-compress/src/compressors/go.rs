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

//! Go specializes the baseline by keeping `type ... struct {` and `type ... interface {`
//! bodies intact (their fields are the API surface, not implementation) while still
//! collapsing function bodies.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compressors::generic::compress_generic;
use crate::Compressor;

pub struct GoCompressor;

static TYPE_BLOCK_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^type\s+\w+\s+(struct|interface)\s*\{").unwrap());

impl Compressor for GoCompressor {
    fn compress(&self, content: &str) -> String {
        let mut out = Vec::new();
        let mut lines = content.lines().peekable();
        let mut in_type_block = false;

        while let Some(line) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if in_type_block {
                out.push(line.to_string());
                if trimmed == "}" {
                    in_type_block = false;
                }
                continue;
            }
            if TYPE_BLOCK_START.is_match(trimmed) {
                out.push(line.to_string());
                in_type_block = true;
                continue;
            }
            let single_line = format!("{line}\n");
            out.push(compress_generic(&single_line));
        }

        out.into_iter().filter(|l| !l.trim().is_empty()).collect::<Vec<_>>().join("\n")
    }

    fn name(&self) -> &'static str {
        "go"
    }
}
