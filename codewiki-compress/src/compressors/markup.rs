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

//! Markdown, HTML and XML carry their structure in the markup itself, not in
//! statements — headers, tags and front matter are kept verbatim; only blank-line runs
//! are collapsed, since there is no "implementation body" to strip.

use crate::Compressor;

pub struct MarkupCompressor;

impl Compressor for MarkupCompressor {
    fn compress(&self, content: &str) -> String {
        let mut out = Vec::new();
        let mut last_was_blank = false;
        for raw_line in content.lines() {
            let is_blank = raw_line.trim().is_empty();
            if is_blank && last_was_blank {
                continue;
            }
            out.push(raw_line.to_string());
            last_was_blank = is_blank;
        }
        out.join("\n")
    }

    fn name(&self) -> &'static str {
        "markup"
    }
}
