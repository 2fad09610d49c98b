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

//! Extracts a single tagged artifact out of a raw LLM response.
//!
//! Precedence: the named primary tag, then a fenced ```` ```json ```` / ```` ```markdown ````
//! block, then the whole response. Every stage's post-processing goes through
//! [`extract_tagged`].

use codewiki_core::model::ClassifyType;

fn find_tag<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let lower = text.to_lowercase();
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = lower.find(&open)? + open.len();
    let end = lower[start..].find(&close)? + start;
    Some(text[start..end].trim())
}

fn find_fenced(text: &str, kind: &str) -> Option<&str> {
    let lower = text.to_lowercase();
    let marker = format!("```{kind}");
    let start = lower.find(&marker)? + marker.len();
    let rest = &text[start..];
    let rest_lower = &lower[start..];
    let end = rest_lower.find("```")?;
    Some(rest[..end].trim())
}

/// Applies the primary-tag → fenced-block → raw-text precedence described for every
/// structured artifact the pipeline's stages produce.
pub fn extract_tagged(text: &str, tag: &str) -> String {
    if let Some(found) = find_tag(text, tag) {
        return found.to_string();
    }
    for kind in ["json", "markdown"] {
        if let Some(found) = find_fenced(text, kind) {
            return found.to_string();
        }
    }
    text.trim().to_string()
}

/// Parses the `<classify>classifyName: X</classify>` tag, stripping the
/// `classifyName:` prefix and matching the result against the allow-list.
/// Returns `None` (treated as "no classification") on any mismatch.
pub fn extract_classify(text: &str) -> Option<ClassifyType> {
    let raw = find_tag(text, "classify")?;
    let stripped = raw
        .split_once(':')
        .map(|(prefix, value)| {
            if prefix.trim().eq_ignore_ascii_case("classifyname") {
                value
            } else {
                raw
            }
        })
        .unwrap_or(raw);
    ClassifyType::from_extracted(stripped.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_primary_tag() {
        let text = "noise <readme>## Hello</readme> trailer";
        assert_eq!(extract_tagged(text, "readme"), "## Hello");
    }

    #[test]
    fn falls_back_to_fenced_json_block() {
        let text = "some preamble\n```json\n{\"a\":1}\n```\ntrailer";
        assert_eq!(extract_tagged(text, "response_file"), "{\"a\":1}");
    }

    #[test]
    fn falls_back_to_raw_text() {
        let text = "  plain response  ";
        assert_eq!(extract_tagged(text, "blog"), "plain response");
    }

    #[test]
    fn classify_strips_prefix_and_matches_allow_list() {
        let text = "<classify>classifyName: Libraries</classify>";
        assert_eq!(extract_classify(text), Some(ClassifyType::Libraries));
    }

    #[test]
    fn classify_unknown_value_is_none() {
        let text = "<classify>classifyName: Spaceship</classify>";
        assert_eq!(extract_classify(text), None);
    }

    #[test]
    fn classify_missing_tag_is_none() {
        assert_eq!(extract_classify("no tag here"), None);
    }
}
