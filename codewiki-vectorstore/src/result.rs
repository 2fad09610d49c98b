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

//! Extraction helpers over the raw ES/OS-shaped search response: both backends
//! return the same `hits.hits[]` envelope, so one set of helpers serves both.

use serde_json::Value;

pub fn get_total(raw: &Value) -> u64 {
    raw.pointer("/hits/total/value").and_then(Value::as_u64).unwrap_or(0)
}

pub fn get_chunk_ids(raw: &Value) -> Vec<String> {
    raw.pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().filter_map(|h| h.get("_id").and_then(Value::as_str).map(str::to_string)).collect())
        .unwrap_or_default()
}

pub fn get_fields(raw: &Value, id: &str) -> Option<Value> {
    raw.pointer("/hits/hits")?.as_array()?.iter().find(|h| h.get("_id").and_then(Value::as_str) == Some(id))?.get("_source").cloned()
}

pub fn get_source(raw: &Value) -> Vec<Value> {
    raw.pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().filter_map(|h| h.get("_source").cloned()).collect())
        .unwrap_or_default()
}

pub fn get_aggregation(raw: &Value, name: &str) -> Option<Value> {
    raw.pointer(&format!("/aggregations/{name}")).cloned()
}

/// Splits on sentence-ending punctuation followed by whitespace or end of string;
/// adequate for English prose, which is the only case the backend's own highlighter
/// sometimes fails to produce snippets for.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'!' | b'?') {
            let next_is_boundary = bytes.get(i + 1).map(|c| c.is_ascii_whitespace()).unwrap_or(true);
            if next_is_boundary {
                sentences.push(text[start..=i].trim());
                start = i + 1;
            }
        }
    }
    if start < text.len() {
        let rest = text[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest);
        }
    }
    sentences.into_iter().filter(|s| !s.is_empty()).collect()
}

/// Returns the backend's own highlight snippets for `id`/`field` when present;
/// otherwise falls back to sentence-splitting the source field and wrapping
/// sentences containing a keyword in `<em>`.
pub fn get_highlight(raw: &Value, id: &str, field: &str, keywords: &[&str]) -> Vec<String> {
    if let Some(hit) = raw.pointer("/hits/hits").and_then(Value::as_array).and_then(|hits| hits.iter().find(|h| h.get("_id").and_then(Value::as_str) == Some(id))) {
        if let Some(snippets) = hit.pointer(&format!("/highlight/{field}")).and_then(Value::as_array) {
            let snippets: Vec<String> = snippets.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
            if !snippets.is_empty() {
                return snippets;
            }
        }
        if let Some(text) = hit.pointer(&format!("/_source/{field}")).and_then(Value::as_str) {
            return split_sentences(text)
                .into_iter()
                .filter(|sentence| {
                    let lower = sentence.to_lowercase();
                    keywords.iter().any(|kw| lower.contains(&kw.to_lowercase()))
                })
                .map(|sentence| wrap_keywords(sentence, keywords))
                .collect();
        }
    }
    Vec::new()
}

fn wrap_keywords(sentence: &str, keywords: &[&str]) -> String {
    let mut out = sentence.to_string();
    for keyword in keywords {
        if keyword.is_empty() {
            continue;
        }
        let replaced = out.replace(keyword, &format!("<em>{keyword}</em>"));
        out = replaced;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "hits": {
                "total": {"value": 1},
                "hits": [{
                    "_id": "doc-1",
                    "_source": {"body": "The quick fox jumps. It is fast. Other sentence here."},
                }]
            },
            "aggregations": {"by_lang": {"buckets": []}}
        })
    }

    #[test]
    fn extracts_total_and_ids() {
        let raw = sample();
        assert_eq!(get_total(&raw), 1);
        assert_eq!(get_chunk_ids(&raw), vec!["doc-1".to_string()]);
    }

    #[test]
    fn falls_back_to_sentence_split_highlight() {
        let raw = sample();
        let highlights = get_highlight(&raw, "doc-1", "body", &["fast"]);
        assert_eq!(highlights, vec!["It is <em>fast</em>.".to_string()]);
    }

    #[test]
    fn extracts_aggregation_by_name() {
        let raw = sample();
        assert!(get_aggregation(&raw, "by_lang").is_some());
        assert!(get_aggregation(&raw, "missing").is_none());
    }
}
