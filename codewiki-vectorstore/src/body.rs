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

//! Builds the JSON request body for a [`SearchRequest`] against either backend.
//! The two backends only disagree on where the KNN clause lives.

use crate::query::{Condition, DistanceType, MatchExprs, SearchRequest, SortOrder};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnnStyle {
    /// ES 8.x: `knn` is a sibling of `query` on the search request.
    TopLevelKnn,
    /// OS 2.x: when KNN is required, `query` itself becomes `{"knn": {...}}`.
    QueryKnn,
}

fn condition_to_query(condition: &Condition) -> Value {
    match condition {
        Condition::Term { field, value } => json!({ "term": { field: value } }),
        Condition::Terms { field, values } => json!({ "terms": { field: values } }),
        Condition::Exists { field } => json!({ "exists": { "field": field } }),
        Condition::MustNotExists { field } => json!({ "bool": { "must_not": [{ "exists": { "field": field } }] } }),
        Condition::And(conditions) => {
            let clauses: Vec<Value> = conditions.iter().map(condition_to_query).collect();
            json!({ "bool": { "must": clauses } })
        }
    }
}

fn text_clause(request: &SearchRequest) -> Option<Value> {
    let text = request.match_exprs.text.as_ref()?;
    let boost = request.match_exprs.resolve_text_boost().or(text.boost).unwrap_or(1.0);
    let mut multi_match = json!({
        "multi_match": {
            "query": text.text,
            "fields": text.fields,
            "boost": boost,
        }
    });
    if let Some(mm) = &text.minimum_should_match {
        multi_match["multi_match"]["minimum_should_match"] = json!(mm);
    }
    Some(multi_match)
}

fn knn_clause(request: &SearchRequest) -> Option<Value> {
    let dense = request.match_exprs.dense.as_ref()?;
    let similarity = dense.distance_type;
    Some(json!({
        "field": dense.column,
        "query_vector": dense.vector,
        "k": dense.topn,
        "num_candidates": dense.topn.max(50),
        "similarity": dense.similarity,
        "distance_type": match similarity {
            DistanceType::Cosine => "cosine",
            DistanceType::L2 => "l2_norm",
            DistanceType::Dot => "dot_product",
        },
    }))
}

pub fn build_search_body(request: &SearchRequest, style: KnnStyle) -> Value {
    let mut body = json!({
        "from": request.offset,
        "size": request.limit,
    });

    if !request.select_fields.is_empty() {
        body["_source"] = json!(request.select_fields);
    }

    let base_query = request
        .condition
        .as_ref()
        .map(condition_to_query)
        .unwrap_or_else(|| json!({ "match_all": {} }));

    let text = text_clause(request);
    let knn = knn_clause(request);

    match (style, &knn) {
        (KnnStyle::QueryKnn, Some(knn_body)) => {
            body["query"] = json!({ "knn": knn_body });
            if let Some(text_query) = text {
                body["query"] = json!({
                    "bool": { "should": [text_query, { "knn": knn_body }] }
                });
            }
        }
        (KnnStyle::TopLevelKnn, Some(knn_body)) => {
            body["knn"] = knn_body.clone();
            body["query"] = match text {
                Some(text_query) => json!({ "bool": { "must": [base_query], "should": [text_query] } }),
                None => base_query,
            };
        }
        (_, None) => {
            body["query"] = match text {
                Some(text_query) => json!({ "bool": { "must": [base_query], "should": [text_query] } }),
                None => base_query,
            };
        }
    }

    if !request.highlight_fields.is_empty() {
        let fields: serde_json::Map<String, Value> =
            request.highlight_fields.iter().map(|f| (f.clone(), json!({}))).collect();
        body["highlight"] = json!({ "fields": fields });
    }

    if !request.order_by.is_empty() {
        let sorts: Vec<Value> = request
            .order_by
            .iter()
            .map(|s| {
                let mut entry = json!({ "order": match s.order { SortOrder::Asc => "asc", SortOrder::Desc => "desc" } });
                if let Some(mode) = s.mode {
                    entry["mode"] = json!(format!("{mode:?}").to_lowercase());
                }
                if let Some(unmapped) = &s.unmapped_type {
                    entry["unmapped_type"] = json!(unmapped);
                }
                json!({ s.field.clone(): entry })
            })
            .collect();
        body["sort"] = json!(sorts);
    }

    if !request.agg_fields.is_empty() {
        let aggs: serde_json::Map<String, Value> = request
            .agg_fields
            .iter()
            .map(|f| (f.clone(), json!({ "terms": { "field": f } })))
            .collect();
        body["aggs"] = json!(aggs);
    }

    ensure_no_fusion_noop(request, &mut body);
    body
}

fn ensure_no_fusion_noop(_request: &SearchRequest, _body: &mut Value) {
    // Fusion weighting is folded into the text clause's boost by `resolve_text_boost`;
    // nothing further needs to be emitted once that boost is set.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FusionExpr, FusionParams, MatchDenseExpr, MatchTextExpr};

    #[test]
    fn builds_match_all_by_default() {
        let request = SearchRequest::default();
        let body = build_search_body(&request, KnnStyle::TopLevelKnn);
        assert_eq!(body["query"], json!({ "match_all": {} }));
    }

    #[test]
    fn applies_fusion_boost_to_text_clause() {
        let request = SearchRequest {
            match_exprs: MatchExprs {
                text: Some(MatchTextExpr { fields: vec!["title_tks".into()], text: "alpha".into(), topn: 10, minimum_should_match: None, boost: None }),
                dense: Some(MatchDenseExpr { column: "embedding".into(), vector: vec![1.0, 0.0], distance_type: DistanceType::Cosine, topn: 10, similarity: None }),
                sparse: None,
                tensor: None,
                fusion: Some(FusionExpr { method: "weighted_sum".into(), topn: 10, fusion_params: FusionParams { weights: "0.3,0.7".into() } }),
            },
            ..Default::default()
        };
        let body = build_search_body(&request, KnnStyle::TopLevelKnn);
        let boost = body["query"]["bool"]["should"][0]["multi_match"]["boost"].as_f64().unwrap();
        assert!((boost - 0.3).abs() < 1e-9);
    }

    #[test]
    fn opensearch_style_replaces_query_with_knn() {
        let request = SearchRequest {
            match_exprs: MatchExprs {
                dense: Some(MatchDenseExpr { column: "embedding".into(), vector: vec![1.0, 0.0], distance_type: DistanceType::Cosine, topn: 10, similarity: None }),
                ..Default::default()
            },
            ..Default::default()
        };
        let body = build_search_body(&request, KnnStyle::QueryKnn);
        assert!(body["query"]["knn"].is_object());
    }
}
