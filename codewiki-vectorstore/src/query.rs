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

//! The backend-agnostic query model: conditions, match expressions, fusion and sort.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Term { field: String, value: Value },
    Terms { field: String, values: Vec<Value> },
    Exists { field: String },
    MustNotExists { field: String },
    And(Vec<Condition>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchTextExpr {
    pub fields: Vec<String>,
    pub text: String,
    pub topn: u32,
    #[serde(default)]
    pub minimum_should_match: Option<String>,
    /// Overridden by `FusionExpr` when paired with a dense match: `1 - dense_weight`.
    #[serde(default)]
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistanceType {
    Cosine,
    L2,
    Dot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDenseExpr {
    pub column: String,
    pub vector: Vec<f32>,
    pub distance_type: DistanceType,
    pub topn: u32,
    #[serde(default)]
    pub similarity: Option<f64>,
}

/// Reserved: passed through to the backend verbatim when it understands the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSparseExpr {
    pub column: String,
    pub values: HashMap<String, f64>,
    pub topn: u32,
}

/// Reserved: passed through to the backend verbatim when it understands the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchTensorExpr {
    pub column: String,
    pub tensor: Value,
    pub topn: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionParams {
    /// Comma-separated weights, one per match expr in request order, e.g. "0.3,0.7".
    pub weights: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionExpr {
    pub method: String,
    pub topn: u32,
    pub fusion_params: FusionParams,
}

impl FusionExpr {
    pub fn weights(&self) -> Vec<f64> {
        self.fusion_params
            .weights
            .split(',')
            .filter_map(|w| w.trim().parse::<f64>().ok())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Min,
    Max,
    Avg,
    Sum,
    Median,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
    #[serde(default)]
    pub mode: Option<SortMode>,
    #[serde(default)]
    pub unmapped_type: Option<String>,
    #[serde(default)]
    pub numeric_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchExprs {
    #[serde(default)]
    pub text: Option<MatchTextExpr>,
    #[serde(default)]
    pub dense: Option<MatchDenseExpr>,
    #[serde(default)]
    pub sparse: Option<MatchSparseExpr>,
    #[serde(default)]
    pub tensor: Option<MatchTensorExpr>,
    #[serde(default)]
    pub fusion: Option<FusionExpr>,
}

impl MatchExprs {
    /// When a text match and a dense match are both present alongside a fusion
    /// expression, the text clause's boost is fixed at `1 - dense_weight`.
    pub fn resolve_text_boost(&self) -> Option<f64> {
        let (text, dense, fusion) = (self.text.as_ref()?, self.dense.as_ref(), self.fusion.as_ref()?);
        dense?;
        let weights = fusion.weights();
        let dense_weight = *weights.get(1)?;
        let _ = text;
        Some(1.0 - dense_weight)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub select_fields: Vec<String>,
    #[serde(default)]
    pub highlight_fields: Vec<String>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub match_exprs: MatchExprs,
    #[serde(default)]
    pub order_by: Vec<SortField>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub agg_fields: Vec<String>,
    #[serde(default)]
    pub rank_feature: Option<String>,
}

fn default_limit() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fusion_text_boost_is_one_minus_dense_weight() {
        let exprs = MatchExprs {
            text: Some(MatchTextExpr { fields: vec!["title_tks".into()], text: "alpha".into(), topn: 10, minimum_should_match: None, boost: None }),
            dense: Some(MatchDenseExpr { column: "embedding".into(), vector: vec![1.0, 0.0], distance_type: DistanceType::Cosine, topn: 10, similarity: None }),
            sparse: None,
            tensor: None,
            fusion: Some(FusionExpr { method: "weighted_sum".into(), topn: 10, fusion_params: FusionParams { weights: "0.3,0.7".into() } }),
        };
        assert_eq!(exprs.resolve_text_boost(), Some(1.0 - 0.7));
    }
}
