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

//! Rewrites the `field_tks = 'value'` / `field_tks like 'value'` shorthand some
//! callers use for tokenized-field equality into a backend `MATCH` clause before
//! the statement is submitted to the SQL surface.

use once_cell::sync::Lazy;
use regex::Regex;

static EQ_TKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\w+_tks)\s*=\s*'([^']*)'").unwrap());
static LIKE_TKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\w+_tks)\s+like\s+'([^']*)'").unwrap());

pub fn tokenize_default(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rewrites `field_tks = 'value'` and `field_tks like 'value'` fragments into
/// `MATCH(field, 'tokenized', 'operator=OR;minimum_should_match=30%')`.
pub fn rewrite_tks_predicates(sql: &str, tokenize: impl Fn(&str) -> String) -> String {
    let rewritten = EQ_TKS.replace_all(sql, |caps: &regex::Captures| {
        let field = &caps[1];
        let tokenized = tokenize(&caps[2]);
        format!("MATCH({field}, '{tokenized}', 'operator=OR;minimum_should_match=30%')")
    });
    LIKE_TKS
        .replace_all(&rewritten, |caps: &regex::Captures| {
            let field = &caps[1];
            let tokenized = tokenize(&caps[2]);
            format!("MATCH({field}, '{tokenized}', 'operator=OR;minimum_should_match=30%')")
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_equality_predicate() {
        let sql = "select * from t where title_tks = 'hello world'";
        let out = rewrite_tks_predicates(sql, tokenize_default);
        assert_eq!(out, "select * from t where MATCH(title_tks, 'hello world', 'operator=OR;minimum_should_match=30%')");
    }

    #[test]
    fn rewrites_like_predicate() {
        let sql = "select * from t where body_tks like 'needle'";
        let out = rewrite_tks_predicates(sql, tokenize_default);
        assert_eq!(out, "select * from t where MATCH(body_tks, 'needle', 'operator=OR;minimum_should_match=30%')");
    }

    #[test]
    fn leaves_unrelated_predicates_untouched() {
        let sql = "select * from t where id = '1'";
        assert_eq!(rewrite_tks_predicates(sql, tokenize_default), sql);
    }
}
