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

//! Per-task document context: collects the files and issues a native function
//! referenced while a single pipeline execution ran, so the persistence layer can
//! populate `ContentSource` rows and change-log references afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GitIssue {
    pub title: String,
    pub url: String,
    pub content: String,
    pub author: Option<String>,
    pub html_url: String,
    pub state: String,
    pub number: u64,
    pub created_at: String,
}

#[derive(Debug, Default)]
struct ContextInner {
    files: Vec<String>,
    git_issues: Vec<GitIssue>,
    metadata: HashMap<String, serde_json::Value>,
}

/// A mutable, shareable document context scoped to one pipeline run. Not
/// task-local storage (stable Rust has none built in) — the orchestrator owns one
/// instance per run and threads it through stage calls and native functions explicitly.
#[derive(Default)]
pub struct DocumentContext {
    inner: Mutex<ContextInner>,
}

impl DocumentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_file(&self, path: impl Into<String>) {
        let path = path.into();
        let mut inner = self.inner.lock().unwrap();
        if !inner.files.contains(&path) {
            inner.files.push(path);
        }
    }

    pub fn record_issue(&self, issue: GitIssue) {
        self.inner.lock().unwrap().git_issues.push(issue);
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: serde_json::Value) {
        self.inner.lock().unwrap().metadata.insert(key.into(), value);
    }

    pub fn files(&self) -> Vec<String> {
        self.inner.lock().unwrap().files.clone()
    }

    pub fn git_issues(&self) -> Vec<GitIssue> {
        self.inner.lock().unwrap().git_issues.clone()
    }

    pub fn metadata(&self) -> HashMap<String, serde_json::Value> {
        self.inner.lock().unwrap().metadata.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupes_recorded_files() {
        let ctx = DocumentContext::new();
        ctx.record_file("src/main.rs");
        ctx.record_file("src/main.rs");
        assert_eq!(ctx.files().len(), 1);
    }

    #[test]
    fn collects_issues() {
        let ctx = DocumentContext::new();
        ctx.record_issue(GitIssue {
            title: "bug".to_string(),
            number: 1,
            ..Default::default()
        });
        assert_eq!(ctx.git_issues().len(), 1);
    }
}
