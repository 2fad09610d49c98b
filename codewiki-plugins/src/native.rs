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

//! Native function plugins: the small, fixed set of tools the kernel exposes to the
//! LLM directly, as opposed to semantic functions loaded from prompt directories.

use crate::context::{DocumentContext, GitIssue};
use crate::error::{PluginError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[async_trait]
pub trait NativeFunction: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// JSON Schema for this function's arguments, advertised to the model alongside
    /// `name`/`description` when tool-calling is enabled. The default accepts any
    /// object; override for a function whose arguments benefit from a tighter schema.
    fn parameters(&self) -> Value {
        json!({"type": "object"})
    }

    async fn invoke(&self, args: Value, context: &DocumentContext) -> Result<Value>;
}

/// Reads, lists and searches files rooted at a fixed working directory; any path
/// that would resolve outside that directory is rejected.
pub struct FileFunction {
    working_dir: PathBuf,
}

impl FileFunction {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self { working_dir: working_dir.into() }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let candidate = self.working_dir.join(relative);
        let canonical_root = self.working_dir.canonicalize().unwrap_or_else(|_| self.working_dir.clone());
        let canonical = candidate
            .canonicalize()
            .map_err(|_| PluginError::PathEscape(relative.to_string()))?;
        if !canonical.starts_with(&canonical_root) {
            return Err(PluginError::PathEscape(relative.to_string()));
        }
        Ok(canonical)
    }

    pub fn read_file(&self, relative: &str, context: &DocumentContext) -> Result<String> {
        let path = self.resolve(relative)?;
        let content = std::fs::read_to_string(&path)?;
        context.record_file(relative);
        Ok(content)
    }

    pub fn list_files(&self, relative: &str) -> Result<Vec<String>> {
        let path = self.resolve(relative)?;
        let mut out = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            out.push(entry.file_name().to_string_lossy().into_owned());
        }
        out.sort();
        Ok(out)
    }

    pub fn search_files(&self, needle: &str) -> Result<Vec<String>> {
        let mut matches = Vec::new();
        search_dir(&self.working_dir, &self.working_dir, needle, &mut matches)?;
        matches.sort();
        Ok(matches)
    }
}

fn search_dir(root: &Path, dir: &Path, needle: &str, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            search_dir(root, &path, needle, out)?;
            continue;
        }
        let Ok(content) = std::fs::read_to_string(&path) else { continue };
        if content.contains(needle) {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl NativeFunction for FileFunction {
    fn name(&self) -> &'static str {
        "file"
    }
    fn description(&self) -> &'static str {
        "Read, list, and search files under the repository working directory"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "op": {"type": "string", "enum": ["read", "list", "search"], "description": "Which operation to perform"},
                "path": {"type": "string", "description": "File path (read/list) or search needle (search)"},
            },
            "required": ["op", "path"],
        })
    }

    async fn invoke(&self, args: Value, context: &DocumentContext) -> Result<Value> {
        let op = args.get("op").and_then(Value::as_str).unwrap_or("read");
        let path = args.get("path").and_then(Value::as_str).unwrap_or("");
        match op {
            "read" => Ok(json!({ "content": self.read_file(path, context)? })),
            "list" => Ok(json!({ "entries": self.list_files(path)? })),
            "search" => Ok(json!({ "matches": self.search_files(path)? })),
            other => Err(PluginError::NotFound(other.to_string())),
        }
    }
}

/// Forwards to an optional external memory/retrieval service; returns a
/// "not enabled" payload (not an error) when no such service is configured.
pub struct RagFunction {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl RagFunction {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url, api_key }
    }

    pub async fn rag_search(&self, query: &str, limit: u32, min_relevance: f64) -> Result<Value> {
        let Some(base_url) = &self.base_url else {
            return Ok(json!({ "results": [], "error": "rag not enabled" }));
        };
        let mut request = self
            .client
            .get(format!("{base_url}/search"))
            .query(&[("q", query), ("limit", &limit.to_string()), ("min_relevance", &min_relevance.to_string())]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| PluginError::Upstream(e.to_string()))?;
        let body: Value = response.json().await.map_err(|e| PluginError::Upstream(e.to_string()))?;
        Ok(json!({ "results": body }))
    }
}

#[async_trait]
impl NativeFunction for RagFunction {
    fn name(&self) -> &'static str {
        "rag_search"
    }
    fn description(&self) -> &'static str {
        "Search an external memory service for relevant prior context"
    }

    async fn invoke(&self, args: Value, _context: &DocumentContext) -> Result<Value> {
        let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(5) as u32;
        let min_relevance = args.get("min_relevance").and_then(Value::as_f64).unwrap_or(0.3);
        self.rag_search(query, limit, min_relevance).await
    }
}

enum IssueProvider {
    Github,
    Gitee,
}

impl IssueProvider {
    fn api_base(&self, repo: &str) -> String {
        match self {
            IssueProvider::Github => format!("https://api.github.com/repos/{repo}/issues"),
            IssueProvider::Gitee => format!("https://gitee.com/api/v5/repos/{repo}/issues"),
        }
    }
}

/// Shared implementation for GitHub and Gitee issue search; the two differ only in
/// API base URL and auth header scheme.
struct IssueSearchFunction {
    provider: IssueProvider,
    client: reqwest::Client,
    repo: String,
    token: Option<String>,
}

impl IssueSearchFunction {
    async fn search_issues(&self, query: &str, max_results: u32, context: &DocumentContext) -> Result<Value> {
        let url = self.provider.api_base(&self.repo);
        let mut request = self.client.get(&url).query(&[("q", query), ("per_page", &max_results.to_string())]);
        request = match (&self.provider, &self.token) {
            (IssueProvider::Github, Some(token)) => request.bearer_auth(token),
            (IssueProvider::Gitee, Some(token)) => request.query(&[("access_token", token)]),
            _ => request,
        };
        let response = request.send().await.map_err(|e| PluginError::Upstream(e.to_string()))?;
        let body: Value = response.json().await.map_err(|e| PluginError::Upstream(e.to_string()))?;
        let issues = body.as_array().cloned().unwrap_or_default();
        for issue in &issues {
            let git_issue = GitIssue {
                title: issue.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
                url: issue.get("url").and_then(Value::as_str).unwrap_or_default().to_string(),
                content: issue.get("body").and_then(Value::as_str).unwrap_or_default().to_string(),
                author: issue
                    .get("user")
                    .and_then(|u| u.get("login"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                html_url: issue.get("html_url").and_then(Value::as_str).unwrap_or_default().to_string(),
                state: issue.get("state").and_then(Value::as_str).unwrap_or_default().to_string(),
                number: issue.get("number").and_then(Value::as_u64).unwrap_or_default(),
                created_at: issue.get("created_at").and_then(Value::as_str).unwrap_or_default().to_string(),
            };
            context.record_issue(git_issue);
        }
        Ok(json!({ "issues": issues }))
    }

    async fn search_issue_comments(&self, issue_number: u64, max_results: u32) -> Result<Value> {
        let base = self.provider.api_base(&self.repo).replace("/issues", "");
        let url = format!("{base}/issues/{issue_number}/comments");
        let mut request = self.client.get(&url).query(&[("per_page", &max_results.to_string())]);
        request = match (&self.provider, &self.token) {
            (IssueProvider::Github, Some(token)) => request.bearer_auth(token),
            (IssueProvider::Gitee, Some(token)) => request.query(&[("access_token", token)]),
            _ => request,
        };
        let response = request.send().await.map_err(|e| PluginError::Upstream(e.to_string()))?;
        let body: Value = response.json().await.map_err(|e| PluginError::Upstream(e.to_string()))?;
        Ok(json!({ "comments": body }))
    }
}

pub struct GithubFunction(IssueSearchFunction);

impl GithubFunction {
    pub fn new(repo: impl Into<String>, token: Option<String>) -> Self {
        Self(IssueSearchFunction { provider: IssueProvider::Github, client: reqwest::Client::new(), repo: repo.into(), token })
    }
}

#[async_trait]
impl NativeFunction for GithubFunction {
    fn name(&self) -> &'static str {
        "github"
    }
    fn description(&self) -> &'static str {
        "Search GitHub issues and issue comments for the current repository"
    }

    async fn invoke(&self, args: Value, context: &DocumentContext) -> Result<Value> {
        dispatch_issue_search(&self.0, args, context).await
    }
}

pub struct GiteeFunction(IssueSearchFunction);

impl GiteeFunction {
    pub fn new(repo: impl Into<String>, token: Option<String>) -> Self {
        Self(IssueSearchFunction { provider: IssueProvider::Gitee, client: reqwest::Client::new(), repo: repo.into(), token })
    }
}

#[async_trait]
impl NativeFunction for GiteeFunction {
    fn name(&self) -> &'static str {
        "gitee"
    }
    fn description(&self) -> &'static str {
        "Search Gitee issues and issue comments for the current repository"
    }

    async fn invoke(&self, args: Value, context: &DocumentContext) -> Result<Value> {
        dispatch_issue_search(&self.0, args, context).await
    }
}

async fn dispatch_issue_search(inner: &IssueSearchFunction, args: Value, context: &DocumentContext) -> Result<Value> {
    let op = args.get("op").and_then(Value::as_str).unwrap_or("search_issues");
    match op {
        "search_issues" => {
            let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
            let max_results = args.get("max_results").and_then(Value::as_u64).unwrap_or(10) as u32;
            inner.search_issues(query, max_results, context).await
        }
        "search_issue_comments" => {
            let issue_number = args.get("issue_number").and_then(Value::as_u64).unwrap_or_default();
            let max_results = args.get("max_results").and_then(Value::as_u64).unwrap_or(10) as u32;
            inner.search_issue_comments(issue_number, max_results).await
        }
        other => Err(PluginError::NotFound(other.to_string())),
    }
}

pub fn rag_disabled() -> Arc<RagFunction> {
    Arc::new(RagFunction::new(None, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_function_rejects_path_escape() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inside.txt"), "hi").unwrap();
        let func = FileFunction::new(dir.path());
        let ctx = DocumentContext::new();
        assert!(func.read_file("../outside.txt", &ctx).is_err());
        assert_eq!(func.read_file("inside.txt", &ctx).unwrap(), "hi");
    }

    #[tokio::test]
    async fn rag_function_reports_not_enabled() {
        let func = RagFunction::new(None, None);
        let result = func.rag_search("query", 5, 0.3).await.unwrap();
        assert_eq!(result["error"], "rag not enabled");
    }

    #[tokio::test]
    async fn file_function_search_finds_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn needle() {}").unwrap();
        std::fs::write(dir.path().join("b.rs"), "fn other() {}").unwrap();
        let func = FileFunction::new(dir.path());
        let matches = func.search_files("needle").unwrap();
        assert_eq!(matches, vec!["a.rs".to_string()]);
    }
}
