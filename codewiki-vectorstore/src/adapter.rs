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

//! Elasticsearch and OpenSearch adapters: a lazily-opened, shared HTTP client
//! protected by an async lock for first connect, pinged every 30 seconds.

use crate::body::{build_search_body, KnnStyle};
use crate::error::{classify_http_error, Result, VectorStoreError};
use crate::query::SearchRequest;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PING_INTERVAL: Duration = Duration::from_secs(30);

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn create_space(&self, name: &str, vector_size: u32, mapping: Option<Value>) -> Result<()>;
    async fn delete_space(&self, name: &str) -> Result<()>;
    async fn space_exists(&self, name: &str) -> Result<bool>;
    async fn insert_records(&self, space: &str, records: Vec<Value>) -> Result<usize>;
    async fn update_records(&self, space: &str, id: &str, new_value: Value) -> Result<()>;
    async fn delete_records(&self, space: &str, condition: Value) -> Result<u64>;
    async fn get_record(&self, spaces: &[&str], id: &str) -> Result<Option<Value>>;
    async fn search(&self, spaces: &[&str], request: &SearchRequest) -> Result<Value>;
    async fn sql(&self, sql: &str, fetch_size: u32) -> Result<Value>;
}

struct ConnectionState {
    client: Client,
    last_ping: Instant,
}

struct HttpBackend {
    base_urls: Vec<String>,
    username: Option<String>,
    password: Option<String>,
    knn_style: KnnStyle,
    state: Mutex<Option<ConnectionState>>,
}

impl HttpBackend {
    fn new(hosts: Vec<String>, username: Option<String>, password: Option<String>, knn_style: KnnStyle) -> Self {
        Self { base_urls: hosts, username, password, knn_style, state: Mutex::new(None) }
    }

    fn primary_host(&self) -> Result<&str> {
        self.base_urls.first().map(String::as_str).ok_or_else(|| VectorStoreError::Config("no hosts configured".to_string()))
    }

    async fn client(&self) -> Result<Client> {
        let mut guard = self.state.lock().await;
        if let Some(state) = guard.as_mut() {
            if state.last_ping.elapsed() < PING_INTERVAL {
                return Ok(state.client.clone());
            }
            if self.ping(&state.client).await.is_ok() {
                state.last_ping = Instant::now();
                return Ok(state.client.clone());
            }
            tracing::warn!("vector store ping failed, reconnecting");
        }
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).timeout(REQUEST_TIMEOUT).build()?;
        self.ping(&client).await?;
        *guard = Some(ConnectionState { client: client.clone(), last_ping: Instant::now() });
        Ok(client)
    }

    async fn ping(&self, client: &Client) -> Result<()> {
        let host = self.primary_host()?;
        let mut request = client.get(host);
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            request = request.basic_auth(user, Some(pass));
        }
        request.send().await?;
        Ok(())
    }

    fn request(&self, client: &Client, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let host = self.primary_host()?;
        let url = format!("{}/{}", host.trim_end_matches('/'), path.trim_start_matches('/'));
        let mut request = client.request(method, url);
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            request = request.basic_auth(user, Some(pass));
        }
        Ok(request)
    }

    async fn retrying<F, Fut>(&self, f: F) -> Result<Value>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Value>>,
    {
        codewiki_core::retry(f, codewiki_core::DEFAULT_MAX_ATTEMPTS, VectorStoreError::is_retryable, codewiki_core::default_delay).await
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(classify_http_error(status, &body));
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| VectorStoreError::Parse(e.to_string()))
    }
}

#[async_trait]
impl VectorStore for HttpBackend {
    async fn create_space(&self, name: &str, vector_size: u32, mapping: Option<Value>) -> Result<()> {
        let mapping = mapping.unwrap_or_else(|| default_mapping(vector_size));
        self.retrying(|| async {
            let client = self.client().await?;
            let request = self.request(&client, reqwest::Method::PUT, name)?.json(&mapping);
            self.send_json(request).await
        })
        .await?;
        Ok(())
    }

    async fn delete_space(&self, name: &str) -> Result<()> {
        self.retrying(|| async {
            let client = self.client().await?;
            let request = self.request(&client, reqwest::Method::DELETE, name)?;
            self.send_json(request).await
        })
        .await?;
        Ok(())
    }

    async fn space_exists(&self, name: &str) -> Result<bool> {
        let client = self.client().await?;
        let request = self.request(&client, reqwest::Method::HEAD, name)?;
        let response = request.send().await?;
        Ok(response.status().is_success())
    }

    async fn insert_records(&self, space: &str, records: Vec<Value>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut ndjson = String::new();
        for record in &records {
            let id = record.get("id").and_then(Value::as_str).unwrap_or_default();
            ndjson.push_str(&json!({ "index": { "_index": space, "_id": id } }).to_string());
            ndjson.push('\n');
            ndjson.push_str(&record.to_string());
            ndjson.push('\n');
        }
        let count = records.len();
        self.retrying(|| async {
            let client = self.client().await?;
            let request = self.request(&client, reqwest::Method::POST, "_bulk")?.header("Content-Type", "application/x-ndjson").body(ndjson.clone());
            self.send_json(request).await
        })
        .await?;
        Ok(count)
    }

    async fn update_records(&self, space: &str, id: &str, new_value: Value) -> Result<()> {
        let path = format!("{space}/_update/{id}");
        let body = json!({ "doc": new_value });
        self.retrying(|| async {
            let client = self.client().await?;
            let request = self.request(&client, reqwest::Method::POST, &path)?.json(&body);
            self.send_json(request).await
        })
        .await?;
        Ok(())
    }

    async fn delete_records(&self, space: &str, condition: Value) -> Result<u64> {
        let path = format!("{space}/_delete_by_query");
        let body = json!({ "query": condition });
        let result = self
            .retrying(|| async {
                let client = self.client().await?;
                let request = self.request(&client, reqwest::Method::POST, &path)?.json(&body);
                self.send_json(request).await
            })
            .await?;
        Ok(result.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }

    async fn get_record(&self, spaces: &[&str], id: &str) -> Result<Option<Value>> {
        for space in spaces {
            let path = format!("{space}/_doc/{id}");
            let client = self.client().await?;
            let request = self.request(&client, reqwest::Method::GET, &path)?;
            let response = request.send().await?;
            if response.status().is_success() {
                let body: Value = response.json().await.map_err(|e| VectorStoreError::Parse(e.to_string()))?;
                return Ok(body.get("_source").cloned());
            }
        }
        Ok(None)
    }

    async fn search(&self, spaces: &[&str], request: &SearchRequest) -> Result<Value> {
        let index = spaces.join(",");
        let path = format!("{index}/_search");
        let body = build_search_body(request, self.knn_style);
        self.retrying(|| async {
            let client = self.client().await?;
            let req = self.request(&client, reqwest::Method::POST, &path)?.json(&body);
            self.send_json(req).await
        })
        .await
    }

    async fn sql(&self, sql: &str, fetch_size: u32) -> Result<Value> {
        let rewritten = crate::sql::rewrite_tks_predicates(sql, crate::sql::tokenize_default);
        let body = json!({ "query": rewritten, "fetch_size": fetch_size });
        self.retrying(|| async {
            let client = self.client().await?;
            let request = self.request(&client, reqwest::Method::POST, "_sql")?.json(&body);
            self.send_json(request).await
        })
        .await
    }
}

fn default_mapping(vector_size: u32) -> Value {
    json!({
        "settings": { "number_of_shards": 1 },
        "mappings": {
            "properties": {
                "content": { "type": "text" },
                "embedding": { "type": "dense_vector", "dims": vector_size, "index": true, "similarity": "cosine" }
            }
        }
    })
}

pub struct ElasticsearchAdapter(HttpBackend);

impl ElasticsearchAdapter {
    pub fn new(hosts: Vec<String>, username: Option<String>, password: Option<String>) -> Self {
        Self(HttpBackend::new(hosts, username, password, KnnStyle::TopLevelKnn))
    }
}

#[async_trait]
impl VectorStore for ElasticsearchAdapter {
    async fn create_space(&self, name: &str, vector_size: u32, mapping: Option<Value>) -> Result<()> {
        self.0.create_space(name, vector_size, mapping).await
    }
    async fn delete_space(&self, name: &str) -> Result<()> {
        self.0.delete_space(name).await
    }
    async fn space_exists(&self, name: &str) -> Result<bool> {
        self.0.space_exists(name).await
    }
    async fn insert_records(&self, space: &str, records: Vec<Value>) -> Result<usize> {
        self.0.insert_records(space, records).await
    }
    async fn update_records(&self, space: &str, id: &str, new_value: Value) -> Result<()> {
        self.0.update_records(space, id, new_value).await
    }
    async fn delete_records(&self, space: &str, condition: Value) -> Result<u64> {
        self.0.delete_records(space, condition).await
    }
    async fn get_record(&self, spaces: &[&str], id: &str) -> Result<Option<Value>> {
        self.0.get_record(spaces, id).await
    }
    async fn search(&self, spaces: &[&str], request: &SearchRequest) -> Result<Value> {
        self.0.search(spaces, request).await
    }
    async fn sql(&self, sql: &str, fetch_size: u32) -> Result<Value> {
        self.0.sql(sql, fetch_size).await
    }
}

pub struct OpenSearchAdapter(HttpBackend);

impl OpenSearchAdapter {
    pub fn new(hosts: Vec<String>, username: Option<String>, password: Option<String>) -> Self {
        Self(HttpBackend::new(hosts, username, password, KnnStyle::QueryKnn))
    }
}

#[async_trait]
impl VectorStore for OpenSearchAdapter {
    async fn create_space(&self, name: &str, vector_size: u32, mapping: Option<Value>) -> Result<()> {
        self.0.create_space(name, vector_size, mapping).await
    }
    async fn delete_space(&self, name: &str) -> Result<()> {
        self.0.delete_space(name).await
    }
    async fn space_exists(&self, name: &str) -> Result<bool> {
        self.0.space_exists(name).await
    }
    async fn insert_records(&self, space: &str, records: Vec<Value>) -> Result<usize> {
        self.0.insert_records(space, records).await
    }
    async fn update_records(&self, space: &str, id: &str, new_value: Value) -> Result<()> {
        self.0.update_records(space, id, new_value).await
    }
    async fn delete_records(&self, space: &str, condition: Value) -> Result<u64> {
        self.0.delete_records(space, condition).await
    }
    async fn get_record(&self, spaces: &[&str], id: &str) -> Result<Option<Value>> {
        self.0.get_record(spaces, id).await
    }
    async fn search(&self, spaces: &[&str], request: &SearchRequest) -> Result<Value> {
        self.0.search(spaces, request).await
    }
    async fn sql(&self, sql: &str, fetch_size: u32) -> Result<Value> {
        self.0.sql(sql, fetch_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mapping_has_expected_dims() {
        let mapping = default_mapping(768);
        assert_eq!(mapping["mappings"]["properties"]["embedding"]["dims"], 768);
    }
}
