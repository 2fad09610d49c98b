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

//! Pipeline configuration, loaded from a TOML file and overlaid with environment
//! variables (`CODEWIKI_*`) the way the server layer parses its own settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CodewikiError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodewikiConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub code_wiki_gen: CodeWikiGenConfig,
    #[serde(default)]
    pub mem0: Mem0Config,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for CodewikiConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            llm: LlmConfig::default(),
            vector_store: VectorStoreConfig::default(),
            code_wiki_gen: CodeWikiGenConfig::default(),
            mem0: Mem0Config::default(),
            git: GitConfig::default(),
            language: default_language(),
        }
    }
}

impl CodewikiConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| CodewikiError::Config(e.to_string()))
    }

    /// Loads from a file if present, then applies `CODEWIKI_*` environment overrides
    /// for the handful of secrets operators most commonly set outside the file.
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.as_ref().exists() => Self::from_file(p)?,
            _ => Self::default(),
        };

        if let Ok(key) = std::env::var("CODEWIKI_OPENAI_API_KEY") {
            config.llm.openai.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("CODEWIKI_ANTHROPIC_API_KEY") {
            config.llm.anthropic.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("CODEWIKI_DEEPSEEK_API_KEY") {
            config.llm.deepseek.api_key = Some(key);
        }
        if let Ok(token) = std::env::var("CODEWIKI_GITHUB_TOKEN") {
            config.git.github_token = Some(token);
        }
        if let Ok(token) = std::env::var("CODEWIKI_GITEE_TOKEN") {
            config.git.gitee_token = Some(token);
        }

        Ok(config)
    }
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_repo_storage_path")]
    pub repo_storage_path: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            repo_storage_path: default_repo_storage_path(),
            db_path: default_db_path(),
        }
    }
}

fn default_repo_storage_path() -> String {
    "./data/repos".to_string()
}

fn default_db_path() -> String {
    "./data/codewiki.sqlite3".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub deepseek: ProviderConfig,
    #[serde(default)]
    pub ollama: ProviderConfig,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_vector_store_engine")]
    pub engine: String,
    pub es_hosts: Option<Vec<String>>,
    pub es_username: Option<String>,
    pub es_password: Option<String>,
    pub os_hosts: Option<Vec<String>>,
    pub os_username: Option<String>,
    pub os_password: Option<String>,
    #[serde(default)]
    pub vector_store_mapping: std::collections::HashMap<String, String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            engine: default_vector_store_engine(),
            es_hosts: None,
            es_username: None,
            es_password: None,
            os_hosts: None,
            os_username: None,
            os_password: None,
            vector_store_mapping: std::collections::HashMap::new(),
        }
    }
}

fn default_vector_store_engine() -> String {
    "elasticsearch".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeWikiGenConfig {
    #[serde(default = "default_true")]
    pub enable_smart_filter: bool,
    #[serde(default = "default_catalogue_format")]
    pub catalogue_format: String,
    #[serde(default = "default_smart_filter_threshold")]
    pub smart_filter_threshold: usize,
}

impl Default for CodeWikiGenConfig {
    fn default() -> Self {
        Self {
            enable_smart_filter: default_true(),
            catalogue_format: default_catalogue_format(),
            smart_filter_threshold: default_smart_filter_threshold(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_catalogue_format() -> String {
    "compact".to_string()
}

/// The original source compares with `>`; see DESIGN.md Open Question #1.
fn default_smart_filter_threshold() -> usize {
    800
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mem0Config {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitConfig {
    pub github_token: Option<String>,
    pub gitee_token: Option<String>,
}
