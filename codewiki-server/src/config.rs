// Copyright 2025 Codewiki Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use codewiki_core::config::CodewikiConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// The HTTP server's own settings, layered on top of [`CodewikiConfig`] (which
/// covers everything the pipeline itself needs).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub codewiki: CodewikiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: default_enable_cors(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_enable_cors() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { server: HttpServerConfig::default(), codewiki: CodewikiConfig::default() }
    }
}

impl ServerConfig {
    /// Loads from an optional TOML file, then overlays `CODEWIKI_*` environment
    /// variables via [`CodewikiConfig::load`] and a couple of server-only overrides.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(&path)?;
                toml::from_str(&text)?
            }
            Some(path) => {
                tracing::warn!(?path, "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        if let Ok(addr) = std::env::var("CODEWIKI_HTTP_ADDR") {
            config.server.listen_addr = addr;
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_a_valid_socket_addr() {
        let config = ServerConfig::default();
        assert!(config.socket_addr().is_ok());
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let config = ServerConfig::load(Some(PathBuf::from("/nonexistent/codewiki.toml"))).unwrap();
        assert_eq!(config.server.listen_addr, default_listen_addr());
    }
}
