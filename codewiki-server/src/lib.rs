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

pub mod api;
pub mod config;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use codewiki_llm::LLMProviderManager;
use codewiki_orchestrator::Orchestrator;
use codewiki_storage::WikiStore;
use config::ServerConfig;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    codewiki_observability::init_logging("codewiki_server=info,tower_http=info")?;

    tracing::info!(?config, "starting codewiki server");

    let db_path = config.codewiki.storage.db_path.clone();
    let store = WikiStore::open(&db_path)?;
    let providers = Arc::new(LLMProviderManager::new(&config.codewiki.llm)?);
    let orchestrator = Arc::new(Orchestrator::new(store, providers, config.codewiki.clone()));

    let state = AppState { orchestrator };

    let app = Router::new()
        .route("/health", get(api::health::health_check))
        .route("/api/v1/repositories", post(api::wiki::register_repository))
        .route("/api/v1/wikis/:document_id", get(api::wiki::get_wiki_status))
        .route("/api/v1/wikis/:document_id/catalogue", get(api::wiki::get_wiki_catalogue))
        .route("/api/v1/wikis/:document_id/overview", get(api::wiki::get_wiki_overview))
        .route("/api/v1/wikis/:document_id/minimap", get(api::wiki::get_wiki_minimap))
        .route("/api/v1/wikis/:document_id/content", get(api::wiki::get_wiki_content))
        .route("/api/v1/wikis/:document_id/changelog", get(api::wiki::get_wiki_changelog))
        .with_state(state)
        .layer(if config.server.enable_cors {
            CorsLayer::new().allow_methods(Any).allow_headers(Any).allow_origin(Any)
        } else {
            CorsLayer::new()
        })
        .layer(TraceLayer::new_for_http());

    let addr = config.socket_addr()?;
    tracing::info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
