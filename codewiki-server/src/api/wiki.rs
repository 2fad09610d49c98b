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

//! Registers repositories and exposes each stage's persisted output. Generation
//! itself runs on a spawned task; clients poll `GET /wikis/:id` for progress.

use crate::api::ApiError;
use crate::AppState;
use axum::{extract::Path, extract::State, Json};
use codewiki_core::model::{Repository, WikiDocument};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRepositoryRequest {
    pub git_url: Option<String>,
    pub git_name: String,
    pub branch: String,
    pub local_path: String,
}

pub async fn register_repository(
    State(state): State<AppState>,
    Json(req): Json<RegisterRepositoryRequest>,
) -> Result<Json<Value>, ApiError> {
    let repository = Repository {
        id: Uuid::new_v4().to_string(),
        git_url: req.git_url,
        git_name: req.git_name,
        branch: req.branch,
        local_path: req.local_path,
    };
    state.orchestrator.store().register_repository(&repository)?;

    let document = WikiDocument::new(Uuid::new_v4().to_string(), repository.id.clone());
    state.orchestrator.store().create_document(&document)?;

    let orchestrator = state.orchestrator.clone();
    let document_id = document.id.clone();
    tokio::spawn(async move {
        if let Err(err) = orchestrator.run(&document_id).await {
            tracing::error!(document_id, error = %err, "wiki generation failed");
        }
    });

    Ok(Json(json!({ "repository_id": repository.id, "document_id": document.id })))
}

pub async fn get_wiki_status(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<WikiDocument>, ApiError> {
    Ok(Json(state.orchestrator.store().get_document(&document_id)?))
}

pub async fn get_wiki_catalogue(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!(state.orchestrator.store().get_catalog(&document_id)?)))
}

pub async fn get_wiki_overview(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!(state.orchestrator.store().get_overview(&document_id)?)))
}

pub async fn get_wiki_minimap(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!(state.orchestrator.store().get_minimap(&document_id)?)))
}

pub async fn get_wiki_content(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!(state.orchestrator.store().list_contents(&document_id)?)))
}

pub async fn get_wiki_changelog(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!(state.orchestrator.store().list_commit_records(&document_id)?)))
}
