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

//! The wiki data model: a repository's generated wiki document and its child records.
//!
//! A [`WikiDocument`] owns at most one [`Overview`], at most one [`Catalog`], at most
//! one [`MiniMap`], any number of [`Content`] articles (each with any number of
//! [`ContentSource`] backing files), and any number of [`CommitRecord`]s. Every stage of
//! the pipeline deletes its own prior child rows before inserting new ones, so a
//! document's child records always reflect only the most recent successful run of that
//! stage.

use serde::{Deserialize, Serialize};

/// A repository registered for wiki generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub git_url: Option<String>,
    pub git_name: String,
    pub branch: String,
    pub local_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Canceled,
}

/// The eight ordered pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Readme,
    Catalogue,
    Classify,
    Minimap,
    Overview,
    WikiCatalogue,
    WikiContent,
    Changelog,
}

impl PipelineStage {
    pub const ORDER: [PipelineStage; 8] = [
        PipelineStage::Readme,
        PipelineStage::Catalogue,
        PipelineStage::Classify,
        PipelineStage::Minimap,
        PipelineStage::Overview,
        PipelineStage::WikiCatalogue,
        PipelineStage::WikiContent,
        PipelineStage::Changelog,
    ];

    /// Progress percentage recorded once this stage completes.
    pub fn checkpoint(self) -> u8 {
        match self {
            PipelineStage::Readme => 10,
            PipelineStage::Catalogue => 25,
            PipelineStage::Classify => 35,
            PipelineStage::Minimap => 45,
            PipelineStage::Overview => 60,
            PipelineStage::WikiCatalogue => 75,
            PipelineStage::WikiContent => 95,
            PipelineStage::Changelog => 100,
        }
    }
}

/// Repository classification, an allow-list of recognized project archetypes. Any LLM
/// response that does not map onto one of these variants is discarded (the field stays
/// `None`), matching the original's attribute-lookup-or-discard behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ClassifyType {
    Applications,
    Frameworks,
    Libraries,
    DevelopmentTools,
    #[serde(rename = "CLITools")]
    CliTools,
    DevOpsConfiguration,
    Documentation,
}

impl ClassifyType {
    /// Matches a name extracted from an LLM response (after stripping any
    /// `classifyName:` prefix) against the allow-list, case-insensitively.
    pub fn from_extracted(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace([' ', '-', '_'], "");
        match normalized.as_str() {
            "applications" | "application" => Some(Self::Applications),
            "frameworks" | "framework" => Some(Self::Frameworks),
            "libraries" | "library" | "lib" => Some(Self::Libraries),
            "developmenttools" | "devtools" => Some(Self::DevelopmentTools),
            "clitools" | "cli" | "commandlinetools" => Some(Self::CliTools),
            "devopsconfiguration" | "devops" | "devopsconfig" => Some(Self::DevOpsConfiguration),
            "documentation" | "docs" => Some(Self::Documentation),
            _ => None,
        }
    }
}

/// The root row tracking a single wiki-generation run for a [`Repository`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiDocument {
    pub id: String,
    pub repository_id: String,
    pub status: PipelineStatus,
    pub progress: u8,
    pub classify: Option<ClassifyType>,
    pub readme: String,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WikiDocument {
    pub fn new(id: impl Into<String>, repository_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: id.into(),
            repository_id: repository_id.into(),
            status: PipelineStatus::Pending,
            progress: 0,
            classify: None,
            readme: String::new(),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The directory catalogue for a document, in both raw and (optionally)
/// LLM-simplified form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub document_id: String,
    pub total_items: usize,
    pub format: String,
    pub raw_catalogue: String,
    pub optimized_directory_struct: Option<String>,
}

/// The narrative overview ("blog") generated for a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overview {
    pub document_id: String,
    pub content: String,
}

/// One article in the hierarchical wiki catalogue/content tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: String,
    pub document_id: String,
    pub parent_id: Option<String>,
    pub order: i32,
    pub title: String,
    pub path: String,
    pub content: String,
}

/// A source file that backed the generation of a [`Content`] article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSource {
    pub content_id: String,
    pub file_path: String,
}

/// A node in the knowledge mind-map tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniMapNode {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub nodes: Vec<MiniMapNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniMap {
    pub document_id: String,
    pub root: MiniMapNode,
}

/// A single changelog entry derived from the repository's commit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub document_id: String,
    pub date: String,
    pub title: String,
    pub description: String,
}
