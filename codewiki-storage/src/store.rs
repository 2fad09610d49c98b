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

//! The wiki persistence layer. Every stage write follows the same shape: delete the
//! document's prior rows for that artifact, then insert the new set inside one
//! transaction.

use crate::error::{Result, StorageError};
use crate::pool::StoragePool;
use codewiki_core::model::{
    Catalog, ClassifyType, CommitRecord, Content, ContentSource, MiniMap, MiniMapNode,
    Overview, PipelineStatus, Repository, WikiDocument,
};
use rusqlite::{params, OptionalExtension};

fn status_to_str(status: PipelineStatus) -> &'static str {
    match status {
        PipelineStatus::Pending => "pending",
        PipelineStatus::Processing => "processing",
        PipelineStatus::Completed => "completed",
        PipelineStatus::Failed => "failed",
        PipelineStatus::Canceled => "canceled",
    }
}

fn status_from_str(s: &str) -> PipelineStatus {
    match s {
        "processing" => PipelineStatus::Processing,
        "completed" => PipelineStatus::Completed,
        "failed" => PipelineStatus::Failed,
        "canceled" => PipelineStatus::Canceled,
        _ => PipelineStatus::Pending,
    }
}

fn classify_to_str(classify: ClassifyType) -> &'static str {
    match classify {
        ClassifyType::Applications => "Applications",
        ClassifyType::Frameworks => "Frameworks",
        ClassifyType::Libraries => "Libraries",
        ClassifyType::DevelopmentTools => "DevelopmentTools",
        ClassifyType::CliTools => "CLITools",
        ClassifyType::DevOpsConfiguration => "DevOpsConfiguration",
        ClassifyType::Documentation => "Documentation",
    }
}

pub struct WikiStore {
    pool: StoragePool,
}

impl WikiStore {
    pub fn new(pool: StoragePool) -> Self {
        Self { pool }
    }

    pub fn open(db_path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(StoragePool::open(db_path)?))
    }

    // --- Repository ---------------------------------------------------

    pub fn register_repository(&self, repo: &Repository) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO repositories (id, git_url, git_name, branch, local_path) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET git_url = excluded.git_url, git_name = excluded.git_name,
                branch = excluded.branch, local_path = excluded.local_path",
            params![repo.id, repo.git_url, repo.git_name, repo.branch, repo.local_path],
        )?;
        Ok(())
    }

    pub fn get_repository(&self, id: &str) -> Result<Repository> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, git_url, git_name, branch, local_path FROM repositories WHERE id = ?1",
            params![id],
            |row| {
                Ok(Repository {
                    id: row.get(0)?,
                    git_url: row.get(1)?,
                    git_name: row.get(2)?,
                    branch: row.get(3)?,
                    local_path: row.get(4)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("repository {id}")))
    }

    // --- WikiDocument ---------------------------------------------------

    pub fn create_document(&self, document: &WikiDocument) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO wiki_documents (id, repository_id, status, progress, classify, readme, error_message, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                document.id,
                document.repository_id,
                status_to_str(document.status),
                document.progress,
                document.classify.map(classify_to_str),
                document.readme,
                document.error_message,
                document.created_at,
                document.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_document(&self, id: &str) -> Result<WikiDocument> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, repository_id, status, progress, classify, readme, error_message, created_at, updated_at
             FROM wiki_documents WHERE id = ?1",
            params![id],
            |row| {
                let status_str: String = row.get(2)?;
                let classify_str: Option<String> = row.get(4)?;
                Ok(WikiDocument {
                    id: row.get(0)?,
                    repository_id: row.get(1)?,
                    status: status_from_str(&status_str),
                    progress: row.get(3)?,
                    classify: classify_str.as_deref().and_then(ClassifyType::from_extracted),
                    readme: row.get(5)?,
                    error_message: row.get(6)?,
                    created_at: row.get(7)?,
                    updated_at: row.get(8)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("wiki document {id}")))
    }

    /// Updates status/progress/message in place; `updated_at` is bumped to `now`.
    pub fn update_status(&self, id: &str, status: PipelineStatus, progress: u8, message: Option<&str>, now: i64) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE wiki_documents SET status = ?1, progress = ?2, error_message = ?3, updated_at = ?4 WHERE id = ?5",
            params![status_to_str(status), progress, message, now, id],
        )?;
        Ok(())
    }

    pub fn set_readme(&self, id: &str, readme: &str, now: i64) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute("UPDATE wiki_documents SET readme = ?1, updated_at = ?2 WHERE id = ?3", params![readme, now, id])?;
        Ok(())
    }

    pub fn set_classify(&self, id: &str, classify: Option<ClassifyType>, now: i64) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE wiki_documents SET classify = ?1, updated_at = ?2 WHERE id = ?3",
            params![classify.map(classify_to_str), now, id],
        )?;
        Ok(())
    }

    // --- Catalog (directory catalogue text, stage 2) --------------------

    pub fn write_catalog(&self, catalog: &Catalog) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM catalogs WHERE document_id = ?1", params![catalog.document_id])?;
        tx.execute(
            "INSERT INTO catalogs (document_id, total_items, format, raw_catalogue, optimized_directory_struct)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![catalog.document_id, catalog.total_items as i64, catalog.format, catalog.raw_catalogue, catalog.optimized_directory_struct],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_catalog(&self, document_id: &str) -> Result<Option<Catalog>> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT document_id, total_items, format, raw_catalogue, optimized_directory_struct FROM catalogs WHERE document_id = ?1",
            params![document_id],
            |row| {
                Ok(Catalog {
                    document_id: row.get(0)?,
                    total_items: row.get::<_, i64>(1)? as usize,
                    format: row.get(2)?,
                    raw_catalogue: row.get(3)?,
                    optimized_directory_struct: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(StorageError::from)
    }

    // --- Overview (stage 5) ---------------------------------------------

    pub fn write_overview(&self, overview: &Overview) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM overviews WHERE document_id = ?1", params![overview.document_id])?;
        tx.execute("INSERT INTO overviews (document_id, content) VALUES (?1, ?2)", params![overview.document_id, overview.content])?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_overview(&self, document_id: &str) -> Result<Option<Overview>> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT document_id, content FROM overviews WHERE document_id = ?1",
            params![document_id],
            |row| Ok(Overview { document_id: row.get(0)?, content: row.get(1)? }),
        )
        .optional()
        .map_err(StorageError::from)
    }

    // --- Catalog tree / content (stages 6-7) ----------------------------

    /// Replaces every `Content` row (tree structure + body) for the document in one
    /// transaction; `nodes` must already carry their final `order` values assigned by
    /// traversal order.
    pub fn write_content_tree(&self, document_id: &str, nodes: &[Content]) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM contents WHERE document_id = ?1", params![document_id])?;
        for node in nodes {
            tx.execute(
                "INSERT INTO contents (id, document_id, parent_id, order_index, title, path, content, size)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![node.id, node.document_id, node.parent_id, node.order, node.title, node.path, node.content, node.content.len() as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert-or-update a single leaf's body by catalog (content) id, replacing all
    /// of its `ContentSource` rows.
    pub fn write_content(&self, content: &Content, sources: &[ContentSource]) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO contents (id, document_id, parent_id, order_index, title, path, content, size)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET content = excluded.content, size = excluded.size, title = excluded.title",
            params![content.id, content.document_id, content.parent_id, content.order, content.title, content.path, content.content, content.content.len() as i64],
        )?;
        tx.execute("DELETE FROM content_sources WHERE content_id = ?1", params![content.id])?;
        for source in sources {
            tx.execute("INSERT INTO content_sources (content_id, file_path) VALUES (?1, ?2)", params![source.content_id, source.file_path])?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_contents(&self, document_id: &str) -> Result<Vec<Content>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, document_id, parent_id, order_index, title, path, content FROM contents WHERE document_id = ?1 ORDER BY order_index",
        )?;
        let rows = stmt
            .query_map(params![document_id], |row| {
                Ok(Content {
                    id: row.get(0)?,
                    document_id: row.get(1)?,
                    parent_id: row.get(2)?,
                    order: row.get(3)?,
                    title: row.get(4)?,
                    path: row.get(5)?,
                    content: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_content_sources(&self, content_id: &str) -> Result<Vec<ContentSource>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT content_id, file_path FROM content_sources WHERE content_id = ?1")?;
        let rows = stmt
            .query_map(params![content_id], |row| Ok(ContentSource { content_id: row.get(0)?, file_path: row.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // --- MiniMap (stage 4) ----------------------------------------------

    pub fn write_minimap(&self, minimap: &MiniMap) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM minimaps WHERE document_id = ?1", params![minimap.document_id])?;
        let root_json = serde_json::to_string(&minimap.root)?;
        tx.execute("INSERT INTO minimaps (document_id, root_json) VALUES (?1, ?2)", params![minimap.document_id, root_json])?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_minimap(&self, document_id: &str) -> Result<Option<MiniMap>> {
        let conn = self.pool.get()?;
        let row: Option<(String, String)> = conn
            .query_row("SELECT document_id, root_json FROM minimaps WHERE document_id = ?1", params![document_id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;
        match row {
            Some((document_id, root_json)) => {
                let root: MiniMapNode = serde_json::from_str(&root_json)?;
                Ok(Some(MiniMap { document_id, root }))
            }
            None => Ok(None),
        }
    }

    // --- CommitRecord (stage 8) ------------------------------------------

    pub fn write_commit_records(&self, document_id: &str, records: &[CommitRecord]) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM commit_records WHERE document_id = ?1", params![document_id])?;
        for record in records {
            tx.execute(
                "INSERT INTO commit_records (document_id, date, title, description) VALUES (?1, ?2, ?3, ?4)",
                params![record.document_id, record.date, record.title, record.description],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_commit_records(&self, document_id: &str) -> Result<Vec<CommitRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT document_id, date, title, description FROM commit_records WHERE document_id = ?1 ORDER BY date DESC")?;
        let rows = stmt
            .query_map(params![document_id], |row| {
                Ok(CommitRecord { document_id: row.get(0)?, date: row.get(1)?, title: row.get(2)?, description: row.get(3)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codewiki_core::model::PipelineStage;

    fn test_store() -> WikiStore {
        WikiStore::new(StoragePool::in_memory().unwrap())
    }

    fn sample_repo() -> Repository {
        Repository { id: "repo-1".to_string(), git_url: None, git_name: "demo".to_string(), branch: "main".to_string(), local_path: "/tmp/demo".to_string() }
    }

    #[test]
    fn registers_and_fetches_repository() {
        let store = test_store();
        store.register_repository(&sample_repo()).unwrap();
        let fetched = store.get_repository("repo-1").unwrap();
        assert_eq!(fetched.git_name, "demo");
    }

    #[test]
    fn missing_repository_is_not_found() {
        let store = test_store();
        assert!(matches!(store.get_repository("missing"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn document_lifecycle_updates_status_and_progress() {
        let store = test_store();
        store.register_repository(&sample_repo()).unwrap();
        let document = WikiDocument::new("doc-1", "repo-1");
        store.create_document(&document).unwrap();

        store.update_status("doc-1", PipelineStatus::Processing, PipelineStage::Readme.checkpoint(), None, 100).unwrap();
        let fetched = store.get_document("doc-1").unwrap();
        assert_eq!(fetched.status, PipelineStatus::Processing);
        assert_eq!(fetched.progress, 10);
    }

    #[test]
    fn write_overview_replaces_prior_row() {
        let store = test_store();
        store.register_repository(&sample_repo()).unwrap();
        store.create_document(&WikiDocument::new("doc-1", "repo-1")).unwrap();

        store.write_overview(&Overview { document_id: "doc-1".to_string(), content: "first".to_string() }).unwrap();
        store.write_overview(&Overview { document_id: "doc-1".to_string(), content: "second".to_string() }).unwrap();

        let overview = store.get_overview("doc-1").unwrap().unwrap();
        assert_eq!(overview.content, "second");
    }

    #[test]
    fn content_tree_rewrite_is_idempotent() {
        let store = test_store();
        store.register_repository(&sample_repo()).unwrap();
        store.create_document(&WikiDocument::new("doc-1", "repo-1")).unwrap();

        let nodes = vec![
            Content { id: "c1".to_string(), document_id: "doc-1".to_string(), parent_id: None, order: 0, title: "Entry Point".to_string(), path: "main.py".to_string(), content: "body".to_string() },
        ];
        store.write_content_tree("doc-1", &nodes).unwrap();
        store.write_content_tree("doc-1", &nodes).unwrap();

        let fetched = store.list_contents("doc-1").unwrap();
        assert_eq!(fetched.len(), 1);
    }

    #[test]
    fn minimap_round_trips_through_json() {
        let store = test_store();
        store.register_repository(&sample_repo()).unwrap();
        store.create_document(&WikiDocument::new("doc-1", "repo-1")).unwrap();

        let minimap = MiniMap {
            document_id: "doc-1".to_string(),
            root: MiniMapNode { title: "Root".to_string(), url: String::new(), nodes: vec![MiniMapNode { title: "Child".to_string(), url: "src/main.rs".to_string(), nodes: vec![] }] },
        };
        store.write_minimap(&minimap).unwrap();
        let fetched = store.get_minimap("doc-1").unwrap().unwrap();
        assert_eq!(fetched.root.nodes[0].title, "Child");
    }
}
