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

use crate::error::Result;
use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS repositories (
    id TEXT PRIMARY KEY,
    git_url TEXT,
    git_name TEXT NOT NULL,
    branch TEXT NOT NULL,
    local_path TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS wiki_documents (
    id TEXT PRIMARY KEY,
    repository_id TEXT NOT NULL REFERENCES repositories(id),
    status TEXT NOT NULL,
    progress INTEGER NOT NULL,
    classify TEXT,
    readme TEXT NOT NULL DEFAULT '',
    error_message TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS catalogs (
    document_id TEXT PRIMARY KEY REFERENCES wiki_documents(id) ON DELETE CASCADE,
    total_items INTEGER NOT NULL,
    format TEXT NOT NULL,
    raw_catalogue TEXT NOT NULL,
    optimized_directory_struct TEXT
);

CREATE TABLE IF NOT EXISTS overviews (
    document_id TEXT PRIMARY KEY REFERENCES wiki_documents(id) ON DELETE CASCADE,
    content TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contents (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES wiki_documents(id) ON DELETE CASCADE,
    parent_id TEXT REFERENCES contents(id) ON DELETE CASCADE,
    order_index INTEGER NOT NULL,
    title TEXT NOT NULL,
    path TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    size INTEGER NOT NULL DEFAULT 0,
    UNIQUE(document_id, parent_id, order_index)
);

CREATE INDEX IF NOT EXISTS idx_contents_document ON contents(document_id);

CREATE TABLE IF NOT EXISTS content_sources (
    content_id TEXT NOT NULL REFERENCES contents(id) ON DELETE CASCADE,
    file_path TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_content_sources_content ON content_sources(content_id);

CREATE TABLE IF NOT EXISTS minimaps (
    document_id TEXT PRIMARY KEY REFERENCES wiki_documents(id) ON DELETE CASCADE,
    root_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS commit_records (
    document_id TEXT NOT NULL REFERENCES wiki_documents(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_commit_records_document ON commit_records(document_id);
"#;

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
