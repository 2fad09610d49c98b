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

use anyhow::Result;
use clap::{Parser, Subcommand};
use codewiki_core::config::CodewikiConfig;
use codewiki_core::model::{Repository, WikiDocument};
use codewiki_llm::LLMProviderManager;
use codewiki_orchestrator::Orchestrator;
use codewiki_storage::WikiStore;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a CodewikiConfig TOML file (defaults are used if omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (overrides the config file's storage.db_path)
    #[arg(long, global = true, env = "CODEWIKI_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a local repository and run the wiki generation pipeline end to end.
    Generate {
        /// Path to the repository on disk.
        path: PathBuf,
        /// Git remote URL, if any. Enables the changelog stage.
        #[arg(long)]
        git_url: Option<String>,
        /// Branch name to record against the repository.
        #[arg(long, default_value = "main")]
        branch: String,
    },
    /// Print the current status of a previously generated wiki document.
    Status {
        /// The wiki document id returned by `generate`.
        document_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    codewiki_observability::init_logging("codewiki_cli=info")?;

    let cli = Cli::parse();
    let config: CodewikiConfig = CodewikiConfig::load(cli.config.clone())?;
    let store = match &cli.db {
        Some(path) => WikiStore::open(path)?,
        None => WikiStore::open(&config.storage.db_path)?,
    };
    let providers = Arc::new(LLMProviderManager::new(&config.llm)?);
    let orchestrator = Orchestrator::new(store, providers, config);

    match cli.command {
        Command::Generate { path, git_url, branch } => {
            let repository = Repository {
                id: Uuid::new_v4().to_string(),
                git_url,
                git_name: path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "repository".to_string()),
                branch,
                local_path: path.to_string_lossy().to_string(),
            };
            orchestrator.store().register_repository(&repository)?;

            let document = WikiDocument::new(Uuid::new_v4().to_string(), repository.id.clone());
            orchestrator.store().create_document(&document)?;

            tracing::info!(document_id = %document.id, "generating wiki");
            orchestrator.run(&document.id).await?;

            let saved = orchestrator.store().get_document(&document.id)?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        Command::Status { document_id } => {
            let document = orchestrator.store().get_document(&document_id)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }

    Ok(())
}
