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

//! Drives one [`WikiDocument`] through its eight stages, in order, idempotently.

use crate::error::{OrchestratorError, Result};
use crate::provider::ManagedProvider;
use crate::{minimap, parse};
use codewiki_core::config::CodewikiConfig;
use codewiki_core::model::{
    Catalog, ClassifyType, CommitRecord, Content, ContentSource, MiniMap, Overview,
    PipelineStage, PipelineStatus, Repository,
};
use codewiki_llm::LLMProviderManager;
use codewiki_plugins::{DocumentContext, FileFunction, Kernel, KernelCache, KernelCacheKey};
use codewiki_scanner::get_catalogue;
use codewiki_storage::WikiStore;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// Linear backoff used for stage-level retries, distinct from the LLM adapter's own
/// exponential-with-jitter retry.
async fn stage_backoff(attempt: u32) {
    tokio::time::sleep(std::time::Duration::from_secs(5 * (attempt as u64 + 1))).await;
}

pub struct Orchestrator {
    store: WikiStore,
    providers: Arc<LLMProviderManager>,
    config: CodewikiConfig,
    kernel_cache: KernelCache,
}

impl Orchestrator {
    pub fn new(store: WikiStore, providers: Arc<LLMProviderManager>, config: CodewikiConfig) -> Self {
        Self { store, providers, config, kernel_cache: KernelCache::new() }
    }

    pub fn store(&self) -> &WikiStore {
        &self.store
    }

    fn kernel_for(&self, working_dir: &Path, analysis_mode: bool) -> Arc<Kernel> {
        let provider_id = self.config.llm.default_provider.clone();
        let model = self.config.llm.default_model.clone();
        let key = KernelCacheKey {
            base_url: provider_id.clone(),
            api_key: String::new(),
            working_dir: working_dir.to_string_lossy().to_string(),
            model: model.clone(),
            analysis_mode: if analysis_mode { "analysis".to_string() } else { "default".to_string() },
        };
        let providers = self.providers.clone();
        self.kernel_cache.get_or_insert_with(key, move || {
            let provider = Arc::new(ManagedProvider::new(providers, provider_id));
            let mut kernel = Kernel::new(provider, model, working_dir);
            kernel.register_native(Arc::new(FileFunction::new(working_dir)));
            kernel
        })
    }

    /// Runs every stage in order, persisting after each and bumping status/progress.
    /// On an unrecoverable failure the document is moved to `Failed` and later stages
    /// do not run.
    pub async fn run(&self, document_id: &str) -> Result<()> {
        let repo = {
            let document = self.store.get_document(document_id)?;
            self.store.get_repository(&document.repository_id)?
        };
        let context = DocumentContext::new();

        self.store.update_status(document_id, PipelineStatus::Processing, 0, Some("starting wiki generation"), now())?;

        if let Err(err) = self.run_stages(document_id, &repo, &context).await {
            error!(document_id, error = %err, "wiki generation failed");
            let _ = self.store.update_status(document_id, PipelineStatus::Failed, self.store.get_document(document_id).map(|d| d.progress).unwrap_or(0), Some(&err.to_string()), now());
            return Err(err);
        }

        self.store.update_status(document_id, PipelineStatus::Completed, PipelineStage::Changelog.checkpoint(), Some("wiki generation complete"), now())?;
        info!(document_id, "wiki generation complete");
        Ok(())
    }

    async fn run_stages(&self, document_id: &str, repo: &Repository, context: &DocumentContext) -> Result<()> {
        let kernel = self.kernel_for(Path::new(&repo.local_path), true);

        let readme = self.generate_readme(repo, &kernel).await?;
        self.store.set_readme(document_id, &readme, now())?;
        self.checkpoint(document_id, PipelineStage::Readme)?;

        let catalogue = self.generate_catalogue(document_id, repo, &readme, &kernel).await?;
        self.checkpoint(document_id, PipelineStage::Catalogue)?;

        let classify = self.generate_classify(&catalogue, &readme, &kernel).await?;
        self.store.set_classify(document_id, classify, now())?;
        self.checkpoint(document_id, PipelineStage::Classify)?;

        let minimap = self.generate_minimap(&catalogue, repo, &kernel).await?;
        self.store.write_minimap(&MiniMap { document_id: document_id.to_string(), root: minimap })?;
        self.checkpoint(document_id, PipelineStage::Minimap)?;

        let overview = self.generate_overview(&catalogue, &readme, classify, repo, &kernel).await?;
        self.store.write_overview(&Overview { document_id: document_id.to_string(), content: overview })?;
        self.checkpoint(document_id, PipelineStage::Overview)?;

        let nodes = self.generate_wiki_catalogue(document_id, &catalogue, classify, &kernel).await?;
        self.store.write_content_tree(document_id, &nodes)?;
        self.checkpoint(document_id, PipelineStage::WikiCatalogue)?;

        let graph = self.build_dependency_graph(repo)?;
        self.generate_wiki_content(document_id, &nodes, &catalogue, &kernel, context, &graph).await?;
        self.checkpoint(document_id, PipelineStage::WikiContent)?;

        if repo.git_url.is_some() {
            self.generate_changelog(document_id, repo, &readme, &kernel).await?;
        }
        self.checkpoint(document_id, PipelineStage::Changelog)?;

        Ok(())
    }

    fn checkpoint(&self, document_id: &str, stage: PipelineStage) -> Result<()> {
        self.store.update_status(document_id, PipelineStatus::Processing, stage.checkpoint(), None, now())?;
        Ok(())
    }

    // --- Stage 1: README --------------------------------------------------

    async fn generate_readme(&self, repo: &Repository, kernel: &Kernel) -> Result<String> {
        for candidate in ["README.md", "README.MD", "Readme.md", "README", "README.rst", "README.txt"] {
            let path = Path::new(&repo.local_path).join(candidate);
            if let Ok(text) = tokio::fs::read_to_string(&path).await {
                if !text.trim().is_empty() {
                    return Ok(text);
                }
            }
        }

        let catalogue = self.local_catalogue(repo)?;
        let prompt = codewiki_prompts::render(
            "Generate a README for this repository.\n\nDirectory listing:\n{{ catalogue }}\n\nRepository: {{ git_repository }}\nBranch: {{ branch }}\n\nWrap the result in <readme></readme> tags.",
            &vars(&[
                ("catalogue", catalogue.as_str()),
                ("git_repository", repo.git_url.as_deref().unwrap_or(&repo.git_name)),
                ("branch", repo.branch.as_str()),
            ]),
        )?;
        let response = kernel.invoke_prompt(&prompt, None).await?;
        Ok(parse::extract_tagged(&response.content, "readme"))
    }

    fn local_catalogue(&self, repo: &Repository) -> Result<String> {
        let infos = codewiki_scanner::scan(&repo.local_path)?;
        Ok(get_catalogue(&infos))
    }

    /// Builds the repository-wide dependency graph once per run, so stage 7 can surface
    /// each documented file's direct dependencies as extra context instead of asking the
    /// model to discover them one `FileFunction` read at a time.
    fn build_dependency_graph(&self, repo: &Repository) -> Result<codewiki_depgraph::DependencyGraph> {
        let infos = codewiki_scanner::scan(&repo.local_path)?;
        let root = Path::new(&repo.local_path);
        let mut files = Vec::new();

        for info in infos.iter().filter(|i| !i.is_directory) {
            let extension = Path::new(&info.path).extension().and_then(|e| e.to_str()).unwrap_or("");
            let language = codewiki_compress::language_for_extension(extension);
            if language == "generic" {
                continue;
            }
            if let Ok(content) = std::fs::read_to_string(root.join(&info.path)) {
                files.push((info.path.clone(), language.to_string(), content));
            }
        }

        Ok(codewiki_depgraph::build_graph(&files))
    }

    // --- Stage 2: catalogue -------------------------------------------------

    async fn generate_catalogue(&self, document_id: &str, repo: &Repository, readme: &str, kernel: &Kernel) -> Result<String> {
        let infos = codewiki_scanner::scan(&repo.local_path)?;
        let total_items = infos.len();
        let tree = codewiki_scanner::tree::build_tree(&infos);
        let mut catalogue = encode_tree(&tree, &self.config.code_wiki_gen.catalogue_format);

        if total_items > self.config.code_wiki_gen.smart_filter_threshold && self.config.code_wiki_gen.enable_smart_filter {
            let prompt = codewiki_prompts::render(
                "Simplify this directory listing, keeping only entries relevant to documentation.\n\nListing:\n{{ catalogue }}\n\nREADME:\n{{ readme }}\n\nReturn the simplified listing inside <response_file></response_file> tags.",
                &vars(&[("catalogue", catalogue.as_str()), ("readme", readme)]),
            )?;

            let mut last_error = None;
            let mut result_text = String::new();
            for attempt in 0..5u32 {
                match kernel.invoke_prompt(&prompt, None).await {
                    Ok(response) => {
                        result_text = response.content;
                        last_error = None;
                        break;
                    }
                    Err(err) => {
                        warn!(document_id, attempt, error = %err, "directory simplification failed, retrying");
                        last_error = Some(err);
                        stage_backoff(attempt).await;
                    }
                }
            }
            if let Some(err) = last_error {
                warn!(document_id, error = %err, "directory simplification exhausted retries, using local encoding");
            } else if !result_text.is_empty() {
                catalogue = parse::extract_tagged(&result_text, "response_file");
            }
        }

        self.store.write_catalog(&Catalog {
            document_id: document_id.to_string(),
            total_items,
            format: self.config.code_wiki_gen.catalogue_format.clone(),
            raw_catalogue: get_catalogue(&infos),
            optimized_directory_struct: Some(catalogue.clone()),
        })?;

        Ok(catalogue)
    }

    // --- Stage 3: classify ---------------------------------------------------

    async fn generate_classify(&self, catalogue: &str, readme: &str, kernel: &Kernel) -> Result<Option<ClassifyType>> {
        let prompt = codewiki_prompts::render(
            "Classify this repository's archetype.\n\nListing:\n{{ catalogue }}\n\nREADME:\n{{ readme }}\n\nRespond with <classify>classifyName: X</classify> where X is one of Applications, Frameworks, Libraries, DevelopmentTools, CLITools, DevOpsConfiguration, Documentation.",
            &vars(&[("catalogue", catalogue), ("readme", readme)]),
        )?;
        let response = kernel.invoke_prompt(&prompt, None).await?;
        Ok(parse::extract_classify(&response.content))
    }

    // --- Stage 4: minimap -----------------------------------------------------

    async fn generate_minimap(&self, catalogue: &str, repo: &Repository, kernel: &Kernel) -> Result<codewiki_core::model::MiniMapNode> {
        let prompt = codewiki_prompts::render(
            "Produce a knowledge mind-map of this repository as nested Markdown headings, one heading per concept, each optionally suffixed with \": path/to/file\".\n\nListing:\n{{ catalogue }}\n\nRepository: {{ git_repository }}\nBranch: {{ branch }}",
            &vars(&[
                ("catalogue", catalogue),
                ("git_repository", repo.git_url.as_deref().unwrap_or(&repo.git_name)),
                ("branch", repo.branch.as_str()),
            ]),
        )?;
        let response = kernel.invoke_prompt(&prompt, None).await?;
        let thinking_stripped = strip_thinking(&response.content);
        Ok(minimap::parse(&thinking_stripped))
    }

    // --- Stage 5: overview ------------------------------------------------------

    async fn generate_overview(&self, catalogue: &str, readme: &str, classify: Option<ClassifyType>, repo: &Repository, kernel: &Kernel) -> Result<String> {
        let classify_hint = classify.map(|c| format!("{c:?}")).unwrap_or_else(|| "Unclassified".to_string());
        let prompt = codewiki_prompts::render(
            "Write a narrative overview (a \"blog\" post) introducing this project to a new contributor.\n\nClassification: {{ classify }}\nListing:\n{{ catalogue }}\nREADME:\n{{ readme }}\nRepository: {{ git_repository }}\nBranch: {{ branch }}\n\nWrap the result in <blog></blog> tags.",
            &vars(&[
                ("classify", classify_hint.as_str()),
                ("catalogue", catalogue),
                ("readme", readme),
                ("git_repository", repo.git_url.as_deref().unwrap_or(&repo.git_name)),
                ("branch", repo.branch.as_str()),
            ]),
        )?;
        let response = kernel.invoke_prompt(&prompt, None).await?;
        Ok(parse::extract_tagged(&response.content, "blog"))
    }

    // --- Stage 6: wiki catalogue --------------------------------------------------

    async fn generate_wiki_catalogue(&self, document_id: &str, catalogue: &str, classify: Option<ClassifyType>, kernel: &Kernel) -> Result<Vec<Content>> {
        let classify_hint = classify.map(|c| format!("{c:?}")).unwrap_or_else(|| "Unclassified".to_string());
        let prompt = codewiki_prompts::render(
            "Design a hierarchical wiki table of contents for this repository.\n\nClassification: {{ classify }}\nListing:\n{{ catalogue }}\n\nReturn strict JSON inside <response_file></response_file> tags: a tree of {\"title\": string, \"path\": string|null, \"children\": [...]}. Leaves carry the source path they document; branches carry null.",
            &vars(&[("classify", classify_hint.as_str()), ("catalogue", catalogue)]),
        )?;
        let response = kernel.invoke_prompt(&prompt, None).await?;
        let raw = parse::extract_tagged(&response.content, "response_file");

        let tree: CatalogNode = serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(document_id, error = %err, "wiki catalogue response was not valid JSON, falling back to a single root node");
            CatalogNode { title: "Overview".to_string(), path: None, children: Vec::new() }
        });

        let mut nodes = Vec::new();
        flatten_catalog(document_id, &tree, None, &mut 0, &mut nodes);
        Ok(nodes)
    }

    // --- Stage 7: wiki content -------------------------------------------------

    async fn generate_wiki_content(
        &self,
        document_id: &str,
        nodes: &[Content],
        catalogue: &str,
        kernel: &Kernel,
        context: &DocumentContext,
        graph: &codewiki_depgraph::DependencyGraph,
    ) -> Result<()> {
        for node in nodes {
            if node.path.is_empty() {
                continue; // a branch node; only leaves carry generated bodies.
            }

            let related = graph
                .files
                .iter()
                .find(|f| f.path == node.path)
                .map(|f| f.internal.join(", "))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "none".to_string());

            let prompt = codewiki_prompts::render(
                "Write wiki documentation for \"{{ title }}\", which documents the source file {{ path }}.\n\nRepository listing:\n{{ catalogue }}\n\nDirect dependencies of {{ path }}: {{ related }}\n\nUse the file tool to read {{ path }} or any of its dependencies if needed. Wrap the result in <response_file></response_file> tags.",
                &vars(&[
                    ("title", node.title.as_str()),
                    ("path", node.path.as_str()),
                    ("catalogue", catalogue),
                    ("related", related.as_str()),
                ]),
            )?;
            let response = kernel.invoke_prompt_with_tools(&prompt, None, codewiki_plugins::FunctionChoiceBehavior::Auto, context).await?;
            let body = parse::extract_tagged(&response.content, "response_file");

            context.record_file(node.path.clone());
            let mut sources = vec![ContentSource { content_id: node.id.clone(), file_path: node.path.clone() }];
            if let Some(file) = graph.files.iter().find(|f| f.path == node.path) {
                for dep in &file.internal {
                    sources.push(ContentSource { content_id: node.id.clone(), file_path: dep.clone() });
                }
            }

            let mut content = node.clone();
            content.content = body;
            self.store.write_content(&content, &sources)?;
        }
        Ok(())
    }

    // --- Stage 8: changelog -------------------------------------------------

    async fn generate_changelog(&self, document_id: &str, repo: &Repository, readme: &str, kernel: &Kernel) -> Result<()> {
        let local_path = repo.local_path.clone();
        let log = tokio::task::spawn_blocking(move || git_log(&local_path, 20))
            .await
            .map_err(|err| OrchestratorError::Llm(anyhow::anyhow!(err)))??;

        if log.trim().is_empty() {
            self.store.write_commit_records(document_id, &[])?;
            return Ok(());
        }

        let prompt = codewiki_prompts::render(
            "Summarize this commit history into a changelog.\n\nREADME:\n{{ readme }}\nRepository: {{ git_repository }}\nBranch: {{ branch }}\nCommits:\n{{ commits }}\n\nReturn a JSON array inside <changelog></changelog> tags: [{\"date\": ISO-8601, \"title\": string, \"description\": string}, ...].",
            &vars(&[
                ("readme", readme),
                ("git_repository", repo.git_url.as_deref().unwrap_or(&repo.git_name)),
                ("branch", repo.branch.as_str()),
                ("commits", log.as_str()),
            ]),
        )?;
        let response = kernel.invoke_prompt(&prompt, None).await?;
        let raw = parse::extract_tagged(&response.content, "changelog");

        let entries: Vec<CommitEntry> = serde_json::from_str(&raw).unwrap_or_default();
        let records: Vec<CommitRecord> = entries
            .into_iter()
            .map(|entry| CommitRecord { document_id: document_id.to_string(), date: entry.date, title: entry.title, description: entry.description })
            .collect();
        self.store.write_commit_records(document_id, &records)?;
        Ok(())
    }
}

/// Picks the [`FileTreeNode`](codewiki_scanner::FileTreeNode) encoding named by
/// `CodeWikiGenConfig::catalogue_format`, falling back to the compact listing for an
/// unrecognized value rather than failing the stage over a config typo.
fn encode_tree(tree: &codewiki_scanner::FileTreeNode, format: &str) -> String {
    match format {
        "json" => codewiki_scanner::to_compact_json(tree),
        "pathlist" => codewiki_scanner::to_path_list(tree),
        "unix" => codewiki_scanner::to_unix_tree(tree),
        _ => codewiki_scanner::to_compact_string(tree),
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn strip_thinking(text: &str) -> String {
    let lower = text.to_lowercase();
    match (lower.find("<thinking>"), lower.find("</thinking>")) {
        (Some(start), Some(end)) if end > start => {
            let before = &text[..start];
            let after = &text[end + "</thinking>".len()..];
            format!("{before}{after}").trim().to_string()
        }
        _ => text.trim().to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct CatalogNode {
    title: String,
    path: Option<String>,
    #[serde(default)]
    children: Vec<CatalogNode>,
}

#[derive(Debug, Deserialize)]
struct CommitEntry {
    date: String,
    title: String,
    description: String,
}

/// Flattens the LLM's JSON catalogue tree into traversal-ordered [`Content`] rows;
/// `order` is assigned per sibling group so siblings replay in the order the tree gave them.
fn flatten_catalog(document_id: &str, node: &CatalogNode, parent_id: Option<String>, next_order: &mut i32, out: &mut Vec<Content>) {
    let id = Uuid::new_v4().to_string();
    let order = *next_order;
    *next_order += 1;

    out.push(Content {
        id: id.clone(),
        document_id: document_id.to_string(),
        parent_id,
        order,
        title: node.title.clone(),
        path: node.path.clone().unwrap_or_default(),
        content: String::new(),
    });

    let mut child_order = 0;
    for child in &node.children {
        flatten_catalog(document_id, child, Some(id.clone()), &mut child_order, out);
    }
}

fn git_log(local_path: &str, limit: usize) -> Result<String> {
    let output = std::process::Command::new("git")
        .args(["log", &format!("-n{limit}"), "--date=iso-strict", "--pretty=format:%an|%ad|%s%n%b%n---"])
        .current_dir(local_path)
        .output()?;
    if !output.status.success() {
        return Ok(String::new());
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codewiki_core::model::WikiDocument;
    use codewiki_llm::{ChatMessage, ChatResponse, LLMProvider};
    use codewiki_storage::StoragePool;
    use tokio::sync::mpsc;

    struct EchoProvider;

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn chat(&self, _messages: Vec<ChatMessage>, model: Option<String>) -> anyhow::Result<ChatResponse> {
            Ok(ChatResponse {
                content: "An unremarkable fixture repository with no notable history.".to_string(),
                provider: "echo".to_string(),
                model: model.unwrap_or_default(),
                response_model: None,
                response_id: None,
                tokens_used: None,
                input_tokens: None,
                output_tokens: None,
                finish_reason: None,
                duration_ms: 0,
            })
        }

        async fn stream_chat(&self, _messages: Vec<ChatMessage>, _model: Option<String>) -> anyhow::Result<mpsc::Receiver<String>> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        fn list_models(&self) -> Vec<String> {
            vec!["test-model".to_string()]
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn fixture(repo_dir: &Path) -> (Orchestrator, WikiDocument) {
        std::fs::write(repo_dir.join("README.md"), "# Fixture\n\nA tiny repository used for orchestrator tests.").unwrap();
        std::fs::create_dir_all(repo_dir.join("src")).unwrap();
        std::fs::write(repo_dir.join("src").join("main.rs"), "fn main() {}").unwrap();

        let mut config = CodewikiConfig::default();
        config.llm.default_provider = "echo".to_string();
        config.llm.default_model = "test-model".to_string();

        let providers = LLMProviderManager::new(&config.llm).expect("empty manager construction should not fail");
        providers.register_provider("echo", Arc::new(EchoProvider) as Arc<dyn LLMProvider>);

        let store = WikiStore::new(StoragePool::in_memory().unwrap());
        let repo = Repository {
            id: "repo-1".to_string(),
            git_url: None,
            git_name: "fixture".to_string(),
            branch: "main".to_string(),
            local_path: repo_dir.to_string_lossy().to_string(),
        };
        store.register_repository(&repo).unwrap();
        let document = WikiDocument::new("doc-1", repo.id.clone());
        store.create_document(&document).unwrap();

        (Orchestrator::new(store, Arc::new(providers), config), document)
    }

    #[tokio::test]
    async fn runs_every_stage_and_marks_completed() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, document) = fixture(dir.path());

        orchestrator.run(&document.id).await.unwrap();

        let saved = orchestrator.store().get_document(&document.id).unwrap();
        assert_eq!(saved.status, PipelineStatus::Completed);
        assert_eq!(saved.progress, PipelineStage::Changelog.checkpoint());
        assert!(saved.readme.contains("Fixture"));
    }

    #[tokio::test]
    async fn local_readme_file_wins_over_the_llm() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, document) = fixture(dir.path());

        orchestrator.run(&document.id).await.unwrap();

        let saved = orchestrator.store().get_document(&document.id).unwrap();
        assert!(!saved.readme.contains("unremarkable fixture"));
    }

    #[tokio::test]
    async fn skips_changelog_records_without_a_git_url() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, document) = fixture(dir.path());

        orchestrator.run(&document.id).await.unwrap();

        let records = orchestrator.store().list_commit_records(&document.id).unwrap();
        assert!(records.is_empty());
    }
}

