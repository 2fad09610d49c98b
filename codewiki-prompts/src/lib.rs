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

//! The prompt template engine: named Jinja-style templates (`{{ var }}`, `{% if %}`,
//! block-trimming) loaded from a directory and rendered against a variable map.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("template render error: {0}")]
    Render(String),
    #[error("io error loading templates: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PromptError>;

/// An in-memory catalogue of named prompt templates, loaded once at startup and
/// rendered on demand. Templates are plain `.jinja`/`.txt` files named after the
/// template; subdirectories are not recursed into here (semantic function directories,
/// which pair a template with a `config.json`, are loaded by the plugin crate).
pub struct TemplateCatalogue {
    templates: RwLock<HashMap<String, String>>,
    env: minijinja::Environment<'static>,
}

impl Default for TemplateCatalogue {
    fn default() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            env: minijinja::Environment::new(),
        }
    }
}

impl TemplateCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.jinja` and `*.txt` file directly under `dir` as a named template
    /// (the file stem becomes the template name).
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(0);
        }
        let mut count = 0;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_template = matches!(path.extension().and_then(|e| e.to_str()), Some("jinja") | Some("txt"));
            if !is_template {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            let content = std::fs::read_to_string(&path)?;
            self.insert(name, content);
            count += 1;
        }
        Ok(count)
    }

    pub fn insert(&self, name: impl Into<String>, template: impl Into<String>) {
        self.templates.write().insert(name.into(), template.into());
    }

    pub fn get(&self, name: &str) -> Result<String> {
        self.templates
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PromptError::NotFound(name.to_string()))
    }

    /// Renders the named template against `variables`.
    pub fn render(&self, name: &str, variables: &HashMap<String, String>) -> Result<String> {
        let source = self.get(name)?;
        render_template(&self.env, &source, variables)
    }
}

/// Renders a raw Jinja-style template string directly, without going through the
/// catalogue — used for one-off prompts assembled by a pipeline stage.
pub fn render_template(
    env: &minijinja::Environment<'static>,
    source: &str,
    variables: &HashMap<String, String>,
) -> Result<String> {
    env.render_str(source, variables).map_err(|e| PromptError::Render(e.to_string()))
}

/// Convenience entry point for call sites that don't hold onto a shared environment.
pub fn render(source: &str, variables: &HashMap<String, String>) -> Result<String> {
    let env = minijinja::Environment::new();
    render_template(&env, source, variables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_variables() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "codewiki".to_string());
        let out = render("hello {{ name }}", &vars).unwrap();
        assert_eq!(out, "hello codewiki");
    }

    #[test]
    fn renders_conditionals() {
        let mut vars = HashMap::new();
        vars.insert("branch".to_string(), "main".to_string());
        let out = render(
            "{% if branch == \"main\" %}default branch{% else %}other{% endif %}",
            &vars,
        )
        .unwrap();
        assert_eq!(out, "default branch");
    }

    #[test]
    fn missing_template_is_not_found() {
        let catalogue = TemplateCatalogue::new();
        let err = catalogue.get("Overview").unwrap_err();
        assert!(matches!(err, PromptError::NotFound(_)));
    }

    #[test]
    fn loads_templates_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Overview.jinja"), "# {{ title }}").unwrap();
        let catalogue = TemplateCatalogue::new();
        let loaded = catalogue.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, 1);
        let mut vars = HashMap::new();
        vars.insert("title".to_string(), "Repo".to_string());
        assert_eq!(catalogue.render("Overview", &vars).unwrap(), "# Repo");
    }
}
