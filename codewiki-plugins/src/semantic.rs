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

//! Semantic plugins: a directory pairing `config.json` (prompt argument
//! declarations) with `skprompt.txt` (the Jinja-style template body), loaded as a
//! single callable function.

use crate::error::{PluginError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptParameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticFunctionConfig {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_parameters: Vec<PromptParameter>,
}

#[derive(Debug, Clone)]
pub struct SemanticFunction {
    pub name: String,
    pub config: SemanticFunctionConfig,
    pub template: String,
}

impl SemanticFunction {
    /// Loads `<dir>/config.json` + `<dir>/skprompt.txt`, naming the function after
    /// the directory's final path component.
    pub fn load(dir: &Path) -> Result<Self> {
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PluginError::InvalidDefinition(dir.display().to_string(), "not a named directory".to_string()))?
            .to_string();

        let config_path = dir.join("config.json");
        let prompt_path = dir.join("skprompt.txt");

        let config_text = std::fs::read_to_string(&config_path)
            .map_err(|e| PluginError::InvalidDefinition(name.clone(), format!("missing config.json: {e}")))?;
        let config: SemanticFunctionConfig = serde_json::from_str(&config_text)
            .map_err(|e| PluginError::InvalidDefinition(name.clone(), format!("invalid config.json: {e}")))?;
        let template = std::fs::read_to_string(&prompt_path)
            .map_err(|e| PluginError::InvalidDefinition(name.clone(), format!("missing skprompt.txt: {e}")))?;

        Ok(Self { name, config, template })
    }

    pub fn render(&self, args: &HashMap<String, String>) -> Result<String> {
        let mut merged = HashMap::new();
        for param in &self.config.input_parameters {
            if let Some(default) = &param.default_value {
                merged.insert(param.name.clone(), default.clone());
            }
        }
        merged.extend(args.clone());
        for param in &self.config.input_parameters {
            if param.required && !merged.contains_key(&param.name) {
                return Err(PluginError::InvalidDefinition(
                    self.name.clone(),
                    format!("missing required parameter: {}", param.name),
                ));
            }
        }
        codewiki_prompts::render(&self.template, &merged)
            .map_err(|e| PluginError::InvalidDefinition(self.name.clone(), e.to_string()))
    }
}

/// Scans `<root>` for immediate subdirectories containing both `config.json` and
/// `skprompt.txt`, loading each as a named semantic function.
pub fn load_plugin_directory(root: &Path) -> Result<Vec<SemanticFunction>> {
    let mut functions = Vec::new();
    if !root.exists() {
        return Ok(functions);
    }
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if path.join("config.json").exists() && path.join("skprompt.txt").exists() {
            functions.push(SemanticFunction::load(&path)?);
        }
    }
    Ok(functions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_renders_semantic_function() {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("Overview");
        std::fs::create_dir(&plugin_dir).unwrap();
        std::fs::write(
            plugin_dir.join("config.json"),
            r#"{"description": "summarize", "input_parameters": [{"name": "title", "required": true}]}"#,
        )
        .unwrap();
        std::fs::write(plugin_dir.join("skprompt.txt"), "Summarize {{ title }}").unwrap();

        let functions = load_plugin_directory(dir.path()).unwrap();
        assert_eq!(functions.len(), 1);
        let mut args = HashMap::new();
        args.insert("title".to_string(), "codewiki".to_string());
        assert_eq!(functions[0].render(&args).unwrap(), "Summarize codewiki");
    }

    #[test]
    fn missing_required_parameter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("Overview");
        std::fs::create_dir(&plugin_dir).unwrap();
        std::fs::write(
            plugin_dir.join("config.json"),
            r#"{"input_parameters": [{"name": "title", "required": true}]}"#,
        )
        .unwrap();
        std::fs::write(plugin_dir.join("skprompt.txt"), "{{ title }}").unwrap();

        let functions = load_plugin_directory(dir.path()).unwrap();
        assert!(functions[0].render(&HashMap::new()).is_err());
    }
}
