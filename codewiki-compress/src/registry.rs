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

use std::collections::HashMap;

use crate::compressors::{
    c_family::CFamilyCompressor, generic::GenericCompressor, go::GoCompressor,
    markup::MarkupCompressor, python::PythonCompressor, rust_lang::RustCompressor,
    yaml::YamlCompressor,
};
use crate::Compressor;

/// Every per-language compressor is just another entry in this registry; there is
/// nothing special about the generic fallback beyond being registered under more keys.
pub struct CompressorRegistry {
    compressors: HashMap<&'static str, Box<dyn Compressor>>,
}

impl Default for CompressorRegistry {
    fn default() -> Self {
        let mut compressors: HashMap<&'static str, Box<dyn Compressor>> = HashMap::new();
        compressors.insert("generic", Box::new(GenericCompressor));
        compressors.insert("c", Box::new(CFamilyCompressor));
        compressors.insert("cpp", Box::new(CFamilyCompressor));
        compressors.insert("csharp", Box::new(CFamilyCompressor));
        compressors.insert("java", Box::new(CFamilyCompressor));
        compressors.insert("javascript", Box::new(CFamilyCompressor));
        compressors.insert("swift", Box::new(CFamilyCompressor));
        compressors.insert("go", Box::new(GoCompressor));
        compressors.insert("rust", Box::new(RustCompressor));
        compressors.insert("python", Box::new(PythonCompressor));
        compressors.insert("ruby", Box::new(PythonCompressor));
        compressors.insert("php", Box::new(CFamilyCompressor));
        compressors.insert("shell", Box::new(GenericCompressor));
        compressors.insert("sql", Box::new(GenericCompressor));
        compressors.insert("markdown", Box::new(MarkupCompressor));
        compressors.insert("html", Box::new(MarkupCompressor));
        compressors.insert("xml", Box::new(MarkupCompressor));
        compressors.insert("css", Box::new(GenericCompressor));
        compressors.insert("yaml", Box::new(YamlCompressor));
        Self { compressors }
    }
}

impl CompressorRegistry {
    pub fn compress(&self, language: &str, content: &str) -> String {
        self.compressors
            .get(language)
            .unwrap_or_else(|| self.compressors.get("generic").expect("generic always registered"))
            .compress(content)
    }

    pub fn register(&mut self, language: &'static str, compressor: Box<dyn Compressor>) {
        self.compressors.insert(language, compressor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_generic_for_unknown_language() {
        let registry = CompressorRegistry::default();
        let out = registry.compress("cobol", "IDENTIFICATION DIVISION.\n");
        assert!(!out.is_empty());
    }
}
