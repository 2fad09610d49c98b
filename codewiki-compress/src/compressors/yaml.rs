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

//! YAML is keys-and-structure, same as markup: keep it verbatim aside from collapsing
//! consecutive blank lines, since every line is already "structural".

use crate::compressors::markup::MarkupCompressor;
use crate::Compressor;

pub struct YamlCompressor;

impl Compressor for YamlCompressor {
    fn compress(&self, content: &str) -> String {
        MarkupCompressor.compress(content)
    }

    fn name(&self) -> &'static str {
        "yaml"
    }
}
