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

//! Shared compressor for brace-delimited, semicolon-terminated languages (C, C++, C#,
//! Java, JavaScript/TypeScript, PHP, Swift): the generic baseline already handles their
//! shape well, since its structural-prefix list and call-site stripping were modeled on
//! this family of languages first.

use crate::compressors::generic::compress_generic;
use crate::Compressor;

pub struct CFamilyCompressor;

impl Compressor for CFamilyCompressor {
    fn compress(&self, content: &str) -> String {
        compress_generic(content)
    }

    fn name(&self) -> &'static str {
        "c_family"
    }
}
