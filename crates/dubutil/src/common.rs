// dub-rs: a package-aware build orchestrator for the D language.
// Copyright (C) 2026 The dub-rs contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

pub const DUB_JSON: &str = "dub.json";
pub const SELECTIONS_JSON: &str = "dub.selections.json";

/// Per-package artifact cache, relative to the package root.
pub const BUILD_CACHE_DIR: &str = ".dub/build";

pub const DEFAULT_SOURCE_DIRS: &[&str] = &["source", "src"];

pub const D_FILE_EXT: &str = "d";

/// Replaces every character that cannot appear in a D identifier with `_`,
/// for `Have_<pkg>` version identifiers.
pub fn sanitize_identifier(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

pub fn get_dub_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}

/// Appends entries of `src` not already present in `dst`, preserving order.
pub fn append_unique(dst: &mut Vec<String>, src: &[String]) {
    for item in src {
        if !dst.contains(item) {
            dst.push(item.clone());
        }
    }
}

#[test]
fn test_sanitize_identifier() {
    assert_eq!(sanitize_identifier("vibe-d"), "vibe_d");
    assert_eq!(sanitize_identifier("pkg:sub"), "pkg_sub");
    assert_eq!(sanitize_identifier("plain_1"), "plain_1");
}
