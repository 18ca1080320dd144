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

use std::path::{Path, PathBuf};

use serde::Serialize;

/// The tuple a compiler invocation is resolved against: OS identifiers,
/// architecture, and the identity of the compiler driving the build.
#[derive(Debug, Clone, Serialize, Default)]
pub struct BuildPlatform {
    pub platform: Vec<String>,
    pub architecture: Vec<String>,
    pub compiler: String,
    pub compiler_binary: PathBuf,
    pub frontend_version: i32,
}

impl BuildPlatform {
    pub fn host() -> BuildPlatform {
        let platform = if cfg!(windows) {
            vec!["windows".to_string()]
        } else if cfg!(target_os = "macos") {
            vec!["osx".to_string(), "posix".to_string()]
        } else if cfg!(target_os = "linux") {
            vec!["linux".to_string(), "posix".to_string()]
        } else {
            vec!["posix".to_string()]
        };
        BuildPlatform {
            platform,
            architecture: vec![std::env::consts::ARCH.to_string()],
            compiler: String::new(),
            compiler_binary: PathBuf::new(),
            frontend_version: 0,
        }
    }

    pub fn is_windows(&self) -> bool {
        self.platform.iter().any(|p| p == "windows")
    }

    pub fn platform_string(&self) -> String {
        self.platform.join(".")
    }

    pub fn architecture_string(&self) -> String {
        self.architecture.join(".")
    }
}

/// Whether a source-list entry goes to the linker rather than the compiler.
/// `.d` files are always compiler input, whatever the platform suffix rules
/// say.
pub fn is_linker_file(platform: &BuildPlatform, file: &str) -> bool {
    let ext = Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if ext.eq_ignore_ascii_case(crate::common::D_FILE_EXT) {
        return false;
    }
    if platform.is_windows() {
        matches!(ext, "obj" | "lib" | "res")
    } else {
        matches!(ext, "o" | "a" | "so" | "dylib")
    }
}
