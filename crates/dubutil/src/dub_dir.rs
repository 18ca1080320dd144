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

use std::path::PathBuf;

use anyhow::Context;

pub fn home() -> PathBuf {
    if let Ok(dub_home) = std::env::var("DUB_HOME") {
        return PathBuf::from(dub_home);
    }

    let h = home::home_dir();
    if h.is_none() {
        eprintln!("Failed to get home directory");
        std::process::exit(1);
    }
    let hm = h.unwrap().join(".dub");
    if !hm.exists() {
        std::fs::create_dir_all(&hm).unwrap();
    }
    hm
}

/// Fetched packages live under `<home>/packages/<name>-<version>/<name>`.
pub fn packages() -> PathBuf {
    home().join("packages")
}

pub fn package_dir(name: &str, version: &str) -> PathBuf {
    packages().join(format!("{}-{}", name, version)).join(name)
}

pub fn dub_tmp_dir() -> anyhow::Result<PathBuf> {
    let p = std::env::temp_dir().join("dub");
    if !p.exists() {
        std::fs::create_dir_all(&p)
            .with_context(|| format!("failed to create tmp directory `{}`", p.display()))?;
    }
    Ok(p)
}

#[test]
fn test_package_dir_layout() {
    let p = package_dir("vibe-d", "0.9.7");
    let tail: PathBuf = p.iter().rev().take(3).collect::<Vec<_>>().into_iter().rev().collect();
    assert_eq!(tail, PathBuf::from("packages/vibe-d-0.9.7/vibe-d"));
}
