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

//! Artifact freshness by mtime comparison. Purely lexical over the input
//! list; no content hashing, so a forced rebuild remains available to the
//! user.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use colored::Colorize;

use dubutil::package::{selections_file, Package};
use dubutil::settings::BuildSettings;
use dubutil::vfs::Filesystem;

/// Whether `artifact` is newer than every input of the target. A missing
/// input makes the target stale rather than erroring; the rebuild will
/// produce the real diagnostic.
#[allow(clippy::too_many_arguments)]
pub fn is_up_to_date(
    fs: &dyn Filesystem,
    artifact: &Path,
    bs: &BuildSettings,
    pack: &Package,
    packages: &[Arc<Package>],
    additional_dep_files: &[PathBuf],
    root_pack: &Package,
    now: SystemTime,
) -> bool {
    if !fs.exists_file(artifact) {
        log::debug!("artifact `{}` does not exist", artifact.display());
        return false;
    }
    let Ok(artifact_time) = fs.mtime(artifact) else {
        return false;
    };

    let mut inputs: Vec<PathBuf> = Vec::new();
    for list in [&bs.source_files, &bs.import_files, &bs.string_import_files] {
        inputs.extend(list.iter().map(PathBuf::from));
    }
    for p in packages {
        inputs.push(p.recipe_file().to_path_buf());
    }
    inputs.extend(additional_dep_files.iter().cloned());
    if pack.name == root_pack.name {
        let selections = selections_file(&root_pack.path);
        if fs.exists_file(&selections) {
            inputs.push(selections);
        }
    }

    for input in &inputs {
        if !fs.exists_file(input) {
            log::debug!("input `{}` is missing, triggering rebuild", input.display());
            return false;
        }
        let Ok(mtime) = fs.mtime(input) else {
            return false;
        };
        if mtime > now {
            log::warn!(
                "{}: file `{}` was modified in the future, assuming it is up to date",
                "Warning".yellow().bold(),
                input.display()
            );
            continue;
        }
        if mtime > artifact_time {
            log::debug!(
                "`{}` is newer than the artifact, triggering rebuild",
                input.display()
            );
            return false;
        }
    }
    true
}
