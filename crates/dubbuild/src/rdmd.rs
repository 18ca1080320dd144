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

//! Recipe-script builds: the external `rdmd` driver pulls in imported
//! modules transitively, so only the main source is handed over.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context};

use dubutil::common::D_FILE_EXT;
use dubutil::settings::BuildSettings;

use crate::compiler::PrepareFlags;
use crate::generate::GeneratorSettings;
use crate::graph::TargetInfo;

const RDMD_BINARY: &str = "rdmd";

/// Builds one target through `rdmd --build-only`. Returns the artifact
/// path; files placed outside the package land in `temp_files` for the
/// scope-exit cleanup.
pub fn build_with_rdmd(
    settings: &GeneratorSettings,
    target: &TargetInfo,
    mut bs: BuildSettings,
    temp_files: &mut Vec<PathBuf>,
) -> anyhow::Result<PathBuf> {
    let pack = &target.pack;
    let main_source = resolve_main_source(settings, &bs, pack.path.as_path(), &bs.target_name)?;

    // rdmd follows imports itself; listed D sources would be compiled twice
    bs.source_files
        .retain(|f| !f.ends_with(&format!(".{}", D_FILE_EXT)));

    let artifact_name = settings.compiler.artifact_name(
        bs.target_type,
        &bs.target_name,
        &settings.platform,
    );
    let mut target_dir = if bs.target_path.is_empty() {
        pack.path.clone()
    } else {
        pack.path.join(&bs.target_path)
    };
    let mut artifact_name = artifact_name;
    let mut temp_build = false;
    if settings.run && !settings.fs.is_writable_dir(&target_dir) {
        target_dir = dubutil::dub_dir::dub_tmp_dir()?;
        artifact_name = format!("{:08x}-{}", rand::random::<u32>(), artifact_name);
        temp_build = true;
    }
    settings.fs.mkdir_p(&target_dir)?;
    let artifact = target_dir.join(&artifact_name);

    settings
        .compiler
        .prepare_build_settings(&mut bs, &settings.platform, PrepareFlags::empty());

    let mut cmd = Command::new(RDMD_BINARY);
    cmd.arg("--build-only")
        .arg(format!(
            "--compiler={}",
            settings.platform.compiler_binary.display()
        ))
        .args(settings.compiler.out_file_flags(&artifact))
        .args(&bs.dflags)
        .arg(&main_source)
        .current_dir(&pack.path)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    log::debug!("invoking rdmd for `{}`", main_source.display());
    let status = cmd
        .status()
        .context("failed to spawn `rdmd`; is it installed alongside the compiler?")?;
    if !status.success() {
        bail!(
            "rdmd build of `{}` failed with code {}",
            pack.name,
            status.code().unwrap_or(-1)
        );
    }

    if temp_build {
        temp_files.push(artifact.clone());
        for file in &bs.copy_files {
            if let Some(name) = Path::new(file).file_name() {
                temp_files.push(target_dir.join(name));
            }
        }
    }
    Ok(artifact)
}

/// An explicit main source wins; otherwise the well-known entry locations
/// are probed in order.
fn resolve_main_source(
    settings: &GeneratorSettings,
    bs: &BuildSettings,
    pack_path: &Path,
    target_name: &str,
) -> anyhow::Result<PathBuf> {
    if !bs.main_source_file.is_empty() {
        return Ok(PathBuf::from(&bs.main_source_file));
    }
    let candidates = [
        format!("source/app.{}", D_FILE_EXT),
        format!("src/app.{}", D_FILE_EXT),
        format!("source/{}.{}", target_name, D_FILE_EXT),
        format!("src/{}.{}", target_name, D_FILE_EXT),
    ];
    for candidate in &candidates {
        let p = pack_path.join(candidate);
        if settings.fs.exists_file(&p) {
            return Ok(p);
        }
    }
    bail!(
        "no main source file found for `{}`; expected one of {}",
        target_name,
        candidates.join(", ")
    )
}
