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

//! User-supplied pre/post commands: the environment they observe and the
//! recursion guard that keeps nested invocations from looping.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context;

use dubutil::package::Package;
use dubutil::settings::BuildSettings;

use crate::generate::GeneratorSettings;

/// Comma-separated list of packages whose generate-phase commands already
/// ran in this process tree.
pub const PACKAGES_USED_VAR: &str = "DUB_PACKAGES_USED";

#[derive(Debug, thiserror::Error)]
#[error("command `{command}` exited with code {status}")]
pub struct CommandError {
    pub command: String,
    pub status: i32,
}

fn bool_var(value: bool) -> String {
    if value {
        "TRUE".to_string()
    } else {
        String::new()
    }
}

/// The full environment contract for user commands.
pub fn command_environment(
    settings: &GeneratorSettings,
    bs: &BuildSettings,
    pack: &Package,
    root: &Package,
) -> Vec<(String, String)> {
    let platform = &settings.platform;
    let mut env: Vec<(String, String)> = vec![
        ("DFLAGS".into(), bs.dflags.join(" ")),
        ("LFLAGS".into(), bs.lflags.join(" ")),
        ("VERSIONS".into(), bs.versions.join(" ")),
        ("LIBS".into(), bs.libs.join(" ")),
        ("IMPORT_PATHS".into(), bs.import_paths.join(" ")),
        (
            "STRING_IMPORT_PATHS".into(),
            bs.string_import_paths.join(" "),
        ),
        ("DC".into(), platform.compiler_binary.display().to_string()),
        ("DC_BASE".into(), platform.compiler.clone()),
        ("D_FRONTEND_VER".into(), platform.frontend_version.to_string()),
        ("DUB_PLATFORM".into(), platform.platform_string()),
        ("DUB_ARCH".into(), platform.architecture_string()),
        ("DUB_TARGET_TYPE".into(), bs.target_type.to_string()),
        ("DUB_TARGET_PATH".into(), bs.target_path.clone()),
        ("DUB_TARGET_NAME".into(), bs.target_name.clone()),
        ("DUB_WORKING_DIRECTORY".into(), bs.working_directory.clone()),
        ("DUB_MAIN_SOURCE_FILE".into(), bs.main_source_file.clone()),
        ("DUB_CONFIG".into(), settings.config.clone()),
        ("DUB_BUILD_TYPE".into(), settings.build_type.clone()),
        ("DUB_BUILD_MODE".into(), settings.build_mode.to_string()),
        ("DUB_PACKAGE".into(), pack.name.clone()),
        ("DUB_PACKAGE_DIR".into(), pack.path.display().to_string()),
        ("DUB_ROOT_PACKAGE".into(), root.name.clone()),
        ("DUB_ROOT_PACKAGE_DIR".into(), root.path.display().to_string()),
        ("DUB_COMBINED".into(), bool_var(settings.combined)),
        ("DUB_RUN".into(), bool_var(settings.run)),
        ("DUB_FORCE".into(), bool_var(settings.force)),
        ("DUB_DIRECT".into(), bool_var(settings.direct)),
        ("DUB_RDMD".into(), bool_var(settings.rdmd)),
        ("DUB_TEMP_BUILD".into(), bool_var(settings.temp_build)),
        (
            "DUB_PARALLEL_BUILD".into(),
            bool_var(settings.parallel_build),
        ),
    ];
    let run_args = shlex::try_join(settings.run_args.iter().map(|s| s.as_str()))
        .unwrap_or_default();
    env.push(("DUB_RUN_ARGS".into(), run_args));
    env
}

/// Spawns each command through the platform shell with stdio inherited.
/// The first non-zero exit aborts.
pub fn run_commands(
    commands: &[String],
    env: &[(String, String)],
    cwd: &Path,
) -> anyhow::Result<()> {
    for command in commands {
        log::debug!("running command `{}` in `{}`", command, cwd.display());
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };
        cmd.current_dir(cwd)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for (k, v) in env {
            cmd.env(k, v);
        }
        let status = cmd
            .status()
            .with_context(|| format!("failed to spawn command `{}`", command))?;
        if !status.success() {
            return Err(CommandError {
                command: command.clone(),
                status: status.code().unwrap_or(-1),
            }
            .into());
        }
    }
    Ok(())
}

/// Runs a target's generate-phase commands unless a surrounding invocation
/// already processed this package. The guard is read from the inherited
/// environment, compared against the package name, and extended for the
/// spawned process.
pub fn run_generate_commands(
    kind: &str,
    settings: &GeneratorSettings,
    pack: &Package,
    root: &Package,
    bs: &BuildSettings,
    commands: &[String],
) -> anyhow::Result<()> {
    let used = std::env::var(PACKAGES_USED_VAR).unwrap_or_default();
    if used.split(',').any(|p| p == pack.name) {
        log::debug!(
            "skipping {} commands of `{}`: already processed by a parent invocation",
            kind,
            pack.name
        );
        return Ok(());
    }
    let extended = if used.is_empty() {
        pack.name.clone()
    } else {
        format!("{},{}", used, pack.name)
    };

    let mut env = command_environment(settings, bs, pack, root);
    env.push((PACKAGES_USED_VAR.into(), extended));
    let cwd = working_directory(bs, pack);
    run_commands(commands, &env, &cwd)
}

/// Build-phase commands carry the same environment but no recursion guard;
/// they are bounded by the build itself.
pub fn run_build_commands(
    settings: &GeneratorSettings,
    pack: &Package,
    root: &Package,
    bs: &BuildSettings,
    commands: &[String],
) -> anyhow::Result<()> {
    let env = command_environment(settings, bs, pack, root);
    let cwd = working_directory(bs, pack);
    run_commands(commands, &env, &cwd)
}

fn working_directory(bs: &BuildSettings, pack: &Package) -> std::path::PathBuf {
    if bs.working_directory.is_empty() {
        pack.path.clone()
    } else {
        let wd = Path::new(&bs.working_directory);
        if wd.is_relative() {
            pack.path.join(wd)
        } else {
            wd.to_path_buf()
        }
    }
}
