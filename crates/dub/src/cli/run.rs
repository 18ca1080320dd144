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

use std::process::{Command, Stdio};

use anyhow::{bail, Context};

use dubbuild::executor::BuildExecutor;
use dubbuild::generate::run_generator;

use super::{prepare_project, BuildFlags, UniversalFlags};

/// Build and execute the current package
#[derive(Debug, clap::Parser)]
pub struct RunSubcommand {
    #[clap(flatten)]
    pub build_flags: BuildFlags,

    /// Arguments passed through to the program
    #[clap(last = true)]
    pub args: Vec<String>,
}

pub fn run_run(cli: &UniversalFlags, cmd: &RunSubcommand) -> anyhow::Result<i32> {
    let loaded = prepare_project(cli, &cmd.build_flags, true, cmd.args.clone())?;
    let mut executor = BuildExecutor::new(loaded.project.clone(), loaded.settings.fs.clone());
    run_generator(&loaded.project, &mut executor, &loaded.settings)?;

    let Some(artifact) = executor.root_artifact() else {
        bail!(
            "`{}` did not produce an executable to run",
            loaded.project.root.name
        );
    };
    let artifact = artifact.to_path_buf();
    if cli.verbose {
        eprintln!("{} {}", artifact.display(), cmd.args.join(" "));
    }
    let status = Command::new(&artifact)
        .args(&cmd.args)
        .current_dir(&loaded.project.root.path)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("failed to execute `{}`", artifact.display()))?;
    // the program's own exit code is the command's exit code
    Ok(status.code().unwrap_or(-1))
}
