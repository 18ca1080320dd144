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
use std::sync::Arc;

use anyhow::bail;

use dubbuild::compiler::detect_compiler;
use dubbuild::generate::GeneratorSettings;
use dubbuild::project::Project;
use dubutil::common::DUB_JSON;
use dubutil::settings::BuildMode;
use dubutil::vfs::RealFilesystem;

mod build;
mod clean;
mod describe;
mod run;
mod version;

pub use build::run_build;
pub use clean::run_clean;
pub use describe::run_describe;
pub use run::run_run;
pub use version::run_version;

pub use build::BuildSubcommand;
pub use clean::CleanSubcommand;
pub use describe::DescribeSubcommand;
pub use run::RunSubcommand;

#[derive(Debug, clap::Parser)]
#[clap(
    name = "dub",
    version,
    about = "Package-aware build tool for the D language"
)]
pub struct DubCli {
    #[clap(flatten)]
    pub flags: UniversalFlags,

    #[clap(subcommand)]
    pub subcommand: DubSubcommands,
}

#[derive(Debug, clap::Subcommand)]
pub enum DubSubcommands {
    Build(BuildSubcommand),
    Run(RunSubcommand),
    Clean(CleanSubcommand),
    Describe(DescribeSubcommand),
    /// Print the version of dub
    Version,
}

#[derive(Debug, clap::Parser)]
pub struct UniversalFlags {
    /// Enable verbose output
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Only print warnings and errors
    #[clap(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Operate on the package found in the given directory
    #[clap(long, global = true)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, clap::Parser)]
pub struct BuildFlags {
    /// Build the given configuration of the root package
    #[clap(long, short = 'c')]
    pub config: Option<String>,

    /// Build type (debug, release, unittest, cov, syntax, ...)
    #[clap(long = "build", short = 'b', default_value = "debug")]
    pub build_type: String,

    /// Compiler binary to build with
    #[clap(long, default_value = "dmd")]
    pub compiler: String,

    /// How compiler invocations are split over the target's sources
    #[clap(long, value_enum, default_value_t = BuildMode::Separate)]
    pub build_mode: BuildMode,

    /// Ignore the artifact cache and rebuild
    #[clap(long, short = 'f')]
    pub force: bool,

    /// Fold autodetected library dependencies into one compilation unit
    #[clap(long)]
    pub combined: bool,

    /// Compile single-file-mode sources across all cores
    #[clap(long)]
    pub parallel: bool,

    /// Build in a temporary directory instead of the package tree
    #[clap(long)]
    pub temp_build: bool,

    /// Hand the build to the rdmd recipe-script driver
    #[clap(long)]
    pub rdmd: bool,

    /// Build directly into the target path, bypassing the cache
    #[clap(long)]
    pub direct: bool,
}

/// Walks upward from the working directory until a recipe file shows up.
pub fn find_package_root(flags: &UniversalFlags) -> anyhow::Result<PathBuf> {
    if let Some(root) = &flags.root {
        return Ok(dunce::canonicalize(root)?);
    }
    let mut dir = dunce::canonicalize(std::env::current_dir()?)?;
    loop {
        if dir.join(DUB_JSON).exists() {
            log::debug!("using package root `{}`", dir.display());
            return Ok(dir);
        }
        if !dir.pop() {
            bail!("no `{}` found in the current directory or above", DUB_JSON);
        }
    }
}

pub struct LoadedProject {
    pub project: Project,
    pub settings: GeneratorSettings,
}

/// Probes the compiler, loads the resolved project, and assembles the
/// generator settings for one invocation.
pub fn prepare_project(
    flags: &UniversalFlags,
    build_flags: &BuildFlags,
    run: bool,
    run_args: Vec<String>,
) -> anyhow::Result<LoadedProject> {
    let root_dir = find_package_root(flags)?;
    let compiler = detect_compiler(&build_flags.compiler)?;
    let platform = compiler.determine_platform();
    let project = Project::load(&root_dir, &platform, build_flags.config.as_deref())?;
    let settings = GeneratorSettings {
        config: project.config_of(&project.root.name).to_string(),
        build_type: build_flags.build_type.clone(),
        build_mode: build_flags.build_mode,
        platform,
        compiler,
        fs: Arc::new(RealFilesystem),
        combined: build_flags.combined,
        force: build_flags.force,
        direct: build_flags.direct,
        rdmd: build_flags.rdmd,
        temp_build: build_flags.temp_build,
        parallel_build: build_flags.parallel,
        run,
        run_args,
    };
    Ok(LoadedProject { project, settings })
}
