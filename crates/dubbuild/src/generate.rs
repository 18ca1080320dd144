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

//! The generator contract shared by the build executor and the
//! target-description emitter, plus the driver that runs one of them
//! against a project.

use std::sync::Arc;

use indexmap::IndexMap;

use dubutil::platform::BuildPlatform;
use dubutil::settings::BuildMode;
use dubutil::vfs::Filesystem;

use crate::commands::run_generate_commands;
use crate::compiler::Compiler;
use crate::graph::{build_target_map, TargetInfo};
use crate::project::Project;

/// Everything one generator run needs; there is no global configuration.
#[derive(Clone)]
pub struct GeneratorSettings {
    /// The root package's configuration name.
    pub config: String,
    pub build_type: String,
    pub build_mode: BuildMode,
    pub platform: BuildPlatform,
    pub compiler: Arc<dyn Compiler>,
    pub fs: Arc<dyn Filesystem>,
    pub combined: bool,
    pub force: bool,
    /// Skip the artifact cache and build in place.
    pub direct: bool,
    pub rdmd: bool,
    pub temp_build: bool,
    pub parallel_build: bool,
    pub run: bool,
    pub run_args: Vec<String>,
}

pub trait ProjectGenerator {
    fn generate_targets(
        &mut self,
        settings: &GeneratorSettings,
        targets: &IndexMap<String, TargetInfo>,
    ) -> anyhow::Result<()>;

    fn perform_post_generate_actions(
        &mut self,
        _settings: &GeneratorSettings,
        _targets: &IndexMap<String, TargetInfo>,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Runs the full pipeline: pre-generate commands, target-map construction,
/// the generator itself, then the post-generate phase.
pub fn run_generator(
    project: &Project,
    generator: &mut dyn ProjectGenerator,
    settings: &GeneratorSettings,
) -> anyhow::Result<()> {
    run_phase_commands(project, settings, CommandPhase::Pre)?;
    let targets = build_target_map(project, settings)?;
    generator.generate_targets(settings, &targets)?;
    run_phase_commands(project, settings, CommandPhase::Post)?;
    generator.perform_post_generate_actions(settings, &targets)?;
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CommandPhase {
    Pre,
    Post,
}

fn run_phase_commands(
    project: &Project,
    settings: &GeneratorSettings,
    phase: CommandPhase,
) -> anyhow::Result<()> {
    for pack in &project.packages {
        let config = project.config_of(&pack.name);
        let bs = pack.config_build_settings(config)?;
        let commands = match phase {
            CommandPhase::Pre => &bs.pre_generate_commands,
            CommandPhase::Post => &bs.post_generate_commands,
        };
        if commands.is_empty() {
            continue;
        }
        let kind = match phase {
            CommandPhase::Pre => "pre-generate",
            CommandPhase::Post => "post-generate",
        };
        run_generate_commands(kind, settings, pack, &project.root, &bs, commands)?;
    }
    Ok(())
}
