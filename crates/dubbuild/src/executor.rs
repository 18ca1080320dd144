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

//! The build driver: walks targets in dependency order, probes the
//! per-package artifact cache, and drives compiler/linker invocations in
//! one of the build modes.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use indexmap::IndexMap;

use dubutil::common::BUILD_CACHE_DIR;
use dubutil::path::shorten_path;
use dubutil::platform::is_linker_file;
use dubutil::settings::{BuildMode, BuildOptions, BuildSettings, TargetType};
use dubutil::vfs::Filesystem;

use crate::build_id::compute_build_id;
use crate::commands::run_build_commands;
use crate::compiler::{InvokeResult, PrepareFlags};
use crate::freshness::is_up_to_date;
use crate::generate::{GeneratorSettings, ProjectGenerator};
use crate::graph::TargetInfo;
use crate::project::Project;
use crate::rdmd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Linked in from the artifact cache; post-build commands are skipped.
    Cached,
    Fresh,
}

pub struct BuildExecutor {
    project: Project,
    fs: Arc<dyn Filesystem>,
    /// Files created outside any package, deleted in reverse order on drop.
    temp_files: Vec<PathBuf>,
    /// Artifact path per finished target, consumed by dependents' links.
    artifacts: IndexMap<String, PathBuf>,
}

impl BuildExecutor {
    pub fn new(project: Project, fs: Arc<dyn Filesystem>) -> BuildExecutor {
        BuildExecutor {
            project,
            fs,
            temp_files: Vec::new(),
            artifacts: IndexMap::new(),
        }
    }

    /// The root target's artifact, once built; what `--run` executes.
    pub fn root_artifact(&self) -> Option<&Path> {
        self.artifacts.get(&self.project.root.name).map(|p| p.as_path())
    }

    fn build_target_rec(
        &mut self,
        settings: &GeneratorSettings,
        targets: &IndexMap<String, TargetInfo>,
        name: &str,
        visited: &mut HashSet<String>,
    ) -> anyhow::Result<()> {
        if !visited.insert(name.to_string()) {
            return Ok(());
        }
        let target = &targets[name];
        for dep in &target.dependencies {
            self.build_target_rec(settings, targets, dep, visited)?;
        }
        self.build_target(settings, target)
    }

    fn build_target(
        &mut self,
        settings: &GeneratorSettings,
        target: &TargetInfo,
    ) -> anyhow::Result<()> {
        let mut bs = target.build_settings.clone();

        // shorten command lines where the current directory allows it
        let cwd = self.fs.getcwd()?;
        for list in [
            &mut bs.source_files,
            &mut bs.import_paths,
            &mut bs.string_import_paths,
        ] {
            for p in list.iter_mut() {
                *p = shorten_path(p, &cwd);
            }
        }

        // artifacts of already-built static-library children become link
        // inputs and freshness inputs of this target
        let mut dep_artifacts: Vec<PathBuf> = Vec::new();
        for dep in &target.link_dependencies {
            if let Some(artifact) = self.artifacts.get(dep) {
                let as_string = artifact.display().to_string();
                if !bs.source_files.contains(&as_string) {
                    bs.source_files.push(as_string);
                }
                dep_artifacts.push(artifact.clone());
            }
        }

        let produces_binary = bs.target_type.has_output()
            && !bs.options.contains(BuildOptions::SYNTAX_ONLY);

        let (outcome, artifact) = if settings.rdmd && produces_binary {
            // rdmd always builds fresh, so the pre-build hook fires here;
            // the cached path runs it only on an actual rebuild
            if !bs.pre_build_commands.is_empty() {
                run_build_commands(
                    settings,
                    &target.pack,
                    &self.project.root,
                    &bs,
                    &bs.pre_build_commands,
                )?;
            }
            let artifact =
                rdmd::build_with_rdmd(settings, target, bs.clone(), &mut self.temp_files)?;
            (BuildOutcome::Fresh, Some(artifact))
        } else if settings.direct || bs.options.contains(BuildOptions::SYNTAX_ONLY) {
            self.direct_build(settings, target, bs.clone())?
        } else {
            self.cached_build(settings, target, bs.clone(), &dep_artifacts)?
        };

        if outcome != BuildOutcome::Cached && !bs.post_build_commands.is_empty() {
            run_build_commands(
                settings,
                &target.pack,
                &self.project.root,
                &bs,
                &bs.post_build_commands,
            )?;
        }

        if let Some(artifact) = artifact {
            self.artifacts.insert(target.pack.name.clone(), artifact);
        }
        Ok(())
    }

    fn cached_build(
        &mut self,
        settings: &GeneratorSettings,
        target: &TargetInfo,
        bs: BuildSettings,
        dep_artifacts: &[PathBuf],
    ) -> anyhow::Result<(BuildOutcome, Option<PathBuf>)> {
        let fs = self.fs.clone();
        let build_id = compute_build_id(&target.config, &bs, settings);
        let cache_dir = target.pack.path.join(BUILD_CACHE_DIR).join(&build_id);
        let artifact_name = settings.compiler.artifact_name(
            bs.target_type,
            &bs.target_name,
            &settings.platform,
        );
        let cached_artifact = cache_dir.join(&artifact_name);
        let user_dir = target_output_dir(target, &bs);
        let user_artifact = user_dir.join(&artifact_name);

        if !settings.force
            && is_up_to_date(
                fs.as_ref(),
                &cached_artifact,
                &bs,
                &target.pack,
                &target.packages,
                dep_artifacts,
                &self.project.root,
                fs.now(),
            )
        {
            println!(
                "{} {} {}: target for configuration `{}` is up to date",
                "Finished.".bright_green().bold(),
                target.pack.name,
                target.pack.version,
                target.config
            );
            fs.mkdir_p(&user_dir)?;
            fs.hard_link_file(&cached_artifact, &user_artifact)?;
            return Ok((BuildOutcome::Cached, Some(user_artifact)));
        }

        if settings.temp_build || !cache_writable(fs.as_ref(), &target.pack.path) {
            if !settings.temp_build {
                log::warn!(
                    "{}: build cache of `{}` is not writable, falling back to direct build",
                    "Warning".yellow().bold(),
                    target.pack.name
                );
            }
            return self.direct_build(settings, target, bs);
        }

        println!(
            "{} {} {}: building configuration `{}`",
            "Building".bright_green().bold(),
            target.pack.name,
            target.pack.version,
            target.config
        );
        fs.mkdir_p(&cache_dir)?;
        if !bs.pre_build_commands.is_empty() {
            run_build_commands(
                settings,
                &target.pack,
                &self.project.root,
                &bs,
                &bs.pre_build_commands,
            )?;
        }

        let artifact = self.build_with_compiler(settings, &bs, &cache_dir)?;
        self.copy_files(&bs, &user_dir, false);
        match artifact {
            Some(built) => {
                fs.mkdir_p(&user_dir)?;
                fs.hard_link_file(&built, &user_artifact)?;
                Ok((BuildOutcome::Fresh, Some(user_artifact)))
            }
            None => Ok((BuildOutcome::Fresh, None)),
        }
    }

    fn direct_build(
        &mut self,
        settings: &GeneratorSettings,
        target: &TargetInfo,
        bs: BuildSettings,
    ) -> anyhow::Result<(BuildOutcome, Option<PathBuf>)> {
        let fs = self.fs.clone();
        let mut target_dir = target_output_dir(target, &bs);
        let mut temp_build = false;
        let writable = if fs.exists_directory(&target_dir) {
            fs.is_writable_dir(&target_dir)
        } else {
            fs.is_writable_dir(&target.pack.path)
        };
        if settings.temp_build || (settings.run && !writable) {
            target_dir = dubutil::dub_dir::dub_tmp_dir()?
                .join(format!("{:08x}", rand::random::<u32>()));
            temp_build = true;
        }
        fs.mkdir_p(&target_dir)?;

        println!(
            "{} {} {}: building configuration `{}`",
            "Building".bright_green().bold(),
            target.pack.name,
            target.pack.version,
            target.config
        );
        if !bs.pre_build_commands.is_empty() {
            run_build_commands(
                settings,
                &target.pack,
                &self.project.root,
                &bs,
                &bs.pre_build_commands,
            )?;
        }

        let artifact = self.build_with_compiler(settings, &bs, &target_dir)?;
        self.copy_files(&bs, &target_dir, temp_build);
        if temp_build {
            if let Some(a) = &artifact {
                self.temp_files.push(a.clone());
            }
        }
        Ok((BuildOutcome::Fresh, artifact))
    }

    /// One target's compiler/linker invocations. On failure the partially
    /// produced artifact is deleted before the error propagates.
    fn build_with_compiler(
        &mut self,
        settings: &GeneratorSettings,
        bs: &BuildSettings,
        target_dir: &Path,
    ) -> anyhow::Result<Option<PathBuf>> {
        let compiler = settings.compiler.clone();
        let platform = &settings.platform;
        let produces_binary = bs.target_type.has_output()
            && !bs.options.contains(BuildOptions::SYNTAX_ONLY);
        let artifact = produces_binary.then(|| {
            target_dir.join(compiler.artifact_name(bs.target_type, &bs.target_name, platform))
        });

        let (linker_sources, compile_sources): (Vec<String>, Vec<String>) = bs
            .source_files
            .iter()
            .cloned()
            .partition(|f| is_linker_file(platform, f));

        let single_file = settings.build_mode == BuildMode::SingleFile
            && bs.target_type != TargetType::StaticLibrary
            && produces_binary;
        let separate = !single_file
            && settings.build_mode == BuildMode::Separate
            && compiler.separate_linking()
            && produces_binary
            && matches!(
                bs.target_type,
                TargetType::Executable | TargetType::DynamicLibrary
            );

        let result = if single_file {
            self.build_single_file(
                settings,
                bs,
                target_dir,
                artifact.as_deref().unwrap(),
                &compile_sources,
                &linker_sources,
            )
        } else if separate {
            self.build_separate(
                settings,
                bs,
                target_dir,
                artifact.as_deref().unwrap(),
                &compile_sources,
                &linker_sources,
            )
        } else {
            self.build_all_at_once(settings, bs, artifact.as_deref(), &compile_sources)
        };

        if let Err(e) = result {
            if let Some(a) = &artifact {
                let _ = self.fs.remove_file(a, true);
            }
            return Err(e);
        }
        Ok(artifact)
    }

    /// Compile every source to its own object (possibly in parallel), then
    /// link.
    fn build_single_file(
        &self,
        settings: &GeneratorSettings,
        bs: &BuildSettings,
        target_dir: &Path,
        artifact: &Path,
        compile_sources: &[String],
        linker_sources: &[String],
    ) -> anyhow::Result<()> {
        let cwd = self.fs.getcwd()?;
        let compiler = settings.compiler.clone();
        let platform = settings.platform.clone();
        let suffix = compiler.object_suffix(&platform);

        let compile_one = |src: &String| -> anyhow::Result<String> {
            let obj = target_dir.join(path_to_obj_name(&cwd, src, suffix));
            let mut cbs = bs.clone();
            cbs.source_files = vec![src.clone()];
            cbs.lflags.clear();
            compiler.prepare_build_settings(&mut cbs, &platform, PrepareFlags::SOURCE_FILES);
            compiler.set_target(&mut cbs, &platform, artifact, Some(&obj));
            compiler.invoke(&cbs, &platform, &mut print_output)?;
            Ok(obj.display().to_string())
        };

        let objects: Vec<String> = if settings.parallel_build {
            use rayon::prelude::*;
            compile_sources
                .par_iter()
                .map(compile_one)
                .collect::<anyhow::Result<Vec<_>>>()?
        } else {
            compile_sources
                .iter()
                .map(compile_one)
                .collect::<anyhow::Result<Vec<_>>>()?
        };

        let mut lbs = bs.clone();
        lbs.source_files.clear();
        compiler.prepare_build_settings(&mut lbs, &platform, PrepareFlags::LFLAGS);
        compiler.set_target(&mut lbs, &platform, artifact, None);
        let mut link_inputs = objects;
        link_inputs.extend(linker_sources.iter().cloned());
        compiler.invoke_linker(&lbs, &platform, &link_inputs, &mut print_output)
    }

    /// Compile all sources into one temporary object, then link it.
    fn build_separate(
        &self,
        settings: &GeneratorSettings,
        bs: &BuildSettings,
        target_dir: &Path,
        artifact: &Path,
        compile_sources: &[String],
        linker_sources: &[String],
    ) -> anyhow::Result<()> {
        let compiler = settings.compiler.clone();
        let platform = &settings.platform;
        let temp_obj = target_dir.join(format!(
            "{}.{}",
            bs.target_name,
            compiler.object_suffix(platform)
        ));

        let mut cbs = bs.clone();
        cbs.source_files = compile_sources.to_vec();
        cbs.lflags.clear();
        compiler.prepare_build_settings(&mut cbs, platform, PrepareFlags::SOURCE_FILES);
        compiler.set_target(&mut cbs, platform, artifact, Some(&temp_obj));
        compiler.invoke(&cbs, platform, &mut print_output)?;

        let mut lbs = bs.clone();
        lbs.source_files.clear();
        compiler.prepare_build_settings(&mut lbs, platform, PrepareFlags::LFLAGS);
        compiler.set_target(&mut lbs, platform, artifact, None);
        let mut link_inputs = vec![temp_obj.display().to_string()];
        link_inputs.extend(linker_sources.iter().cloned());
        compiler.invoke_linker(&lbs, platform, &link_inputs, &mut print_output)
    }

    /// One compiler invocation producing the final artifact (or just the
    /// syntax check).
    fn build_all_at_once(
        &self,
        settings: &GeneratorSettings,
        bs: &BuildSettings,
        artifact: Option<&Path>,
        compile_sources: &[String],
    ) -> anyhow::Result<()> {
        let compiler = settings.compiler.clone();
        let platform = &settings.platform;
        let mut cbs = bs.clone();
        if bs.target_type == TargetType::StaticLibrary {
            // archive members come from the compiler, never the linker list
            cbs.source_files = compile_sources.to_vec();
        }
        compiler.prepare_build_settings(&mut cbs, platform, PrepareFlags::ALL);
        if let Some(artifact) = artifact {
            compiler.set_target(&mut cbs, platform, artifact, None);
        }
        compiler.invoke(&cbs, platform, &mut print_output)
    }

    fn copy_files(&mut self, bs: &BuildSettings, dest_dir: &Path, temp_build: bool) {
        for file in &bs.copy_files {
            let src = Path::new(file);
            let Some(name) = src.file_name() else {
                continue;
            };
            let dest = dest_dir.join(name);
            match self
                .fs
                .mkdir_p(dest_dir)
                .and_then(|_| self.fs.copy_file(src, &dest))
            {
                Ok(()) => {
                    if temp_build {
                        self.temp_files.push(dest);
                    }
                }
                Err(e) => log::warn!(
                    "{}: failed to copy `{}`: {:#}",
                    "Warning".yellow().bold(),
                    file,
                    e
                ),
            }
        }
    }
}

impl ProjectGenerator for BuildExecutor {
    fn generate_targets(
        &mut self,
        settings: &GeneratorSettings,
        targets: &IndexMap<String, TargetInfo>,
    ) -> anyhow::Result<()> {
        let root = self.project.root.name.clone();
        let mut visited = HashSet::new();
        self.build_target_rec(settings, targets, &root, &mut visited)
            .with_context(|| format!("failed to build package `{}`", root))
    }
}

impl Drop for BuildExecutor {
    fn drop(&mut self) {
        for file in self.temp_files.drain(..).rev() {
            if let Err(e) = self.fs.remove_file(&file, true) {
                log::debug!("failed to clean up `{}`: {:#}", file.display(), e);
            }
        }
    }
}

fn print_output(result: &InvokeResult) {
    if !result.output.is_empty() {
        print!("{}", result.output);
    }
}

/// Where the user-visible artifact of a target goes.
fn target_output_dir(target: &TargetInfo, bs: &BuildSettings) -> PathBuf {
    if bs.target_path.is_empty() {
        target.pack.path.clone()
    } else {
        let p = Path::new(&bs.target_path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            target.pack.path.join(p)
        }
    }
}

fn cache_writable(fs: &dyn Filesystem, pack_path: &Path) -> bool {
    let dub_dir = pack_path.join(".dub");
    if fs.exists_directory(&dub_dir) {
        fs.is_writable_dir(&dub_dir)
    } else {
        fs.is_writable_dir(pack_path)
    }
}

/// Object-file name for one source: the lexically normalized absolute path
/// with separators turned into dots.
fn path_to_obj_name(cwd: &Path, source: &str, obj_suffix: &str) -> String {
    let src = Path::new(source);
    let abs = if src.is_absolute() {
        src.to_path_buf()
    } else {
        cwd.join(src)
    };
    let mut parts: Vec<String> = Vec::new();
    for comp in abs.components() {
        match comp {
            Component::Normal(c) => parts.push(c.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop();
            }
            _ => {}
        }
    }
    format!("{}.{}", parts.join("."), obj_suffix)
}
