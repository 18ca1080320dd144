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

//! Turns a resolved project into a map of binary targets. Settings flow
//! both ways along dependency edges: version identifiers and inheritable
//! options travel down, link inputs and import paths travel up.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::bail;
use colored::Colorize;
use indexmap::IndexMap;

use dubutil::common::sanitize_identifier;
use dubutil::package::Package;
use dubutil::settings::{build_type_options, BuildOptions, BuildSettings, TargetType};

use crate::generate::GeneratorSettings;
use crate::project::Project;

/// One binary target: the packages compiled into it, its configuration and
/// merged settings, and its dependency edges. `dependencies` lists every
/// transitive binary dependency; `link_dependencies` the subset whose
/// artifacts are linked in.
#[derive(Debug, Clone)]
pub struct TargetInfo {
    pub pack: Arc<Package>,
    pub packages: Vec<Arc<Package>>,
    pub config: String,
    pub build_settings: BuildSettings,
    pub dependencies: Vec<String>,
    pub link_dependencies: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("dependency `{dependency}` of `{dependent}` is missing from the target map")]
pub struct GraphConsistencyError {
    pub dependent: String,
    pub dependency: String,
}

struct RawTarget {
    packages: Vec<String>,
    dependencies: Vec<String>,
    link_dependencies: Vec<String>,
}

struct GraphBuilder<'a> {
    project: &'a Project,
    settings: &'a GeneratorSettings,
    bs: IndexMap<String, BuildSettings>,
    deps: IndexMap<String, Vec<String>>,
    has_output: IndexMap<String, bool>,
    targets: IndexMap<String, RawTarget>,
}

/// Runs all six pipeline phases and returns the final target map.
pub fn build_target_map(
    project: &Project,
    settings: &GeneratorSettings,
) -> anyhow::Result<IndexMap<String, TargetInfo>> {
    let mut b = GraphBuilder {
        project,
        settings,
        bs: IndexMap::new(),
        deps: IndexMap::new(),
        has_output: IndexMap::new(),
        targets: IndexMap::new(),
    };
    let root = project.root.name.clone();

    b.configure_packages()?;
    b.collect_dependencies(&root, &root, &mut HashSet::new())?;
    b.configure_dependencies(&root)?;
    b.define_have_dependencies();
    b.configure_dependents(&root, &mut HashSet::new())?;
    let root_files = b.string_import_files_of(&root);
    b.override_string_imports(&root, &mut HashSet::new(), root_files)?;
    b.finalize()
}

impl<'a> GraphBuilder<'a> {
    /// Phase 1: per-package normalization, no cross-package reads.
    fn configure_packages(&mut self) -> anyhow::Result<()> {
        let root_name = self.project.root.name.clone();
        for pack in &self.project.packages {
            let name = pack.name.clone();
            let is_root = name == root_name;
            let config = self.project.config_of(&name).to_string();
            let mut bs = pack.config_build_settings(&config)?;

            if is_root {
                bs.options |= build_type_options(&self.settings.build_type)?;
            }

            match bs.target_type {
                TargetType::Autodetect | TargetType::Library => {
                    bs.target_type = if is_root || !self.settings.combined {
                        TargetType::StaticLibrary
                    } else {
                        TargetType::SourceLibrary
                    };
                }
                TargetType::DynamicLibrary if !is_root => {
                    log::warn!(
                        "{}: dynamic library dependencies are not supported, building `{}` as a static library",
                        "Warning".yellow().bold(),
                        name
                    );
                    bs.target_type = TargetType::StaticLibrary;
                }
                _ => {}
            }

            if bs.source_files.is_empty()
                && !matches!(bs.target_type, TargetType::None | TargetType::SourceLibrary)
            {
                log::warn!(
                    "{}: package `{}` has no source files, no target will be built",
                    "Warning".yellow().bold(),
                    name
                );
                bs.target_type = TargetType::None;
            }

            if bs.target_type == TargetType::DynamicLibrary {
                bs.options |= BuildOptions::PIC;
            }

            if bs.target_type == TargetType::None {
                // only its dependencies are processed
                bs = BuildSettings {
                    target_type: TargetType::None,
                    ..Default::default()
                };
            }

            let mut deps = Vec::new();
            for (dep_name, dep) in pack.config_dependencies(&config) {
                let dep_name = if let Some(sub) = dep_name.strip_prefix(':') {
                    format!("{}:{}", pack.base_name(), sub)
                } else {
                    dep_name
                };
                if self.project.package(&dep_name).is_none() {
                    if dep.optional {
                        continue;
                    }
                    bail!(
                        "dependency `{}` of `{}` is not part of the resolved project",
                        dep_name,
                        name
                    );
                }
                if !deps.contains(&dep_name) {
                    deps.push(dep_name);
                }
            }

            let has_output = bs.target_type.has_output() || is_root;
            if has_output {
                self.targets.insert(
                    name.clone(),
                    RawTarget {
                        packages: vec![name.clone()],
                        dependencies: Vec::new(),
                        link_dependencies: Vec::new(),
                    },
                );
            }
            self.has_output.insert(name.clone(), has_output);
            self.deps.insert(name.clone(), deps);
            self.bs.insert(name, bs);
        }
        Ok(())
    }

    /// Phase 2: depth-first collection. No-output packages dissolve into
    /// the nearest enclosing target; every other package becomes an edge.
    /// The visited set only guards binary targets, so one source library
    /// can be embedded into any number of dependents; embeds are idempotent
    /// which also bounds recursion over no-output cycles.
    fn collect_dependencies(
        &mut self,
        pack_name: &str,
        target_name: &str,
        visited: &mut HashSet<String>,
    ) -> anyhow::Result<()> {
        for dep in self.deps[pack_name].clone() {
            if !self.has_output[&dep] {
                let target = self.targets.get_mut(target_name).unwrap();
                if !target.packages.contains(&dep) {
                    target.packages.push(dep.clone());
                    self.collect_dependencies(&dep, target_name, visited)?;
                }
                continue;
            }

            if self.bs[&dep].target_type == TargetType::Executable {
                // executables are built on their own, never linked into us
                continue;
            }

            let target = self.targets.get_mut(target_name).unwrap();
            if !target.dependencies.contains(&dep) {
                target.dependencies.push(dep.clone());
            }
            if !target.link_dependencies.contains(&dep) {
                target.link_dependencies.push(dep.clone());
            }

            if visited.insert(dep.clone()) {
                self.collect_dependencies(&dep, &dep, visited)?;
            }

            if self.bs[&dep].target_type == TargetType::StaticLibrary {
                // the dependent takes over linking the library's own deps;
                // merged behind it to keep the topological link order
                let child_links = self.targets[&dep].link_dependencies.clone();
                let target = self.targets.get_mut(target_name).unwrap();
                for link in child_links {
                    if !target.dependencies.contains(&link) {
                        target.dependencies.push(link.clone());
                    }
                    if !target.link_dependencies.contains(&link) {
                        target.link_dependencies.push(link);
                    }
                }
            }
        }
        Ok(())
    }

    /// Phase 3: down-inheritance. Deliberately unguarded: a shared
    /// dependency must inherit from every parent that uses it.
    fn configure_dependencies(&mut self, target_name: &str) -> anyhow::Result<()> {
        for dep in self.targets[target_name].dependencies.clone() {
            if !self.targets.contains_key(&dep) {
                return Err(GraphConsistencyError {
                    dependent: target_name.to_string(),
                    dependency: dep,
                }
                .into());
            }
            let parent = self.bs[target_name].clone();
            self.bs.get_mut(&dep).unwrap().merge_from_dependent(&parent);
            self.configure_dependencies(&dep)?;
        }
        Ok(())
    }

    /// Phase 4: `Have_<pkg>` version identifiers for embedded packages and
    /// direct dependencies.
    fn define_have_dependencies(&mut self) {
        for (name, target) in &self.targets {
            let mut names = target.packages.clone();
            for dep in &target.dependencies {
                if !names.contains(dep) {
                    names.push(dep.clone());
                }
            }
            let bs = self.bs.get_mut(name).unwrap();
            for n in names {
                bs.add_version(format!("Have_{}", sanitize_identifier(&n)));
            }
        }
    }

    /// Phase 5: up-inheritance. Embedded packages are merged into their
    /// target first, then each dependency contributes its exports.
    fn configure_dependents(
        &mut self,
        target_name: &str,
        visited: &mut HashSet<String>,
    ) -> anyhow::Result<()> {
        if !visited.insert(target_name.to_string()) {
            return Ok(());
        }

        let embedded: Vec<String> = self.targets[target_name].packages[1..].to_vec();
        for name in embedded {
            let child = self.bs[&name].clone();
            self.bs.get_mut(target_name).unwrap().add(&child);
        }

        for dep in self.targets[target_name].dependencies.clone() {
            if !self.targets.contains_key(&dep) {
                return Err(GraphConsistencyError {
                    dependent: target_name.to_string(),
                    dependency: dep,
                }
                .into());
            }
            self.configure_dependents(&dep, visited)?;
            let child = self.bs[&dep].clone();
            self.bs
                .get_mut(target_name)
                .unwrap()
                .merge_from_dependency(&child, &self.settings.platform);
        }
        Ok(())
    }

    /// The string-import files a target provides: those it lists, plus the
    /// files residing in its string-import directories.
    fn string_import_files_of(&self, target_name: &str) -> Vec<String> {
        let bs = &self.bs[target_name];
        let mut files = bs.string_import_files.clone();
        for dir in &bs.string_import_paths {
            let Ok(entries) = self.settings.fs.iterate_directory(Path::new(dir)) else {
                continue;
            };
            for entry in entries {
                if entry.is_dir {
                    continue;
                }
                let full = Path::new(dir).join(&entry.name).display().to_string();
                if !files.contains(&full) {
                    files.push(full);
                }
            }
        }
        files
    }

    /// Phase 6: ancestors override resource files referenced by their
    /// dependencies, matched by basename.
    fn override_string_imports(
        &mut self,
        target_name: &str,
        visited: &mut HashSet<String>,
        files: Vec<String>,
    ) -> anyhow::Result<()> {
        if !visited.insert(target_name.to_string()) {
            return Ok(());
        }
        for dep in self.targets[target_name].dependencies.clone() {
            let child = self.bs.get_mut(&dep).unwrap();
            let mut prepend_dirs: Vec<String> = Vec::new();
            for file in child.string_import_files.iter_mut() {
                let base = Path::new(file.as_str()).file_name();
                let overridden = files.iter().find(|candidate| {
                    *candidate != file && Path::new(candidate).file_name() == base
                });
                if let Some(replacement) = overridden {
                    if let Some(dir) = Path::new(replacement).parent() {
                        let dir = dir.display().to_string();
                        if !prepend_dirs.contains(&dir) {
                            prepend_dirs.push(dir);
                        }
                    }
                    *file = replacement.clone();
                }
            }
            for dir in prepend_dirs.into_iter().rev() {
                child.string_import_paths.insert(0, dir);
            }

            let mut cumulative = files.clone();
            for file in self.string_import_files_of(&dep) {
                let base = Path::new(&file).file_name().map(|b| b.to_owned());
                let shadowed = cumulative
                    .iter()
                    .any(|c| Path::new(c).file_name().map(|b| b.to_owned()) == base);
                if !shadowed {
                    cumulative.push(file);
                }
            }
            self.override_string_imports(&dep, visited, cumulative)?;
        }
        Ok(())
    }

    /// Prune no-output entries, enforce the root-artifact rule, and move
    /// every non-executable main source up into the root's inputs.
    fn finalize(mut self) -> anyhow::Result<IndexMap<String, TargetInfo>> {
        let root = self.project.root.name.clone();
        let root_bs = &self.bs[&root];
        if !root_bs.target_type.has_output()
            && !root_bs.options.contains(BuildOptions::SYNTAX_ONLY)
        {
            bail!(
                "configuration `{}` of package `{}` does not produce an artifact",
                self.project.config_of(&root),
                root
            );
        }

        let mut extra_mains: Vec<String> = Vec::new();
        for name in self.targets.keys().cloned().collect::<Vec<_>>() {
            let bs = self.bs.get_mut(&name).unwrap();
            if bs.target_type != TargetType::Executable && !bs.main_source_file.is_empty() {
                let main = std::mem::take(&mut bs.main_source_file);
                bs.source_files.retain(|f| f != &main);
                if !extra_mains.contains(&main) {
                    extra_mains.push(main);
                }
            }
        }
        {
            let root_bs = self.bs.get_mut(&root).unwrap();
            for main in extra_mains {
                if !root_bs.source_files.contains(&main) {
                    root_bs.source_files.push(main);
                }
            }
        }

        let mut out = IndexMap::new();
        for (name, raw) in self.targets {
            let pack = self.project.package(&name).unwrap().clone();
            let packages = raw
                .packages
                .iter()
                .map(|n| self.project.package(n).unwrap().clone())
                .collect();
            let build_settings = self.bs.shift_remove(&name).unwrap();
            out.insert(
                name.clone(),
                TargetInfo {
                    pack,
                    packages,
                    config: self.project.config_of(&name).to_string(),
                    build_settings,
                    dependencies: raw.dependencies,
                    link_dependencies: raw.link_dependencies,
                },
            );
        }
        Ok(out)
    }
}
