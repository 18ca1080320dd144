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

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::common::{DEFAULT_SOURCE_DIRS, DUB_JSON, D_FILE_EXT, SELECTIONS_JSON};
use crate::platform::BuildPlatform;
use crate::recipe::{read_recipe, Configuration, Dependency, Recipe};
use crate::settings::BuildSettings;

/// Which configuration each package builds with, externally supplied.
pub type ChosenConfigs = IndexMap<String, String>;

/// One loaded package: identity `(name, version)` plus its recipe. Frozen
/// after load; the generator shares packages across targets by reference.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub version: Version,
    pub path: PathBuf,
    pub recipe_path: PathBuf,
    pub recipe: Recipe,
}

impl Package {
    /// Loads the package rooted at `dir` from its `dub.json`.
    pub fn load(dir: &Path) -> anyhow::Result<Package> {
        let recipe_path = dir.join(DUB_JSON);
        if !recipe_path.exists() {
            bail!("`{}` does not exist", recipe_path.display());
        }
        let recipe = read_recipe(&recipe_path)?;
        Ok(Package::from_recipe(recipe, dir, &recipe_path))
    }

    pub fn from_recipe(recipe: Recipe, dir: &Path, recipe_path: &Path) -> Package {
        Package {
            name: recipe.name.clone(),
            version: recipe
                .version
                .clone()
                .unwrap_or_else(|| Version::new(0, 0, 0)),
            path: dir.to_path_buf(),
            recipe_path: recipe_path.to_path_buf(),
            recipe,
        }
    }

    /// Materializes an anonymous sub-package (`parent:sub`). Sub-packages
    /// share the root package's path and recipe file.
    pub fn sub_package(&self, sub: &Recipe) -> Package {
        let mut recipe = sub.clone();
        recipe.name = format!("{}:{}", self.base_name(), sub.name);
        Package {
            name: recipe.name.clone(),
            version: self.version.clone(),
            path: self.path.clone(),
            recipe_path: self.recipe_path.clone(),
            recipe,
        }
    }

    /// The part of the name before any `:` sub-package separator.
    pub fn base_name(&self) -> &str {
        self.name.split(':').next().unwrap_or(&self.name)
    }

    pub fn recipe_file(&self) -> &Path {
        &self.recipe_path
    }

    pub fn configuration(&self, name: &str) -> Option<&Configuration> {
        self.recipe.configurations.iter().find(|c| c.name == name)
    }

    /// The first configuration whose platform list matches, or the empty
    /// configuration (base settings only) when the recipe declares none.
    pub fn default_configuration(&self, platform: &BuildPlatform) -> String {
        self.recipe
            .configurations
            .iter()
            .find(|c| {
                c.platforms.is_empty()
                    || c.platforms.iter().any(|p| platform.platform.contains(p))
            })
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    /// Dependencies visible under `config`: the recipe-global table plus the
    /// configuration's own additions.
    pub fn config_dependencies(&self, config: &str) -> IndexMap<String, Dependency> {
        let mut deps = self.recipe.dependencies.clone();
        if let Some(c) = self.configuration(config) {
            for (name, dep) in &c.dependencies {
                deps.insert(name.clone(), dep.clone());
            }
        }
        deps
    }

    /// Resolves the merged build settings of one configuration: global block
    /// plus configuration block, source scan applied, all paths absolute.
    pub fn config_build_settings(&self, config: &str) -> anyhow::Result<BuildSettings> {
        let mut bs = self.recipe.settings.build.clone();
        let mut source_paths = self.recipe.settings.source_paths.clone();
        if let Some(c) = self.configuration(config) {
            let cs = &c.settings.build;
            if cs.target_type != crate::settings::TargetType::Autodetect {
                bs.target_type = cs.target_type;
            }
            if !cs.target_name.is_empty() {
                bs.target_name = cs.target_name.clone();
            }
            if !cs.target_path.is_empty() {
                bs.target_path = cs.target_path.clone();
            }
            if !cs.main_source_file.is_empty() {
                bs.main_source_file = cs.main_source_file.clone();
            }
            bs.add(cs);
            source_paths.extend(c.settings.source_paths.iter().cloned());
        }

        if bs.target_name.is_empty() {
            bs.target_name = self.name.replace(':', "_");
        }
        if source_paths.is_empty() {
            for dir in DEFAULT_SOURCE_DIRS {
                if self.path.join(dir).is_dir() {
                    source_paths.push((*dir).to_string());
                }
            }
        }
        if bs.import_paths.is_empty() {
            bs.import_paths = source_paths.clone();
        }

        for dir in &source_paths {
            let root = self.path.join(dir);
            if !root.is_dir() {
                continue;
            }
            for entry in walkdir::WalkDir::new(&root).sort_by_file_name() {
                let entry = entry
                    .with_context(|| format!("failed to scan sources under `{}`", root.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let is_d = entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == D_FILE_EXT);
                if is_d {
                    let p = entry.path().display().to_string();
                    if !bs.source_files.contains(&p) {
                        bs.source_files.push(p);
                    }
                }
            }
        }

        self.absolutize(&mut bs);
        Ok(bs)
    }

    fn absolutize(&self, bs: &mut BuildSettings) {
        let abs = |s: &mut String| {
            if !s.is_empty() && Path::new(s.as_str()).is_relative() {
                *s = self.path.join(s.as_str()).display().to_string();
            }
        };
        for list in [
            &mut bs.source_files,
            &mut bs.import_files,
            &mut bs.string_import_files,
            &mut bs.import_paths,
            &mut bs.string_import_paths,
            &mut bs.copy_files,
            &mut bs.extra_dependency_files,
        ] {
            for item in list.iter_mut() {
                abs(item);
            }
        }
        abs(&mut bs.main_source_file);
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectionsJson {
    #[serde(rename = "fileVersion")]
    pub file_version: i32,
    pub versions: IndexMap<String, SelectedVersionJson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectedVersionJson {
    Version(String),
    Path { path: String },
}

/// Reads `dub.selections.json` from the root package directory, if present.
/// The core never writes this file; version selection happens upstream.
pub fn read_selections(root_dir: &Path) -> anyhow::Result<Option<SelectionsJson>> {
    let path = root_dir.join(SELECTIONS_JSON);
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(&path)?;
    let reader = BufReader::new(file);
    let j: SelectionsJson = serde_json_lenient::from_reader(reader)
        .with_context(|| format!("failed to parse `{}`", path.display()))?;
    Ok(Some(j))
}

pub fn selections_file(root_dir: &Path) -> PathBuf {
    root_dir.join(SELECTIONS_JSON)
}
