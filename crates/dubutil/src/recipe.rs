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

//! `dub.json` recipe documents. The JSON layer is kept separate from the
//! runtime [`Recipe`] so lenient parsing and name→bitset resolution stay in
//! one place.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::settings::{BuildOptions, BuildRequirements, BuildSettings, TargetType};

#[derive(Debug, thiserror::Error)]
#[error("failed to load `{}`", path.display())]
pub struct RecipeFormatError {
    path: Box<Path>,
    #[source]
    kind: RecipeFormatErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum RecipeFormatErrorKind {
    #[error("I/O error")]
    IO(#[from] std::io::Error),
    #[error("Parse error")]
    Parse(#[from] serde_json_lenient::Error),
    #[error("invalid version")]
    Version(#[from] semver::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecipeJson {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, DependencyJson>,

    #[serde(flatten)]
    pub settings: SettingsJson,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configurations: Vec<ConfigurationJson>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_packages: Vec<RecipeJson>,

    /// Fields not covered by the info above, which should be left as-is.
    #[serde(flatten)]
    pub ext: serde_json_lenient::Value,
}

/// The settings block shared by the recipe root and each configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<TargetType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub import_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub string_import_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub debug_versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dflags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lflags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub copy_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_dependency_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_generate_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_generate_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_build_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_build_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyJson {
    Simple(String),
    Detailed {
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(default)]
        optional: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationJson {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, DependencyJson>,
    #[serde(flatten)]
    pub settings: SettingsJson,
}

#[derive(Debug, Clone, Default)]
pub struct Recipe {
    pub name: String,
    pub version: Option<Version>,
    pub dependencies: IndexMap<String, Dependency>,
    pub settings: SettingsTemplate,
    pub configurations: Vec<Configuration>,
    pub sub_packages: Vec<Recipe>,
}

#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub name: String,
    pub platforms: Vec<String>,
    pub dependencies: IndexMap<String, Dependency>,
    pub settings: SettingsTemplate,
}

#[derive(Debug, Clone, Default)]
pub struct Dependency {
    pub version_spec: String,
    pub path: Option<String>,
    pub optional: bool,
}

/// A settings block before path absolutization and source scanning; the
/// [`source_paths`](Self::source_paths) only matter until the package loader
/// has expanded them.
#[derive(Debug, Clone, Default)]
pub struct SettingsTemplate {
    pub build: BuildSettings,
    pub source_paths: Vec<String>,
}

impl From<DependencyJson> for Dependency {
    fn from(j: DependencyJson) -> Dependency {
        match j {
            DependencyJson::Simple(version_spec) => Dependency {
                version_spec,
                path: None,
                optional: false,
            },
            DependencyJson::Detailed {
                version,
                path,
                optional,
            } => Dependency {
                version_spec: version.unwrap_or_else(|| "*".into()),
                path,
                optional,
            },
        }
    }
}

impl From<SettingsJson> for SettingsTemplate {
    fn from(j: SettingsJson) -> SettingsTemplate {
        let mut build = BuildSettings {
            target_type: j.target_type.unwrap_or_default(),
            target_name: j.target_name.unwrap_or_default(),
            target_path: j.target_path.unwrap_or_default(),
            working_directory: j.working_directory.unwrap_or_default(),
            main_source_file: j.main_source_file.unwrap_or_default(),
            source_files: j.source_files,
            import_paths: j.import_paths,
            string_import_paths: j.string_import_paths,
            versions: j.versions,
            debug_versions: j.debug_versions,
            dflags: j.dflags,
            lflags: j.lflags,
            libs: j.libs,
            copy_files: j.copy_files,
            extra_dependency_files: j.extra_dependency_files,
            pre_generate_commands: j.pre_generate_commands,
            post_generate_commands: j.post_generate_commands,
            pre_build_commands: j.pre_build_commands,
            post_build_commands: j.post_build_commands,
            ..Default::default()
        };
        for name in &j.build_options {
            match BuildOptions::from_dub_name(name) {
                Some(opt) => build.options |= opt,
                None => log::warn!("ignoring unknown build option `{}`", name),
            }
        }
        for name in &j.build_requirements {
            match BuildRequirements::from_dub_name(name) {
                Some(req) => build.requirements |= req,
                None => log::warn!("ignoring unknown build requirement `{}`", name),
            }
        }
        SettingsTemplate {
            build,
            source_paths: j.source_paths,
        }
    }
}

impl TryFrom<RecipeJson> for Recipe {
    type Error = RecipeFormatErrorKind;

    fn try_from(j: RecipeJson) -> Result<Recipe, RecipeFormatErrorKind> {
        let version = match &j.version {
            None => None,
            Some(v) => Some(Version::parse(v).map_err(RecipeFormatErrorKind::Version)?),
        };
        let configurations = j
            .configurations
            .into_iter()
            .map(|c| Configuration {
                name: c.name,
                platforms: c.platforms,
                dependencies: c.dependencies.into_iter().map(|(k, v)| (k, v.into())).collect(),
                settings: c.settings.into(),
            })
            .collect();
        let sub_packages = j
            .sub_packages
            .into_iter()
            .map(Recipe::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Recipe {
            name: j.name,
            version,
            dependencies: j.dependencies.into_iter().map(|(k, v)| (k, v.into())).collect(),
            settings: j.settings.into(),
            configurations,
            sub_packages,
        })
    }
}

pub fn read_recipe(path: &Path) -> Result<Recipe, RecipeFormatError> {
    let wrap_io = |e: std::io::Error| RecipeFormatError {
        path: path.into(),
        kind: RecipeFormatErrorKind::IO(e),
    };
    let file = File::open(path).map_err(wrap_io)?;
    let reader = BufReader::new(file);
    let j: RecipeJson = serde_json_lenient::from_reader(reader).map_err(|e| RecipeFormatError {
        path: path.into(),
        kind: RecipeFormatErrorKind::Parse(e),
    })?;
    Recipe::try_from(j).map_err(|kind| RecipeFormatError {
        path: path.into(),
        kind,
    })
}
