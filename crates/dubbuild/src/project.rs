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

//! The project front-end: a root package plus its pre-resolved dependency
//! set and the chosen configuration per package. Version *selection* happens
//! upstream; here missing packages are an error, never a fetch.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use indexmap::IndexMap;

use dubutil::dub_dir;
use dubutil::package::{read_selections, ChosenConfigs, Package, SelectedVersionJson};
use dubutil::platform::BuildPlatform;

#[derive(Clone, Debug)]
pub struct Project {
    pub root: Arc<Package>,
    /// Every package of the build, root first, dependencies in discovery
    /// order.
    pub packages: Vec<Arc<Package>>,
    pub chosen_configs: ChosenConfigs,
}

impl Project {
    pub fn package(&self, name: &str) -> Option<&Arc<Package>> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn config_of(&self, name: &str) -> &str {
        self.chosen_configs.get(name).map(|s| s.as_str()).unwrap_or("")
    }

    /// Loads the root package at `root_dir` and every package the
    /// selections file and path-based dependencies point at.
    pub fn load(
        root_dir: &Path,
        platform: &BuildPlatform,
        root_config: Option<&str>,
    ) -> anyhow::Result<Project> {
        let root = Arc::new(Package::load(root_dir)?);
        let selections = read_selections(root_dir)?;
        let selected = selections
            .map(|s| s.versions)
            .unwrap_or_default();

        let mut packages: Vec<Arc<Package>> = vec![root.clone()];
        let mut chosen_configs = ChosenConfigs::new();
        let root_cfg = root_config
            .map(|c| c.to_string())
            .unwrap_or_else(|| root.default_configuration(platform));
        if root.configuration(&root_cfg).is_none() && !root_cfg.is_empty() {
            bail!(
                "unknown configuration `{}` for package `{}`",
                root_cfg,
                root.name
            );
        }
        chosen_configs.insert(root.name.clone(), root_cfg);

        let mut loaded: IndexMap<String, Arc<Package>> = IndexMap::new();
        loaded.insert(root.name.clone(), root.clone());
        let mut queue: Vec<String> = vec![root.name.clone()];
        let mut seen: HashSet<String> = [root.name.clone()].into();

        while let Some(current) = queue.pop() {
            let pack = loaded[&current].clone();
            let config = chosen_configs
                .get(&current)
                .cloned()
                .unwrap_or_default();
            for (dep_name, dep) in pack.config_dependencies(&config) {
                let dep_name = qualify(&pack, &dep_name);
                if seen.contains(&dep_name) {
                    continue;
                }
                let loaded_dep = locate_package(&pack, &dep_name, dep.path.as_deref(), &selected);
                let dep_pack = match loaded_dep {
                    Ok(p) => p,
                    Err(e) if dep.optional => {
                        log::debug!("skipping optional dependency `{}`: {:#}", dep_name, e);
                        continue;
                    }
                    Err(e) => {
                        return Err(e.context(format!(
                            "failed to load dependency `{}` of `{}`",
                            dep_name, pack.name
                        )))
                    }
                };
                let dep_pack = Arc::new(dep_pack);
                chosen_configs.insert(
                    dep_name.clone(),
                    dep_pack.default_configuration(platform),
                );
                loaded.insert(dep_name.clone(), dep_pack.clone());
                packages.push(dep_pack);
                seen.insert(dep_name.clone());
                queue.push(dep_name);
            }
        }

        Ok(Project {
            root,
            packages,
            chosen_configs,
        })
    }
}

/// `:sub` references name a sub-package of the referencing package.
fn qualify(referrer: &Package, dep_name: &str) -> String {
    if let Some(sub) = dep_name.strip_prefix(':') {
        format!("{}:{}", referrer.base_name(), sub)
    } else {
        dep_name.to_string()
    }
}

fn locate_package(
    referrer: &Package,
    dep_name: &str,
    dep_path: Option<&str>,
    selected: &IndexMap<String, SelectedVersionJson>,
) -> anyhow::Result<Package> {
    let (base_name, sub_name) = match dep_name.split_once(':') {
        Some((b, s)) => (b, Some(s)),
        None => (dep_name, None),
    };

    let base = if base_name == referrer.base_name() {
        // a sub-package of the referrer itself
        Package::load(&referrer.path)?
    } else if let Some(path) = dep_path {
        Package::load(&referrer.path.join(path))
            .with_context(|| format!("path dependency `{}` not found", path))?
    } else {
        match selected.get(base_name) {
            Some(SelectedVersionJson::Path { path }) => Package::load(&referrer.path.join(path))?,
            Some(SelectedVersionJson::Version(version)) => {
                let dir = dub_dir::package_dir(base_name, version);
                Package::load(&dir).with_context(|| {
                    format!(
                        "package `{}` {} is not fetched (expected at `{}`)",
                        base_name,
                        version,
                        dir.display()
                    )
                })?
            }
            None => bail!(
                "no selected version for `{}`; dependency resolution must run first",
                base_name
            ),
        }
    };

    match sub_name {
        None => Ok(base),
        Some(sub) => {
            let recipe = base
                .recipe
                .sub_packages
                .iter()
                .find(|r| r.name == sub)
                .cloned()
                .with_context(|| {
                    format!("`{}` has no sub-package named `{}`", base.name, sub)
                })?;
            Ok(base.sub_package(&recipe))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_path_dependencies_transitively() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("app");
        write(
            &root.join("dub.json"),
            r#"{"name": "app", "targetType": "executable",
                "dependencies": {"lib": {"path": "../lib"}}}"#,
        );
        write(&root.join("source/app.d"), "void main() {}");
        write(
            &tmp.path().join("lib/dub.json"),
            r#"{"name": "lib", "targetType": "staticLibrary",
                "dependencies": {"low": {"path": "../low"}}}"#,
        );
        write(&tmp.path().join("lib/source/lib.d"), "");
        write(
            &tmp.path().join("low/dub.json"),
            r#"{"name": "low", "targetType": "sourceLibrary"}"#,
        );
        write(&tmp.path().join("low/source/low.d"), "");

        let project = Project::load(&root, &BuildPlatform::host(), None).unwrap();
        let names: Vec<&str> = project.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["app", "lib", "low"]);
        assert_eq!(project.root.name, "app");
    }

    #[test]
    fn missing_selection_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("app");
        write(
            &root.join("dub.json"),
            r#"{"name": "app", "dependencies": {"vibe-d": "~>0.9.0"}}"#,
        );
        let err = Project::load(&root, &BuildPlatform::host(), None).unwrap_err();
        assert!(format!("{:#}", err).contains("no selected version"));
    }

    #[test]
    fn sub_package_dependency_resolves_against_referrer() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("pkg");
        write(
            &root.join("dub.json"),
            r#"{"name": "pkg", "targetType": "executable",
                "dependencies": {":core": "*"},
                "subPackages": [{"name": "core", "targetType": "sourceLibrary"}]}"#,
        );
        write(&root.join("source/app.d"), "void main() {}");

        let project = Project::load(&root, &BuildPlatform::host(), None).unwrap();
        let names: Vec<&str> = project.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["pkg", "pkg:core"]);
        assert_eq!(project.packages[1].path, project.root.path);
    }
}
