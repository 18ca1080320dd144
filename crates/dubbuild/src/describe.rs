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

//! The target-description generator: consumes the target graph like the
//! build executor does, but emits it as JSON instead of driving builds.

use indexmap::IndexMap;
use serde::Serialize;

use dubutil::settings::BuildSettings;

use crate::generate::{GeneratorSettings, ProjectGenerator};
use crate::graph::TargetInfo;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescription {
    pub root_package: String,
    pub configuration: String,
    pub build_type: String,
    pub compiler: String,
    pub architecture: Vec<String>,
    pub platform: Vec<String>,
    pub targets: Vec<TargetDescription>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescription {
    pub name: String,
    pub config: String,
    pub packages: Vec<String>,
    pub dependencies: Vec<String>,
    pub link_dependencies: Vec<String>,
    pub build_settings: BuildSettings,
}

#[derive(Default)]
pub struct DescribeGenerator {
    description: Option<ProjectDescription>,
}

impl DescribeGenerator {
    pub fn new() -> DescribeGenerator {
        DescribeGenerator::default()
    }

    pub fn into_json(self) -> anyhow::Result<String> {
        let description = self
            .description
            .ok_or_else(|| anyhow::anyhow!("describe generator was never run"))?;
        Ok(serde_json::to_string_pretty(&description)?)
    }
}

impl ProjectGenerator for DescribeGenerator {
    fn generate_targets(
        &mut self,
        settings: &GeneratorSettings,
        targets: &IndexMap<String, TargetInfo>,
    ) -> anyhow::Result<()> {
        // phase 1 inserts the root first, so the map leads with it
        let root_package = targets.keys().next().cloned().unwrap_or_default();
        let mut described = Vec::with_capacity(targets.len());
        for (name, target) in targets {
            described.push(TargetDescription {
                name: name.clone(),
                config: target.config.clone(),
                packages: target.packages.iter().map(|p| p.name.clone()).collect(),
                dependencies: target.dependencies.clone(),
                link_dependencies: target.link_dependencies.clone(),
                build_settings: target.build_settings.clone(),
            });
        }
        self.description = Some(ProjectDescription {
            root_package,
            configuration: settings.config.clone(),
            build_type: settings.build_type.clone(),
            compiler: settings.platform.compiler.clone(),
            architecture: settings.platform.architecture.clone(),
            platform: settings.platform.platform.clone(),
            targets: described,
        });
        Ok(())
    }
}
