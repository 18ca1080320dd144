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

//! The merged inputs to one compiler invocation, and the merge rules that
//! move settings along dependency edges.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::common::append_unique;
use crate::platform::{is_linker_file, BuildPlatform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetType {
    #[default]
    Autodetect,
    /// Host-policy alias for `StaticLibrary`.
    Library,
    Executable,
    StaticLibrary,
    DynamicLibrary,
    SourceLibrary,
    Object,
    None,
}

impl TargetType {
    /// Targets of these types never produce an artifact file and are folded
    /// into their dependents by the generator.
    pub fn has_output(self) -> bool {
        !matches!(self, TargetType::SourceLibrary | TargetType::None)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetType::Autodetect => "autodetect",
            TargetType::Library => "library",
            TargetType::Executable => "executable",
            TargetType::StaticLibrary => "staticLibrary",
            TargetType::DynamicLibrary => "dynamicLibrary",
            TargetType::SourceLibrary => "sourceLibrary",
            TargetType::Object => "object",
            TargetType::None => "none",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TargetType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "autodetect" => Ok(TargetType::Autodetect),
            "library" => Ok(TargetType::Library),
            "executable" => Ok(TargetType::Executable),
            "staticLibrary" => Ok(TargetType::StaticLibrary),
            "dynamicLibrary" => Ok(TargetType::DynamicLibrary),
            "sourceLibrary" => Ok(TargetType::SourceLibrary),
            "object" => Ok(TargetType::Object),
            "none" => Ok(TargetType::None),
            _ => Err("invalid target type"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildMode {
    #[default]
    Separate,
    AllAtOnce,
    SingleFile,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildMode::Separate => "separate",
            BuildMode::AllAtOnce => "allAtOnce",
            BuildMode::SingleFile => "singleFile",
        };
        write!(f, "{}", s)
    }
}

bitflags! {
    // serde impls come from the bitflags `serde` feature
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct BuildOptions: u32 {
        const DEBUG_MODE = 1 << 0;
        const RELEASE_MODE = 1 << 1;
        const COVERAGE = 1 << 2;
        const DEBUG_INFO = 1 << 3;
        const DEBUG_INFO_C = 1 << 4;
        const ALWAYS_STACK_FRAME = 1 << 5;
        const STACK_STOMPING = 1 << 6;
        const INLINE = 1 << 7;
        const NO_BOUNDS_CHECK = 1 << 8;
        const OPTIMIZE = 1 << 9;
        const PROFILE = 1 << 10;
        const UNITTESTS = 1 << 11;
        const VERBOSE = 1 << 12;
        const SYNTAX_ONLY = 1 << 13;
        const WARNINGS = 1 << 14;
        const WARNINGS_AS_ERRORS = 1 << 15;
        const IGNORE_DEPRECATIONS = 1 << 16;
        const DEPRECATION_WARNINGS = 1 << 17;
        const DEPRECATION_ERRORS = 1 << 18;
        const PROPERTY = 1 << 19;
        const PROFILE_GC = 1 << 20;
        const PIC = 1 << 21;
        const LOWMEM = 1 << 22;
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::empty()
    }
}

impl BuildOptions {
    /// The subset that propagates from a dependent down into its
    /// dependencies.
    pub const INHERITABLE: BuildOptions = BuildOptions::from_bits_retain(
        BuildOptions::DEBUG_MODE.bits()
            | BuildOptions::RELEASE_MODE.bits()
            | BuildOptions::COVERAGE.bits()
            | BuildOptions::DEBUG_INFO.bits()
            | BuildOptions::DEBUG_INFO_C.bits()
            | BuildOptions::ALWAYS_STACK_FRAME.bits()
            | BuildOptions::STACK_STOMPING.bits()
            | BuildOptions::INLINE.bits()
            | BuildOptions::NO_BOUNDS_CHECK.bits()
            | BuildOptions::OPTIMIZE.bits()
            | BuildOptions::PROFILE.bits()
            | BuildOptions::PROFILE_GC.bits()
            | BuildOptions::UNITTESTS.bits(),
    );

    pub fn from_dub_name(name: &str) -> Option<BuildOptions> {
        let opt = match name {
            "debugMode" => BuildOptions::DEBUG_MODE,
            "releaseMode" => BuildOptions::RELEASE_MODE,
            "coverage" => BuildOptions::COVERAGE,
            "debugInfo" => BuildOptions::DEBUG_INFO,
            "debugInfoC" => BuildOptions::DEBUG_INFO_C,
            "alwaysStackFrame" => BuildOptions::ALWAYS_STACK_FRAME,
            "stackStomping" => BuildOptions::STACK_STOMPING,
            "inline" => BuildOptions::INLINE,
            "noBoundsCheck" => BuildOptions::NO_BOUNDS_CHECK,
            "optimize" => BuildOptions::OPTIMIZE,
            "profile" => BuildOptions::PROFILE,
            "unittests" => BuildOptions::UNITTESTS,
            "verbose" => BuildOptions::VERBOSE,
            "syntaxOnly" => BuildOptions::SYNTAX_ONLY,
            "warnings" => BuildOptions::WARNINGS,
            "warningsAsErrors" => BuildOptions::WARNINGS_AS_ERRORS,
            "ignoreDeprecations" => BuildOptions::IGNORE_DEPRECATIONS,
            "deprecationWarnings" => BuildOptions::DEPRECATION_WARNINGS,
            "deprecationErrors" => BuildOptions::DEPRECATION_ERRORS,
            "property" => BuildOptions::PROPERTY,
            "profileGC" => BuildOptions::PROFILE_GC,
            "pic" => BuildOptions::PIC,
            "lowmem" => BuildOptions::LOWMEM,
            _ => return None,
        };
        Some(opt)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct BuildRequirements: u32 {
        const ALLOW_WARNINGS = 1 << 0;
        const SILENCE_WARNINGS = 1 << 1;
        const DISALLOW_DEPRECATIONS = 1 << 2;
        const SILENCE_DEPRECATIONS = 1 << 3;
        const DISALLOW_INLINING = 1 << 4;
        const DISALLOW_OPTIMIZATION = 1 << 5;
        const REQUIRE_BOUNDS_CHECK = 1 << 6;
        const REQUIRE_CONTRACTS = 1 << 7;
        const RELAX_PROPERTIES = 1 << 8;
        const NO_DEFAULT_FLAGS = 1 << 9;
    }
}

impl Default for BuildRequirements {
    fn default() -> Self {
        Self::empty()
    }
}

impl BuildRequirements {
    pub fn from_dub_name(name: &str) -> Option<BuildRequirements> {
        let req = match name {
            "allowWarnings" => BuildRequirements::ALLOW_WARNINGS,
            "silenceWarnings" => BuildRequirements::SILENCE_WARNINGS,
            "disallowDeprecations" => BuildRequirements::DISALLOW_DEPRECATIONS,
            "silenceDeprecations" => BuildRequirements::SILENCE_DEPRECATIONS,
            "disallowInlining" => BuildRequirements::DISALLOW_INLINING,
            "disallowOptimization" => BuildRequirements::DISALLOW_OPTIMIZATION,
            "requireBoundsCheck" => BuildRequirements::REQUIRE_BOUNDS_CHECK,
            "requireContracts" => BuildRequirements::REQUIRE_CONTRACTS,
            "relaxProperties" => BuildRequirements::RELAX_PROPERTIES,
            "noDefaultFlags" => BuildRequirements::NO_DEFAULT_FLAGS,
            _ => return None,
        };
        Some(req)
    }
}

/// Maps an orthogonal build-type name onto its option preset.
pub fn build_type_options(build_type: &str) -> anyhow::Result<BuildOptions> {
    use BuildOptions as O;
    let opts = match build_type {
        "plain" => O::empty(),
        "debug" => O::DEBUG_MODE | O::DEBUG_INFO,
        "release" => O::RELEASE_MODE | O::OPTIMIZE | O::INLINE,
        "release-debug" => O::RELEASE_MODE | O::OPTIMIZE | O::INLINE | O::DEBUG_INFO,
        "release-nobounds" => O::RELEASE_MODE | O::OPTIMIZE | O::INLINE | O::NO_BOUNDS_CHECK,
        "unittest" => O::UNITTESTS | O::DEBUG_MODE | O::DEBUG_INFO,
        "profile" => O::PROFILE | O::OPTIMIZE | O::INLINE | O::DEBUG_INFO,
        "profile-gc" => O::PROFILE_GC | O::DEBUG_INFO,
        "cov" => O::COVERAGE | O::DEBUG_INFO,
        "unittest-cov" => O::UNITTESTS | O::COVERAGE | O::DEBUG_MODE | O::DEBUG_INFO,
        "syntax" => O::SYNTAX_ONLY,
        other => anyhow::bail!("unknown build type `{}`", other),
    };
    Ok(opts)
}

/// The merged inputs to one compiler/linker invocation. All collections are
/// ordered; merge operations preserve insertion order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSettings {
    pub target_type: TargetType,
    pub target_name: String,
    pub target_path: String,
    pub working_directory: String,
    pub main_source_file: String,
    pub source_files: Vec<String>,
    pub import_files: Vec<String>,
    pub string_import_files: Vec<String>,
    pub import_paths: Vec<String>,
    pub string_import_paths: Vec<String>,
    pub versions: Vec<String>,
    pub debug_versions: Vec<String>,
    pub dflags: Vec<String>,
    pub lflags: Vec<String>,
    pub libs: Vec<String>,
    pub copy_files: Vec<String>,
    pub extra_dependency_files: Vec<String>,
    pub pre_generate_commands: Vec<String>,
    pub post_generate_commands: Vec<String>,
    pub pre_build_commands: Vec<String>,
    pub post_build_commands: Vec<String>,
    pub options: BuildOptions,
    pub requirements: BuildRequirements,
}

impl BuildSettings {
    pub fn add_version(&mut self, version: String) {
        if !self.versions.contains(&version) {
            self.versions.push(version);
        }
    }

    /// Embeds `other` into `self`, concatenating every list field and
    /// OR-merging the bitsets. The target identity of `other` is ignored;
    /// this is how `sourceLibrary`/`none` dependencies dissolve into their
    /// dependents.
    pub fn add(&mut self, other: &BuildSettings) {
        append_unique(&mut self.source_files, &other.source_files);
        append_unique(&mut self.import_files, &other.import_files);
        append_unique(&mut self.string_import_files, &other.string_import_files);
        append_unique(&mut self.import_paths, &other.import_paths);
        append_unique(&mut self.string_import_paths, &other.string_import_paths);
        append_unique(&mut self.versions, &other.versions);
        append_unique(&mut self.debug_versions, &other.debug_versions);
        self.dflags.extend(other.dflags.iter().cloned());
        self.lflags.extend(other.lflags.iter().cloned());
        append_unique(&mut self.libs, &other.libs);
        append_unique(&mut self.copy_files, &other.copy_files);
        append_unique(
            &mut self.extra_dependency_files,
            &other.extra_dependency_files,
        );
        self.pre_generate_commands
            .extend(other.pre_generate_commands.iter().cloned());
        self.post_generate_commands
            .extend(other.post_generate_commands.iter().cloned());
        self.pre_build_commands
            .extend(other.pre_build_commands.iter().cloned());
        self.post_build_commands
            .extend(other.post_build_commands.iter().cloned());
        self.options |= other.options;
        self.requirements |= other.requirements;
    }

    /// Applied *down* the graph: copies version identifiers and the
    /// inheritable option subset from a dependent. Idempotent.
    pub fn merge_from_dependent(&mut self, parent: &BuildSettings) {
        append_unique(&mut self.versions, &parent.versions);
        append_unique(&mut self.debug_versions, &parent.debug_versions);
        self.options |= parent.options & BuildOptions::INHERITABLE;
    }

    /// Applied *up* the graph: pulls the parts of a dependency that its
    /// dependent needs to compile and link against it. For a static
    /// library, the dependent also takes over linking the library's own
    /// linker inputs.
    pub fn merge_from_dependency(&mut self, child: &BuildSettings, platform: &BuildPlatform) {
        self.dflags.extend(child.dflags.iter().cloned());
        append_unique(&mut self.versions, &child.versions);
        append_unique(&mut self.debug_versions, &child.debug_versions);
        append_unique(&mut self.import_paths, &child.import_paths);
        append_unique(&mut self.string_import_paths, &child.string_import_paths);
        if child.target_type == TargetType::StaticLibrary {
            let linker_inputs: Vec<String> = child
                .source_files
                .iter()
                .filter(|f| is_linker_file(platform, f))
                .cloned()
                .collect();
            append_unique(&mut self.source_files, &linker_inputs);
            append_unique(&mut self.libs, &child.libs);
            self.lflags.extend(child.lflags.iter().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(os: &str) -> BuildPlatform {
        BuildPlatform {
            platform: vec![os.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn add_ignores_target_identity() {
        let mut parent = BuildSettings {
            target_type: TargetType::Executable,
            target_name: "app".into(),
            ..Default::default()
        };
        let child = BuildSettings {
            target_type: TargetType::SourceLibrary,
            target_name: "srclib".into(),
            source_files: vec!["src/a.d".into()],
            options: BuildOptions::PIC,
            ..Default::default()
        };
        parent.add(&child);
        assert_eq!(parent.target_type, TargetType::Executable);
        assert_eq!(parent.target_name, "app");
        assert_eq!(parent.source_files, vec!["src/a.d".to_string()]);
        assert!(parent.options.contains(BuildOptions::PIC));
    }

    #[test]
    fn merge_from_dependent_is_idempotent() {
        let parent = BuildSettings {
            versions: vec!["Have_app".into(), "Extra".into()],
            options: BuildOptions::RELEASE_MODE | BuildOptions::VERBOSE,
            ..Default::default()
        };
        let mut child = BuildSettings::default();
        child.merge_from_dependent(&parent);
        let once = child.clone();
        child.merge_from_dependent(&parent);
        assert_eq!(once.versions, child.versions);
        assert_eq!(once.options, child.options);
        // non-inheritable options must not leak down
        assert!(!child.options.contains(BuildOptions::VERBOSE));
        assert!(child.options.contains(BuildOptions::RELEASE_MODE));
    }

    #[test]
    fn merge_from_dependency_static_library() {
        let mut parent = BuildSettings::default();
        let child = BuildSettings {
            target_type: TargetType::StaticLibrary,
            source_files: vec!["src/lib.d".into(), "prebuilt.o".into()],
            libs: vec!["z".into()],
            lflags: vec!["-L/opt/lib".into()],
            import_paths: vec!["src".into()],
            versions: vec!["Have_lib".into()],
            ..Default::default()
        };
        parent.merge_from_dependency(&child, &platform("linux"));
        // only the linker-compatible source crosses the edge
        assert_eq!(parent.source_files, vec!["prebuilt.o".to_string()]);
        assert_eq!(parent.libs, vec!["z".to_string()]);
        assert_eq!(parent.lflags, vec!["-L/opt/lib".to_string()]);
        assert_eq!(parent.import_paths, vec!["src".to_string()]);
        assert_eq!(parent.versions, vec!["Have_lib".to_string()]);
    }

    #[test]
    fn merge_from_dependency_source_library_keeps_sources_out() {
        let mut parent = BuildSettings::default();
        let child = BuildSettings {
            target_type: TargetType::SourceLibrary,
            source_files: vec!["src/lib.d".into(), "prebuilt.o".into()],
            libs: vec!["z".into()],
            ..Default::default()
        };
        parent.merge_from_dependency(&child, &platform("linux"));
        assert!(parent.source_files.is_empty());
        assert!(parent.libs.is_empty());
    }

    #[test]
    fn build_type_presets() {
        assert!(build_type_options("release")
            .unwrap()
            .contains(BuildOptions::OPTIMIZE));
        assert!(build_type_options("unittest-cov")
            .unwrap()
            .contains(BuildOptions::COVERAGE | BuildOptions::UNITTESTS));
        assert_eq!(build_type_options("plain").unwrap(), BuildOptions::empty());
        assert!(build_type_options("bogus").is_err());
    }
}
