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

//! The narrow interface the executor drives compilers through, and its
//! DMD-style implementation.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use anyhow::Context;
use bitflags::bitflags;

use dubutil::platform::BuildPlatform;
use dubutil::settings::{BuildOptions, BuildRequirements, BuildSettings, TargetType};

bitflags! {
    /// Selects which high-level fields `prepare_build_settings` lowers into
    /// `dflags`; a field left out stays untouched for the caller to pass
    /// separately.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PrepareFlags: u32 {
        const SOURCE_FILES = 1 << 0;
        const LFLAGS = 1 << 1;
    }
}

impl PrepareFlags {
    pub const ALL: PrepareFlags =
        PrepareFlags::from_bits_retain(PrepareFlags::SOURCE_FILES.bits() | PrepareFlags::LFLAGS.bits());
}

#[derive(Debug, Clone)]
pub struct InvokeResult {
    pub status: i32,
    pub output: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildToolError {
    #[error("compiler exited with code {0}")]
    Compile(i32),
    #[error("linker exited with code {0}")]
    Link(i32),
}

pub type OutputCallback<'a> = &'a mut dyn FnMut(&InvokeResult);

pub trait Compiler: Send + Sync {
    /// Short name, e.g. `dmd`.
    fn name(&self) -> &str;

    fn binary(&self) -> &Path;

    fn frontend_version(&self) -> i32;

    /// Fills in the compiler identity fields of a host platform.
    fn determine_platform(&self) -> BuildPlatform {
        let mut p = BuildPlatform::host();
        p.compiler = self.name().to_string();
        p.compiler_binary = self.binary().to_path_buf();
        p.frontend_version = self.frontend_version();
        p
    }

    /// Lowers the high-level settings into `dflags`; the consumed fields
    /// are cleared so they cannot be applied twice.
    fn prepare_build_settings(
        &self,
        bs: &mut BuildSettings,
        platform: &BuildPlatform,
        fields: PrepareFlags,
    );

    /// Appends the flags that name the output file. With `override_obj`
    /// set, the invocation compiles to that object instead of producing
    /// the final artifact.
    fn set_target(
        &self,
        bs: &mut BuildSettings,
        platform: &BuildPlatform,
        target: &Path,
        override_obj: Option<&Path>,
    );

    fn invoke(
        &self,
        bs: &BuildSettings,
        platform: &BuildPlatform,
        on_output: OutputCallback,
    ) -> anyhow::Result<()>;

    fn invoke_linker(
        &self,
        bs: &BuildSettings,
        platform: &BuildPlatform,
        objects: &[String],
        on_output: OutputCallback,
    ) -> anyhow::Result<()>;

    fn out_file_flags(&self, out: &Path) -> Vec<String>;

    fn target_type_flags(&self, target_type: TargetType) -> Vec<String>;

    fn lflags_to_dflags(&self, lflags: &[String]) -> Vec<String>;

    /// Artifact filename for a target, following platform conventions.
    fn artifact_name(&self, target_type: TargetType, name: &str, platform: &BuildPlatform)
        -> String;

    fn object_suffix(&self, platform: &BuildPlatform) -> &'static str {
        if platform.is_windows() {
            "obj"
        } else {
            "o"
        }
    }

    /// Whether the compile-then-link split of the `separate` build mode is
    /// available; wrappers that only know one-shot compilation return
    /// false and get the all-at-once path instead.
    fn separate_linking(&self) -> bool {
        true
    }
}

/// Locates a compiler binary and picks the facade matching its name, the
/// way one would tell `cl` from `gcc`: `ldc`-flavoured names get the LDC
/// flag spelling, everything else is treated as a DMD-compatible driver.
pub fn detect_compiler(name_or_path: &str) -> anyhow::Result<Arc<dyn Compiler>> {
    let (binary, frontend_version) = probe_binary(name_or_path)?;
    let stem = binary
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if stem.starts_with("ldc") {
        Ok(Arc::new(LdcCompiler::new(binary, frontend_version)))
    } else {
        Ok(Arc::new(DmdCompiler::new(binary, frontend_version)))
    }
}

fn probe_binary(name_or_path: &str) -> anyhow::Result<(PathBuf, i32)> {
    let binary = which::which(name_or_path)
        .with_context(|| format!("compiler `{}` not found in PATH", name_or_path))?;
    let out = Command::new(&binary)
        .arg("--version")
        .output()
        .with_context(|| format!("failed to run `{} --version`", binary.display()))?;
    let text = String::from_utf8_lossy(&out.stdout);
    let frontend_version = parse_frontend_version(&text)
        .with_context(|| format!("unrecognized version output from `{}`", binary.display()))?;
    Ok((binary, frontend_version))
}

fn run_process(
    binary: &Path,
    args: &[String],
    working_directory: &str,
    on_output: OutputCallback,
) -> anyhow::Result<i32> {
    log::debug!("invoking {} {}", binary.display(), args.join(" "));
    let mut cmd = Command::new(binary);
    cmd.args(args);
    if !working_directory.is_empty() {
        cmd.current_dir(working_directory);
    }
    let out = cmd
        .output()
        .with_context(|| format!("failed to spawn `{}`", binary.display()))?;
    let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
    output.push_str(&String::from_utf8_lossy(&out.stderr));
    let status = out.status.code().unwrap_or(-1);
    on_output(&InvokeResult { status, output });
    Ok(status)
}

/// Artifact filenames shared by every D compiler on a platform.
fn conventional_artifact_name(
    target_type: TargetType,
    name: &str,
    platform: &BuildPlatform,
    obj_suffix: &str,
) -> String {
    let windows = platform.is_windows();
    match target_type {
        TargetType::Executable => {
            if windows {
                format!("{}.exe", name)
            } else {
                name.to_string()
            }
        }
        TargetType::StaticLibrary | TargetType::Library => {
            if windows {
                format!("{}.lib", name)
            } else {
                format!("lib{}.a", name)
            }
        }
        TargetType::DynamicLibrary => {
            if windows {
                format!("{}.dll", name)
            } else if platform.platform.iter().any(|p| p == "osx") {
                format!("lib{}.dylib", name)
            } else {
                format!("lib{}.so", name)
            }
        }
        TargetType::Object => format!("{}.{}", name, obj_suffix),
        _ => name.to_string(),
    }
}

/// DMD, the reference D compiler.
pub struct DmdCompiler {
    binary: PathBuf,
    frontend_version: i32,
}

impl DmdCompiler {
    pub fn new(binary: PathBuf, frontend_version: i32) -> DmdCompiler {
        DmdCompiler {
            binary,
            frontend_version,
        }
    }

    /// Locates the compiler binary and asks it for its front-end version.
    pub fn probe(name_or_path: &str) -> anyhow::Result<DmdCompiler> {
        let (binary, frontend_version) = probe_binary(name_or_path)?;
        Ok(DmdCompiler {
            binary,
            frontend_version,
        })
    }

    fn option_flags(options: BuildOptions, requirements: BuildRequirements) -> Vec<String> {
        use BuildOptions as O;
        let mut flags = Vec::new();
        if requirements.contains(BuildRequirements::NO_DEFAULT_FLAGS) {
            return flags;
        }
        let table: &[(BuildOptions, &str)] = &[
            (O::DEBUG_MODE, "-debug"),
            (O::RELEASE_MODE, "-release"),
            (O::COVERAGE, "-cov"),
            (O::DEBUG_INFO, "-g"),
            (O::DEBUG_INFO_C, "-gc"),
            (O::ALWAYS_STACK_FRAME, "-gs"),
            (O::STACK_STOMPING, "-gx"),
            (O::INLINE, "-inline"),
            (O::NO_BOUNDS_CHECK, "-boundscheck=off"),
            (O::OPTIMIZE, "-O"),
            (O::PROFILE, "-profile"),
            (O::UNITTESTS, "-unittest"),
            (O::VERBOSE, "-v"),
            (O::SYNTAX_ONLY, "-o-"),
            (O::WARNINGS_AS_ERRORS, "-w"),
            (O::WARNINGS, "-wi"),
            (O::IGNORE_DEPRECATIONS, "-d"),
            (O::DEPRECATION_WARNINGS, "-dw"),
            (O::DEPRECATION_ERRORS, "-de"),
            (O::PROPERTY, "-property"),
            (O::PROFILE_GC, "-profile=gc"),
            (O::LOWMEM, "-lowmem"),
        ];
        for (opt, flag) in table {
            if options.contains(*opt) {
                flags.push((*flag).to_string());
            }
        }
        if options.contains(O::PIC) && !cfg!(windows) {
            flags.push("-fPIC".to_string());
        }
        flags
    }

}

pub fn parse_frontend_version(version_output: &str) -> Option<i32> {
    // e.g. "DMD64 D Compiler v2.109.1"
    let idx = version_output.find('v')?;
    let rest = &version_output[idx + 1..];
    let mut parts = rest.split(|c: char| !c.is_ascii_digit());
    let major: i32 = parts.next()?.parse().ok()?;
    let minor: i32 = parts.next()?.parse().ok()?;
    Some(major * 1000 + minor)
}

impl Compiler for DmdCompiler {
    fn name(&self) -> &str {
        "dmd"
    }

    fn binary(&self) -> &Path {
        &self.binary
    }

    fn frontend_version(&self) -> i32 {
        self.frontend_version
    }

    fn prepare_build_settings(
        &self,
        bs: &mut BuildSettings,
        platform: &BuildPlatform,
        fields: PrepareFlags,
    ) {
        let mut dflags = Vec::new();
        dflags.extend(Self::option_flags(bs.options, bs.requirements));
        dflags.extend(bs.versions.drain(..).map(|v| format!("-version={}", v)));
        dflags.extend(bs.debug_versions.drain(..).map(|v| format!("-debug={}", v)));
        dflags.extend(bs.import_paths.drain(..).map(|p| format!("-I{}", p)));
        dflags.extend(
            bs.string_import_paths
                .drain(..)
                .map(|p| format!("-J{}", p)),
        );
        if fields.contains(PrepareFlags::LFLAGS) {
            let lflags: Vec<String> = bs.lflags.drain(..).collect();
            dflags.extend(self.lflags_to_dflags(&lflags));
            if !platform.is_windows() {
                dflags.extend(bs.libs.drain(..).map(|l| format!("-L-l{}", l)));
            }
        }
        if fields.contains(PrepareFlags::SOURCE_FILES) {
            dflags.extend(bs.source_files.drain(..));
        }
        // user dflags last so they can override the generated ones
        let user = std::mem::take(&mut bs.dflags);
        dflags.extend(user);
        bs.dflags = dflags;
    }

    fn set_target(
        &self,
        bs: &mut BuildSettings,
        _platform: &BuildPlatform,
        target: &Path,
        override_obj: Option<&Path>,
    ) {
        match override_obj {
            Some(obj) => {
                bs.dflags.push("-c".to_string());
                bs.dflags.extend(self.out_file_flags(obj));
            }
            None => {
                bs.dflags.extend(self.target_type_flags(bs.target_type));
                bs.dflags.extend(self.out_file_flags(target));
            }
        }
    }

    fn invoke(
        &self,
        bs: &BuildSettings,
        _platform: &BuildPlatform,
        on_output: OutputCallback,
    ) -> anyhow::Result<()> {
        let status = run_process(&self.binary, &bs.dflags, &bs.working_directory, on_output)?;
        if status != 0 {
            return Err(BuildToolError::Compile(status).into());
        }
        Ok(())
    }

    fn invoke_linker(
        &self,
        bs: &BuildSettings,
        _platform: &BuildPlatform,
        objects: &[String],
        on_output: OutputCallback,
    ) -> anyhow::Result<()> {
        let mut args = bs.dflags.clone();
        args.extend(objects.iter().cloned());
        let status = run_process(&self.binary, &args, &bs.working_directory, on_output)?;
        if status != 0 {
            return Err(BuildToolError::Link(status).into());
        }
        Ok(())
    }

    fn out_file_flags(&self, out: &Path) -> Vec<String> {
        vec![format!("-of{}", out.display())]
    }

    fn target_type_flags(&self, target_type: TargetType) -> Vec<String> {
        match target_type {
            TargetType::StaticLibrary | TargetType::Library => vec!["-lib".to_string()],
            TargetType::DynamicLibrary => vec!["-shared".to_string()],
            TargetType::Object => vec!["-c".to_string()],
            _ => vec![],
        }
    }

    fn lflags_to_dflags(&self, lflags: &[String]) -> Vec<String> {
        lflags.iter().map(|f| format!("-L{}", f)).collect()
    }

    fn artifact_name(
        &self,
        target_type: TargetType,
        name: &str,
        platform: &BuildPlatform,
    ) -> String {
        conventional_artifact_name(target_type, name, platform, self.object_suffix(platform))
    }
}

/// LDC, the LLVM-based D compiler. It takes the same driver conventions as
/// DMD but spells version identifiers, inlining, and PIC differently.
pub struct LdcCompiler {
    binary: PathBuf,
    frontend_version: i32,
}

impl LdcCompiler {
    pub fn new(binary: PathBuf, frontend_version: i32) -> LdcCompiler {
        LdcCompiler {
            binary,
            frontend_version,
        }
    }

    pub fn probe(name_or_path: &str) -> anyhow::Result<LdcCompiler> {
        let (binary, frontend_version) = probe_binary(name_or_path)?;
        Ok(LdcCompiler {
            binary,
            frontend_version,
        })
    }

    fn option_flags(options: BuildOptions, requirements: BuildRequirements) -> Vec<String> {
        use BuildOptions as O;
        let mut flags = Vec::new();
        if requirements.contains(BuildRequirements::NO_DEFAULT_FLAGS) {
            return flags;
        }
        let table: &[(BuildOptions, &str)] = &[
            (O::DEBUG_MODE, "-d-debug"),
            (O::RELEASE_MODE, "-release"),
            (O::COVERAGE, "-cov"),
            (O::DEBUG_INFO, "-g"),
            (O::DEBUG_INFO_C, "-gc"),
            (O::INLINE, "-enable-inlining"),
            (O::NO_BOUNDS_CHECK, "-boundscheck=off"),
            (O::OPTIMIZE, "-O3"),
            (O::UNITTESTS, "-unittest"),
            (O::VERBOSE, "-v"),
            (O::SYNTAX_ONLY, "-o-"),
            (O::WARNINGS_AS_ERRORS, "-w"),
            (O::WARNINGS, "-wi"),
            (O::IGNORE_DEPRECATIONS, "-d"),
            (O::DEPRECATION_WARNINGS, "-dw"),
            (O::DEPRECATION_ERRORS, "-de"),
            (O::LOWMEM, "-lowmem"),
        ];
        for (opt, flag) in table {
            if options.contains(*opt) {
                flags.push((*flag).to_string());
            }
        }
        if options.contains(O::PIC) && !cfg!(windows) {
            flags.push("-relocation-model=pic".to_string());
        }
        flags
    }
}

impl Compiler for LdcCompiler {
    fn name(&self) -> &str {
        "ldc2"
    }

    fn binary(&self) -> &Path {
        &self.binary
    }

    fn frontend_version(&self) -> i32 {
        self.frontend_version
    }

    fn prepare_build_settings(
        &self,
        bs: &mut BuildSettings,
        platform: &BuildPlatform,
        fields: PrepareFlags,
    ) {
        let mut dflags = Vec::new();
        dflags.extend(Self::option_flags(bs.options, bs.requirements));
        dflags.extend(bs.versions.drain(..).map(|v| format!("-d-version={}", v)));
        dflags.extend(bs.debug_versions.drain(..).map(|v| format!("-d-debug={}", v)));
        dflags.extend(bs.import_paths.drain(..).map(|p| format!("-I{}", p)));
        dflags.extend(
            bs.string_import_paths
                .drain(..)
                .map(|p| format!("-J{}", p)),
        );
        if fields.contains(PrepareFlags::LFLAGS) {
            let lflags: Vec<String> = bs.lflags.drain(..).collect();
            dflags.extend(self.lflags_to_dflags(&lflags));
            if !platform.is_windows() {
                dflags.extend(bs.libs.drain(..).map(|l| format!("-L-l{}", l)));
            }
        }
        if fields.contains(PrepareFlags::SOURCE_FILES) {
            dflags.extend(bs.source_files.drain(..));
        }
        let user = std::mem::take(&mut bs.dflags);
        dflags.extend(user);
        bs.dflags = dflags;
    }

    fn set_target(
        &self,
        bs: &mut BuildSettings,
        _platform: &BuildPlatform,
        target: &Path,
        override_obj: Option<&Path>,
    ) {
        match override_obj {
            Some(obj) => {
                bs.dflags.push("-c".to_string());
                bs.dflags.extend(self.out_file_flags(obj));
            }
            None => {
                bs.dflags.extend(self.target_type_flags(bs.target_type));
                bs.dflags.extend(self.out_file_flags(target));
            }
        }
    }

    fn invoke(
        &self,
        bs: &BuildSettings,
        _platform: &BuildPlatform,
        on_output: OutputCallback,
    ) -> anyhow::Result<()> {
        let status = run_process(&self.binary, &bs.dflags, &bs.working_directory, on_output)?;
        if status != 0 {
            return Err(BuildToolError::Compile(status).into());
        }
        Ok(())
    }

    fn invoke_linker(
        &self,
        bs: &BuildSettings,
        _platform: &BuildPlatform,
        objects: &[String],
        on_output: OutputCallback,
    ) -> anyhow::Result<()> {
        let mut args = bs.dflags.clone();
        args.extend(objects.iter().cloned());
        let status = run_process(&self.binary, &args, &bs.working_directory, on_output)?;
        if status != 0 {
            return Err(BuildToolError::Link(status).into());
        }
        Ok(())
    }

    fn out_file_flags(&self, out: &Path) -> Vec<String> {
        vec![format!("-of={}", out.display())]
    }

    fn target_type_flags(&self, target_type: TargetType) -> Vec<String> {
        match target_type {
            TargetType::StaticLibrary | TargetType::Library => vec!["-lib".to_string()],
            TargetType::DynamicLibrary => vec!["-shared".to_string()],
            TargetType::Object => vec!["-c".to_string()],
            _ => vec![],
        }
    }

    fn lflags_to_dflags(&self, lflags: &[String]) -> Vec<String> {
        lflags.iter().map(|f| format!("-L{}", f)).collect()
    }

    fn artifact_name(
        &self,
        target_type: TargetType,
        name: &str,
        platform: &BuildPlatform,
    ) -> String {
        conventional_artifact_name(target_type, name, platform, self.object_suffix(platform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posix_platform() -> BuildPlatform {
        BuildPlatform {
            platform: vec!["linux".into(), "posix".into()],
            architecture: vec!["x86_64".into()],
            compiler: "dmd".into(),
            compiler_binary: PathBuf::from("/usr/bin/dmd"),
            frontend_version: 2109,
        }
    }

    fn dmd() -> DmdCompiler {
        DmdCompiler::new(PathBuf::from("/usr/bin/dmd"), 2109)
    }

    #[test]
    fn parse_version_output() {
        assert_eq!(
            parse_frontend_version("DMD64 D Compiler v2.109.1\nCopyright..."),
            Some(2109)
        );
        assert_eq!(parse_frontend_version("gibberish"), None);
    }

    #[test]
    fn prepare_lowers_fields_in_order() {
        use expect_test::expect;
        let mut bs = BuildSettings {
            versions: vec!["Have_lib".into()],
            debug_versions: vec!["Trace".into()],
            import_paths: vec!["source".into()],
            string_import_paths: vec!["views".into()],
            lflags: vec!["-L/opt".into()],
            libs: vec!["z".into()],
            source_files: vec!["source/app.d".into()],
            dflags: vec!["-preview=dip1000".into()],
            options: BuildOptions::RELEASE_MODE | BuildOptions::OPTIMIZE,
            ..Default::default()
        };
        dmd().prepare_build_settings(&mut bs, &posix_platform(), PrepareFlags::ALL);
        expect![[r#"
            [
                "-release",
                "-O",
                "-version=Have_lib",
                "-debug=Trace",
                "-Isource",
                "-Jviews",
                "-L-L/opt",
                "-L-lz",
                "source/app.d",
                "-preview=dip1000",
            ]
        "#]]
        .assert_debug_eq(&bs.dflags);
        assert!(bs.versions.is_empty());
        assert!(bs.source_files.is_empty());
    }

    #[test]
    fn prepare_can_keep_sources_and_lflags() {
        let mut bs = BuildSettings {
            source_files: vec!["a.d".into()],
            lflags: vec!["-L/x".into()],
            ..Default::default()
        };
        dmd().prepare_build_settings(&mut bs, &posix_platform(), PrepareFlags::empty());
        assert_eq!(bs.source_files, vec!["a.d".to_string()]);
        assert_eq!(bs.lflags, vec!["-L/x".to_string()]);
        assert!(bs.dflags.is_empty());
    }

    #[test]
    fn no_default_flags_suppresses_option_lowering() {
        let mut bs = BuildSettings {
            options: BuildOptions::RELEASE_MODE,
            requirements: BuildRequirements::NO_DEFAULT_FLAGS,
            ..Default::default()
        };
        dmd().prepare_build_settings(&mut bs, &posix_platform(), PrepareFlags::ALL);
        assert!(bs.dflags.is_empty());
    }

    #[test]
    fn set_target_modes() {
        let plat = posix_platform();
        let mut bs = BuildSettings {
            target_type: TargetType::StaticLibrary,
            ..Default::default()
        };
        dmd().set_target(&mut bs, &plat, Path::new("out/libx.a"), None);
        assert_eq!(bs.dflags, vec!["-lib".to_string(), "-ofout/libx.a".to_string()]);

        let mut bs = BuildSettings::default();
        dmd().set_target(&mut bs, &plat, Path::new("out/app"), Some(Path::new("out/app.o")));
        assert_eq!(bs.dflags, vec!["-c".to_string(), "-ofout/app.o".to_string()]);
    }

    #[test]
    fn ldc_spells_its_flags_differently() {
        let c = LdcCompiler::new(PathBuf::from("/usr/bin/ldc2"), 2109);
        let mut bs = BuildSettings {
            versions: vec!["Have_lib".into()],
            debug_versions: vec!["Trace".into()],
            options: BuildOptions::PIC | BuildOptions::OPTIMIZE | BuildOptions::INLINE,
            ..Default::default()
        };
        c.prepare_build_settings(&mut bs, &posix_platform(), PrepareFlags::ALL);
        assert!(bs.dflags.contains(&"-d-version=Have_lib".to_string()));
        assert!(bs.dflags.contains(&"-d-debug=Trace".to_string()));
        assert!(bs.dflags.contains(&"-O3".to_string()));
        assert!(bs.dflags.contains(&"-enable-inlining".to_string()));
        assert!(bs.dflags.contains(&"-relocation-model=pic".to_string()));
        assert_eq!(
            c.out_file_flags(Path::new("out/app")),
            vec!["-of=out/app".to_string()]
        );
    }

    #[test]
    fn artifact_names_follow_platform_conventions() {
        let c = dmd();
        let posix = posix_platform();
        let mut win = posix_platform();
        win.platform = vec!["windows".into()];
        let mut osx = posix_platform();
        osx.platform = vec!["osx".into(), "posix".into()];

        assert_eq!(c.artifact_name(TargetType::Executable, "app", &posix), "app");
        assert_eq!(c.artifact_name(TargetType::Executable, "app", &win), "app.exe");
        assert_eq!(
            c.artifact_name(TargetType::StaticLibrary, "x", &posix),
            "libx.a"
        );
        assert_eq!(c.artifact_name(TargetType::StaticLibrary, "x", &win), "x.lib");
        assert_eq!(
            c.artifact_name(TargetType::DynamicLibrary, "x", &posix),
            "libx.so"
        );
        assert_eq!(
            c.artifact_name(TargetType::DynamicLibrary, "x", &osx),
            "libx.dylib"
        );
        assert_eq!(c.artifact_name(TargetType::DynamicLibrary, "x", &win), "x.dll");
    }
}
