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

//! End-to-end scenarios over the mock filesystem: target-map shapes, cache
//! behaviour, and build-ID sensitivity, with compiler invocations recorded
//! instead of spawned.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indexmap::IndexMap;

use dubbuild::build_id::compute_build_id;
use dubbuild::compiler::{Compiler, DmdCompiler, InvokeResult, OutputCallback, PrepareFlags};
use dubbuild::executor::BuildExecutor;
use dubbuild::generate::{run_generator, GeneratorSettings};
use dubbuild::graph::{build_target_map, TargetInfo};
use dubbuild::project::Project;
use dubutil::package::{ChosenConfigs, Package};
use dubutil::platform::BuildPlatform;
use dubutil::recipe::{Recipe, RecipeJson};
use dubutil::settings::{BuildMode, BuildSettings, TargetType};
use dubutil::vfs::{Filesystem, MockFilesystem};

/// Delegates everything to the DMD flag logic but records invocations and
/// writes artifacts into the mock tree instead of spawning processes.
struct MockCompiler {
    inner: DmdCompiler,
    fs: Arc<MockFilesystem>,
    invocations: Arc<Mutex<Vec<String>>>,
}

impl MockCompiler {
    fn new(fs: Arc<MockFilesystem>) -> MockCompiler {
        MockCompiler {
            inner: DmdCompiler::new(PathBuf::from("/opt/dmd/bin/dmd"), 2109),
            fs,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn outputs(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }

    fn write_of_target(&self, dflags: &[String]) -> anyhow::Result<String> {
        let Some(of) = dflags.iter().find_map(|f| f.strip_prefix("-of")) else {
            // a pure syntax check names no output
            self.invocations.lock().unwrap().push("(no output)".into());
            return Ok(String::new());
        };
        self.fs.write_file(Path::new(of), b"bin")?;
        self.invocations.lock().unwrap().push(of.to_string());
        Ok(of.to_string())
    }
}

impl Compiler for MockCompiler {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn binary(&self) -> &Path {
        self.inner.binary()
    }

    fn frontend_version(&self) -> i32 {
        self.inner.frontend_version()
    }

    fn prepare_build_settings(
        &self,
        bs: &mut BuildSettings,
        platform: &BuildPlatform,
        fields: PrepareFlags,
    ) {
        self.inner.prepare_build_settings(bs, platform, fields)
    }

    fn set_target(
        &self,
        bs: &mut BuildSettings,
        platform: &BuildPlatform,
        target: &Path,
        override_obj: Option<&Path>,
    ) {
        self.inner.set_target(bs, platform, target, override_obj)
    }

    fn invoke(
        &self,
        bs: &BuildSettings,
        _platform: &BuildPlatform,
        on_output: OutputCallback,
    ) -> anyhow::Result<()> {
        self.write_of_target(&bs.dflags)?;
        on_output(&InvokeResult {
            status: 0,
            output: String::new(),
        });
        Ok(())
    }

    fn invoke_linker(
        &self,
        bs: &BuildSettings,
        _platform: &BuildPlatform,
        objects: &[String],
        on_output: OutputCallback,
    ) -> anyhow::Result<()> {
        let of = self.write_of_target(&bs.dflags)?;
        let mut log = self.invocations.lock().unwrap();
        log.pop();
        log.push(format!("{} <- {}", of, objects.join(" ")));
        drop(log);
        on_output(&InvokeResult {
            status: 0,
            output: String::new(),
        });
        Ok(())
    }

    fn out_file_flags(&self, out: &Path) -> Vec<String> {
        self.inner.out_file_flags(out)
    }

    fn target_type_flags(&self, target_type: TargetType) -> Vec<String> {
        self.inner.target_type_flags(target_type)
    }

    fn lflags_to_dflags(&self, lflags: &[String]) -> Vec<String> {
        self.inner.lflags_to_dflags(lflags)
    }

    fn artifact_name(
        &self,
        target_type: TargetType,
        name: &str,
        platform: &BuildPlatform,
    ) -> String {
        self.inner.artifact_name(target_type, name, platform)
    }
}

fn package(json: &str, dir: &str) -> Arc<Package> {
    let j: RecipeJson = serde_json_lenient::from_str(json).unwrap();
    let recipe = Recipe::try_from(j).unwrap();
    let dir = Path::new(dir);
    Arc::new(Package::from_recipe(recipe, dir, &dir.join("dub.json")))
}

fn project(packages: Vec<Arc<Package>>) -> Project {
    let chosen_configs: ChosenConfigs = packages
        .iter()
        .map(|p| (p.name.clone(), String::new()))
        .collect();
    Project {
        root: packages[0].clone(),
        packages,
        chosen_configs,
    }
}

struct Harness {
    fs: Arc<MockFilesystem>,
    compiler: Arc<MockCompiler>,
    settings: GeneratorSettings,
}

fn harness() -> Harness {
    let fs = Arc::new(MockFilesystem::new());
    let compiler = Arc::new(MockCompiler::new(fs.clone()));
    let platform = compiler.determine_platform();
    let settings = GeneratorSettings {
        config: String::new(),
        build_type: "debug".to_string(),
        build_mode: BuildMode::Separate,
        platform,
        compiler: compiler.clone(),
        fs: fs.clone(),
        combined: false,
        force: false,
        direct: false,
        rdmd: false,
        temp_build: false,
        parallel_build: false,
        run: false,
        run_args: Vec::new(),
    };
    Harness {
        fs,
        compiler,
        settings,
    }
}

fn seed_sources(fs: &MockFilesystem, files: &[&str]) {
    for f in files {
        fs.write_file(Path::new(f), b"// d source").unwrap();
    }
    // recipe files participate in the freshness check
}

fn seed_recipes(fs: &MockFilesystem, project: &Project) {
    for p in &project.packages {
        fs.write_file(p.recipe_file(), b"{}").unwrap();
    }
}

fn assert_invariants(targets: &IndexMap<String, TargetInfo>) {
    for (name, t) in targets {
        assert_eq!(t.packages[0].name, t.pack.name, "packages[0] of `{}`", name);
        assert!(
            !matches!(
                t.build_settings.target_type,
                TargetType::SourceLibrary | TargetType::None
            ) || t.build_settings.options.contains(dubutil::settings::BuildOptions::SYNTAX_ONLY),
            "`{}` survived pruning without an artifact type",
            name
        );
        for dep in &t.link_dependencies {
            assert!(t.dependencies.contains(dep), "link dep `{}` of `{}`", dep, name);
        }
        for dep in &t.dependencies {
            assert!(targets.contains_key(dep), "dep `{}` of `{}` unmapped", dep, name);
        }
    }
}

#[test]
fn s1_single_executable_builds_and_caches() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"]}"#,
        "/app",
    );
    let project = project(vec![app]);
    seed_sources(&h.fs, &["/app/source/app.d"]);
    seed_recipes(&h.fs, &project);
    h.fs.advance_clock(Duration::from_secs(5));

    let targets = build_target_map(&project, &h.settings).unwrap();
    assert_eq!(targets.len(), 1);
    assert!(targets["app"].dependencies.is_empty());
    assert_invariants(&targets);

    let mut executor = BuildExecutor::new(project.clone(), h.fs.clone());
    run_generator(&project, &mut executor, &h.settings).unwrap();
    assert_eq!(executor.root_artifact(), Some(Path::new("/app/app")));
    assert!(h.fs.exists_file(Path::new("/app/app")));
    // the cache holds the original
    let builds = h.compiler.outputs();
    assert!(builds.iter().any(|b| b.contains("/app/.dub/build/")));

    // a second run with nothing changed links from the cache
    let count_before = h.compiler.outputs().len();
    let mut executor = BuildExecutor::new(project.clone(), h.fs.clone());
    run_generator(&project, &mut executor, &h.settings).unwrap();
    assert_eq!(h.compiler.outputs().len(), count_before);
    assert_eq!(executor.root_artifact(), Some(Path::new("/app/app")));
}

#[test]
fn s2_executable_with_static_library_dependency() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "dependencies": {"lib": "*"}}"#,
        "/app",
    );
    let lib = package(
        r#"{"name": "lib", "targetType": "staticLibrary",
            "sourceFiles": ["source/lib.d"]}"#,
        "/lib",
    );
    let project = project(vec![app, lib]);
    seed_sources(&h.fs, &["/app/source/app.d", "/lib/source/lib.d"]);
    seed_recipes(&h.fs, &project);
    h.fs.advance_clock(Duration::from_secs(5));

    let targets = build_target_map(&project, &h.settings).unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets["app"].link_dependencies, vec!["lib".to_string()]);
    assert!(targets["app"]
        .build_settings
        .versions
        .contains(&"Have_lib".to_string()));
    assert_invariants(&targets);

    let mut executor = BuildExecutor::new(project.clone(), h.fs.clone());
    run_generator(&project, &mut executor, &h.settings).unwrap();

    let builds = h.compiler.outputs();
    // lib is built before app, and app links the lib artifact in
    let lib_pos = builds.iter().position(|b| b.contains("liblib.a")).unwrap();
    let link_pos = builds.iter().position(|b| b.contains(" <- ")).unwrap();
    assert!(lib_pos < link_pos);
    assert!(builds[link_pos].contains("liblib.a"));
    assert!(h.fs.exists_file(Path::new("/lib/liblib.a")));
}

#[test]
fn s3_source_library_is_folded_in() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "dependencies": {"srclib": "*"}}"#,
        "/app",
    );
    let srclib = package(
        r#"{"name": "srclib", "targetType": "sourceLibrary",
            "sourceFiles": ["source/srclib.d"]}"#,
        "/srclib",
    );
    let project = project(vec![app, srclib]);

    let targets = build_target_map(&project, &h.settings).unwrap();
    assert_eq!(targets.len(), 1);
    let app_t = &targets["app"];
    let embedded: Vec<&str> = app_t.packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(embedded, vec!["app", "srclib"]);
    assert!(app_t
        .build_settings
        .source_files
        .contains(&"/srclib/source/srclib.d".to_string()));
    assert!(app_t
        .build_settings
        .versions
        .contains(&"Have_srclib".to_string()));
    assert_invariants(&targets);
}

#[test]
fn s4_two_levels_of_static_transitivity() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "dependencies": {"mid": "*"}}"#,
        "/app",
    );
    let mid = package(
        r#"{"name": "mid", "targetType": "staticLibrary",
            "sourceFiles": ["source/mid.d"],
            "dependencies": {"low": "*"}}"#,
        "/mid",
    );
    let low = package(
        r#"{"name": "low", "targetType": "staticLibrary",
            "sourceFiles": ["source/low.d"]}"#,
        "/low",
    );
    let project = project(vec![app, mid, low]);
    seed_sources(
        &h.fs,
        &["/app/source/app.d", "/mid/source/mid.d", "/low/source/low.d"],
    );
    seed_recipes(&h.fs, &project);
    h.fs.advance_clock(Duration::from_secs(5));

    let targets = build_target_map(&project, &h.settings).unwrap();
    assert_eq!(
        targets["app"].link_dependencies,
        vec!["mid".to_string(), "low".to_string()]
    );
    assert_invariants(&targets);

    let mut executor = BuildExecutor::new(project.clone(), h.fs.clone());
    run_generator(&project, &mut executor, &h.settings).unwrap();
    assert!(h.fs.exists_file(Path::new("/mid/libmid.a")));
    assert!(h.fs.exists_file(Path::new("/low/liblow.a")));
    let link = h
        .compiler
        .outputs()
        .into_iter()
        .find(|b| b.contains(" <- "))
        .unwrap();
    assert!(link.contains("libmid.a") && link.contains("liblow.a"));
}

#[test]
fn s5_build_id_sensitivity() {
    let h = harness();
    let bs = BuildSettings {
        dflags: vec!["-preview=dip1000".into()],
        post_build_commands: vec!["echo done".into()],
        ..Default::default()
    };
    let base = compute_build_id("cfg", &bs, &h.settings);

    let mut changed = bs.clone();
    changed.dflags.push("-betterC".into());
    assert_ne!(base, compute_build_id("cfg", &changed, &h.settings));

    let mut changed = bs.clone();
    changed.options |= dubutil::settings::BuildOptions::RELEASE_MODE;
    assert_ne!(base, compute_build_id("cfg", &changed, &h.settings));

    let mut other_compiler = h.settings.clone();
    other_compiler.platform.compiler_binary = PathBuf::from("/usr/local/bin/dmd");
    assert_ne!(base, compute_build_id("cfg", &bs, &other_compiler));

    let mut changed = bs.clone();
    changed.post_build_commands = vec!["echo other".into()];
    assert_eq!(base, compute_build_id("cfg", &changed, &h.settings));
}

#[test]
fn s6_string_import_override() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "stringImportPaths": ["views"],
            "dependencies": {"util": "*"}}"#,
        "/app",
    );
    let util = package(
        r#"{"name": "util", "targetType": "staticLibrary",
            "sourceFiles": ["source/util.d"],
            "stringImportFiles": ["layout.html"]}"#,
        "/util",
    );
    let project = project(vec![app, util]);
    h.fs
        .write_file(Path::new("/app/views/layout.html"), b"<html/>")
        .unwrap();

    let targets = build_target_map(&project, &h.settings).unwrap();
    let util_bs = &targets["util"].build_settings;
    assert_eq!(
        util_bs.string_import_files,
        vec!["/app/views/layout.html".to_string()]
    );
    assert_eq!(util_bs.string_import_paths[0], "/app/views");
    assert_invariants(&targets);
}

#[test]
fn rebuilt_static_library_invalidates_its_dependent() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "dependencies": {"lib": "*"}}"#,
        "/app",
    );
    let lib = package(
        r#"{"name": "lib", "targetType": "staticLibrary",
            "sourceFiles": ["source/lib.d"]}"#,
        "/lib",
    );
    let project = project(vec![app, lib]);
    seed_sources(&h.fs, &["/app/source/app.d", "/lib/source/lib.d"]);
    seed_recipes(&h.fs, &project);
    h.fs.advance_clock(Duration::from_secs(5));

    let mut executor = BuildExecutor::new(project.clone(), h.fs.clone());
    run_generator(&project, &mut executor, &h.settings).unwrap();
    let first = h.compiler.outputs().len();

    // touch the library source: both targets rebuild
    h.fs.advance_clock(Duration::from_secs(60));
    h.fs
        .set_times(Path::new("/lib/source/lib.d"), h.fs.now())
        .unwrap();
    let mut executor = BuildExecutor::new(project.clone(), h.fs.clone());
    run_generator(&project, &mut executor, &h.settings).unwrap();
    let rebuilt = h.compiler.outputs().len() - first;
    assert!(rebuilt >= 2, "expected lib and app to rebuild, got {}", rebuilt);
}

#[test]
fn syntax_only_produces_no_artifact() {
    let h = harness();
    let mut settings = h.settings.clone();
    settings.build_type = "syntax".to_string();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"]}"#,
        "/app",
    );
    let project = project(vec![app]);
    seed_sources(&h.fs, &["/app/source/app.d"]);
    seed_recipes(&h.fs, &project);

    let mut executor = BuildExecutor::new(project.clone(), h.fs.clone());
    run_generator(&project, &mut executor, &settings).unwrap();
    assert!(executor.root_artifact().is_none());
    assert!(!h.fs.exists_file(Path::new("/app/app")));
}

#[test]
fn forced_rebuild_ignores_a_fresh_cache() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"]}"#,
        "/app",
    );
    let project = project(vec![app]);
    seed_sources(&h.fs, &["/app/source/app.d"]);
    seed_recipes(&h.fs, &project);
    h.fs.advance_clock(Duration::from_secs(5));

    let mut executor = BuildExecutor::new(project.clone(), h.fs.clone());
    run_generator(&project, &mut executor, &h.settings).unwrap();
    let first = h.compiler.outputs().len();

    let mut forced = h.settings.clone();
    forced.force = true;
    let mut executor = BuildExecutor::new(project.clone(), h.fs.clone());
    run_generator(&project, &mut executor, &forced).unwrap();
    assert!(h.compiler.outputs().len() > first);
}

#[test]
fn dynamic_library_dependency_downgrades_to_static() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "dependencies": {"dyn": "*"}}"#,
        "/app",
    );
    let dyn_lib = package(
        r#"{"name": "dyn", "targetType": "dynamicLibrary",
            "sourceFiles": ["source/dyn.d"]}"#,
        "/dyn",
    );
    let project1 = project(vec![app, dyn_lib]);

    let targets = build_target_map(&project1, &h.settings).unwrap();
    assert_eq!(
        targets["dyn"].build_settings.target_type,
        TargetType::StaticLibrary
    );
    // a root dynamic library keeps its type and picks up PIC
    let root_dyn = package(
        r#"{"name": "soliton", "targetType": "dynamicLibrary",
            "sourceFiles": ["source/lib.d"]}"#,
        "/soliton",
    );
    let project2 = project(vec![root_dyn]);
    let targets = build_target_map(&project2, &h.settings).unwrap();
    let bs = &targets["soliton"].build_settings;
    assert_eq!(bs.target_type, TargetType::DynamicLibrary);
    assert!(bs.options.contains(dubutil::settings::BuildOptions::PIC));
}

#[test]
fn executable_dependencies_are_never_linked() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "dependencies": {"tool": "*"}}"#,
        "/app",
    );
    let tool = package(
        r#"{"name": "tool", "targetType": "executable",
            "sourceFiles": ["source/tool.d"]}"#,
        "/tool",
    );
    let project = project(vec![app, tool]);

    let targets = build_target_map(&project, &h.settings).unwrap();
    assert!(targets["app"].dependencies.is_empty());
    assert!(targets["app"].link_dependencies.is_empty());
    // the tool still gets its own version identifier via Have_ of itself
    assert!(targets["tool"]
        .build_settings
        .versions
        .contains(&"Have_tool".to_string()));
}

#[test]
fn root_autodetect_becomes_a_static_library() {
    let h = harness();
    let root = package(
        r#"{"name": "pkg", "sourceFiles": ["source/lib.d"]}"#,
        "/pkg",
    );
    let project = project(vec![root]);
    let targets = build_target_map(&project, &h.settings).unwrap();
    assert_eq!(
        targets["pkg"].build_settings.target_type,
        TargetType::StaticLibrary
    );
}

#[test]
fn combined_mode_folds_autodetect_dependencies() {
    let h = harness();
    let mut settings = h.settings.clone();
    settings.combined = true;
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "dependencies": {"lib": "*"}}"#,
        "/app",
    );
    let lib = package(
        r#"{"name": "lib", "targetType": "library",
            "sourceFiles": ["source/lib.d"]}"#,
        "/lib",
    );
    let project = project(vec![app, lib]);

    let targets = build_target_map(&project, &settings).unwrap();
    assert_eq!(targets.len(), 1);
    assert!(targets["app"]
        .build_settings
        .source_files
        .contains(&"/lib/source/lib.d".to_string()));

    // without --combined the same dependency is a separate static library
    let targets = build_target_map(&project, &h.settings).unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(
        targets["lib"].build_settings.target_type,
        TargetType::StaticLibrary
    );
}

#[test]
fn non_executable_main_source_moves_to_the_root() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "dependencies": {"lib": "*"}}"#,
        "/app",
    );
    let lib = package(
        r#"{"name": "lib", "targetType": "staticLibrary",
            "mainSourceFile": "source/main.d",
            "sourceFiles": ["source/lib.d", "source/main.d"]}"#,
        "/lib",
    );
    let project = project(vec![app, lib]);

    let targets = build_target_map(&project, &h.settings).unwrap();
    let lib_bs = &targets["lib"].build_settings;
    assert!(lib_bs.main_source_file.is_empty());
    assert!(!lib_bs
        .source_files
        .contains(&"/lib/source/main.d".to_string()));
    assert!(targets["app"]
        .build_settings
        .source_files
        .contains(&"/lib/source/main.d".to_string()));
}

#[test]
fn root_without_artifact_is_fatal_unless_syntax_only() {
    let h = harness();
    let root = package(
        r#"{"name": "pkg", "targetType": "sourceLibrary",
            "sourceFiles": ["source/lib.d"]}"#,
        "/pkg",
    );
    let project = project(vec![root]);
    let err = build_target_map(&project, &h.settings).unwrap_err();
    assert!(format!("{:#}", err).contains("does not produce an artifact"));

    let mut syntax = h.settings.clone();
    syntax.build_type = "syntax".to_string();
    assert!(build_target_map(&project, &syntax).is_ok());
}

#[test]
fn have_versions_are_sanitized_identifiers() {
    let h = harness();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "dependencies": {"vibe-d": "*"}}"#,
        "/app",
    );
    let vibe = package(
        r#"{"name": "vibe-d", "targetType": "staticLibrary",
            "sourceFiles": ["source/vibe.d"]}"#,
        "/vibe-d",
    );
    let project = project(vec![app, vibe]);
    let targets = build_target_map(&project, &h.settings).unwrap();
    assert!(targets["app"]
        .build_settings
        .versions
        .contains(&"Have_vibe_d".to_string()));
}

#[test]
fn inheritable_options_and_versions_flow_down() {
    let h = harness();
    let mut settings = h.settings.clone();
    settings.build_type = "release".to_string();
    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "versions": ["AppWide"],
            "dependencies": {"lib": "*"}}"#,
        "/app",
    );
    let lib = package(
        r#"{"name": "lib", "targetType": "staticLibrary",
            "sourceFiles": ["source/lib.d"]}"#,
        "/lib",
    );
    let project = project(vec![app, lib]);

    let targets = build_target_map(&project, &settings).unwrap();
    let lib_bs = &targets["lib"].build_settings;
    assert!(lib_bs
        .options
        .contains(dubutil::settings::BuildOptions::RELEASE_MODE));
    assert!(lib_bs.versions.contains(&"AppWide".to_string()));
}

#[test]
#[cfg(unix)]
fn rdmd_mode_runs_pre_build_commands_and_builds() {
    use dubutil::vfs::RealFilesystem;
    use std::os::unix::fs::PermissionsExt;

    // a stand-in rdmd that only writes the named output file
    let tools = tempfile::tempdir().unwrap();
    let fake_rdmd = tools.path().join("rdmd");
    let script = r##"#!/bin/sh
for a in "$@"; do
  case "$a" in
    -of*) printf bin > "${a#-of}" ;;
  esac
done
"##;
    std::fs::write(&fake_rdmd, script).unwrap();
    std::fs::set_permissions(&fake_rdmd, std::fs::Permissions::from_mode(0o755)).unwrap();
    std::env::set_var(
        "PATH",
        format!(
            "{}:{}",
            tools.path().display(),
            std::env::var("PATH").unwrap_or_default()
        ),
    );

    let pkg_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(pkg_dir.path().join("source")).unwrap();
    std::fs::write(pkg_dir.path().join("source/app.d"), "void main() {}").unwrap();

    let app = package(
        r#"{"name": "app", "targetType": "executable",
            "sourceFiles": ["source/app.d"],
            "preBuildCommands": ["touch pre-ran.txt"]}"#,
        pkg_dir.path().to_str().unwrap(),
    );
    let project = project(vec![app]);

    let compiler = Arc::new(DmdCompiler::new(PathBuf::from("/usr/bin/dmd"), 2109));
    let settings = GeneratorSettings {
        config: String::new(),
        build_type: "debug".to_string(),
        build_mode: BuildMode::Separate,
        platform: compiler.determine_platform(),
        compiler,
        fs: Arc::new(RealFilesystem),
        combined: false,
        force: false,
        direct: false,
        rdmd: true,
        temp_build: false,
        parallel_build: false,
        run: false,
        run_args: Vec::new(),
    };

    let mut executor = BuildExecutor::new(project.clone(), settings.fs.clone());
    run_generator(&project, &mut executor, &settings).unwrap();

    assert!(
        pkg_dir.path().join("pre-ran.txt").exists(),
        "pre-build commands must run before the rdmd hand-off"
    );
    assert!(pkg_dir.path().join("app").exists());
    assert_eq!(
        executor.root_artifact(),
        Some(pkg_dir.path().join("app").as_path())
    );
}
