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

use dubutil::digest::SettingsDigest;
use dubutil::settings::BuildSettings;

use crate::generate::GeneratorSettings;

/// Derives the stable cache key of one fully-merged target. Two settings
/// values share a build ID exactly when every hashed field is byte
/// identical; fields that cannot change the produced artifact (such as
/// post-build commands) stay out of the digest.
pub fn compute_build_id(
    config: &str,
    bs: &BuildSettings,
    settings: &GeneratorSettings,
) -> String {
    let platform = &settings.platform;
    let mut digest = SettingsDigest::new();
    digest.add_list(&bs.versions);
    digest.add_list(&bs.debug_versions);
    digest.add_list(&bs.dflags);
    digest.add_list(&bs.lflags);
    digest.add(&bs.options.bits().to_string());
    digest.add_list(&bs.string_import_paths);
    digest.add_list(&platform.architecture);
    digest.add(&platform.compiler_binary.display().to_string());
    digest.add(&platform.compiler);
    digest.add_u32_le(platform.frontend_version as u32);

    format!(
        "{}-{}-{}-{}-{}_{}-{}",
        config,
        settings.build_type,
        platform.platform_string(),
        platform.architecture_string(),
        platform.compiler,
        platform.frontend_version,
        digest.hex_digest()
    )
}
