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

use colored::Colorize;

use super::{find_package_root, UniversalFlags};

/// Remove the build cache of the current package
#[derive(Debug, clap::Parser)]
pub struct CleanSubcommand {}

pub fn run_clean(cli: &UniversalFlags, _cmd: &CleanSubcommand) -> anyhow::Result<i32> {
    let root_dir = find_package_root(cli)?;
    let cache = root_dir.join(".dub");
    if cache.exists() {
        std::fs::remove_dir_all(&cache)?;
        if !cli.quiet {
            println!(
                "{} removed `{}`",
                "Finished.".bright_green().bold(),
                cache.display()
            );
        }
    } else if !cli.quiet {
        println!("{} nothing to clean", "Finished.".bright_green().bold());
    }
    Ok(0)
}
