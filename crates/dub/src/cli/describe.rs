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

use dubbuild::describe::DescribeGenerator;
use dubbuild::generate::run_generator;

use super::{prepare_project, BuildFlags, UniversalFlags};

/// Print a JSON description of the resolved target graph
#[derive(Debug, clap::Parser)]
pub struct DescribeSubcommand {
    #[clap(flatten)]
    pub build_flags: BuildFlags,
}

pub fn run_describe(cli: &UniversalFlags, cmd: &DescribeSubcommand) -> anyhow::Result<i32> {
    let loaded = prepare_project(cli, &cmd.build_flags, false, Vec::new())?;
    let mut generator = DescribeGenerator::new();
    run_generator(&loaded.project, &mut generator, &loaded.settings)?;
    println!("{}", generator.into_json()?);
    Ok(0)
}
