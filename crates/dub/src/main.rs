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

use clap::Parser;
use colored::Colorize;

use dubbuild::commands::CommandError;
use dubbuild::compiler::BuildToolError;

mod cli;

use cli::DubSubcommands;

fn init_log() {
    use std::io::Write;
    // log level: error > warn > info > debug > trace
    env_logger::Builder::from_env(env_logger::Env::default())
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{} [{}] {}",
                level_style.value(record.level()),
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.args()
            )
        })
        .init();
}

pub fn main() {
    init_log();
    match main1() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:?}", "error".red().bold(), e);
            std::process::exit(exit_code_for(&e));
        }
    }
}

/// The process exit code mirrors the first failing sub-process where one
/// is to blame.
fn exit_code_for(e: &anyhow::Error) -> i32 {
    if let Some(tool) = e.downcast_ref::<BuildToolError>() {
        return match tool {
            BuildToolError::Compile(code) | BuildToolError::Link(code) => *code,
        };
    }
    if let Some(cmd) = e.downcast_ref::<CommandError>() {
        return cmd.status;
    }
    -1
}

fn main1() -> anyhow::Result<i32> {
    let cli = cli::DubCli::parse();
    let flags = cli.flags;
    use DubSubcommands::*;
    match cli.subcommand {
        Build(b) => cli::run_build(&flags, &b),
        Run(r) => cli::run_run(&flags, &r),
        Clean(c) => cli::run_clean(&flags, &c),
        Describe(d) => cli::run_describe(&flags, &d),
        Version => cli::run_version(),
    }
}
