// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! TRITIUM-SC scenario/admin CLI.
//!
//! Offline utility over `tritium_core::scenario::ScenarioLoader`: list,
//! validate, and inspect scenario JSON without standing up the daemon.

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use tritium_core::scenario::ScenarioLoader;

#[derive(Parser, Debug)]
#[command(author, version, about = "TRITIUM-SC scenario/admin utility")]
struct Args {
    /// Directory of scenario JSON files.
    #[arg(long, default_value = "scenarios/battle")]
    scenario_dir: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// List scenario names available in `scenario_dir`.
    List,
    /// Load and validate a single scenario by name.
    Validate { name: String },
    /// Print a scenario's full JSON.
    Show { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let loader = ScenarioLoader::new(&args.scenario_dir);
    let mut stdout = std::io::stdout();

    match args.cmd {
        Command::List => {
            for name in loader.list()? {
                writeln!(stdout, "{name}")?;
            }
        }
        Command::Validate { name } => {
            let scenario = loader.load(&name, (0.0, 0.0, 0.0))?;
            writeln!(stdout, "{name}: {} waves, map_center={:?}", scenario.waves.len(), scenario.map_center)?;
        }
        Command::Show { name } => {
            let scenario = loader.load(&name, (0.0, 0.0, 0.0))?;
            writeln!(stdout, "{}", serde_json::to_string_pretty(&scenario)?)?;
        }
    }

    Ok(())
}
