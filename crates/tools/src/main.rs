use std::path::PathBuf;

use clap::{Parser, Subcommand};
use markers::{EngineConfig, StrategyRegistry};
use tools::{replay, Scenario};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Marker engine scenario tools")]
struct Args {
    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scenario file against the headless surface and print a summary
    Replay {
        /// Scenario JSON file
        scenario: PathBuf,
    },

    /// Print the effective engine config (defaults merged with an optional file)
    Config {
        /// Partial engine config JSON file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List the registered clustering and visibility strategies
    Strategies,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let output = match args.command {
        Command::Replay { scenario } => {
            info!(path = %scenario.display(), "replaying scenario");
            let scenario = Scenario::load(&scenario)?;
            to_json(&replay(&scenario)?, args.pretty)?
        }
        Command::Config { file } => {
            let config = match file {
                Some(path) => EngineConfig::from_json_str(&std::fs::read_to_string(&path)?)?,
                None => EngineConfig::default(),
            };
            to_json(&config, args.pretty)?
        }
        Command::Strategies => {
            let registry = StrategyRegistry::with_defaults();
            let listing = serde_json::json!({
                "clustering": registry.clustering_names().collect::<Vec<_>>(),
                "visibility": registry.visibility_names().collect::<Vec<_>>(),
            });
            to_json(&listing, args.pretty)?
        }
    };

    println!("{output}");
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
