use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use invest_sim::api::{
    ScenarioArgs, ScenarioResponse, asset_list, compare, compare_request_from_json,
    run_http_server, simulate_scenario,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "invest-sim",
    about = "Monte Carlo investment growth simulator with seeded scenario comparison"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// List the asset catalog.
    Assets,
    /// Simulate a single scenario.
    Simulate {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, help = "Print the full JSON response including monthly series")]
        json: bool,
    },
    /// Compare up to three scenarios described in a JSON file.
    Compare {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,invest_sim=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(scenario: &ScenarioResponse) {
    println!("{} ({}, seed {})", scenario.label, scenario.asset, scenario.seed);
    println!("  Total contributed:       {:>16.2}", scenario.final_contributions);
    println!("  Simulated final capital: {:>16.2}", scenario.final_capital);
    println!("  Simulated net gain:      {:>16.2}", scenario.net_gain);
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Assets => {
            for asset in asset_list() {
                println!(
                    "{:<20} mean {:>8.2}%  variance {:.4}",
                    asset.name,
                    asset.annual_mean_return * 100.0,
                    asset.annual_variance
                );
            }
            Ok(())
        }
        Command::Simulate { scenario, json } => {
            let response = simulate_scenario(scenario)?;
            if json {
                print_json(&response)
            } else {
                print_summary(&response);
                Ok(())
            }
        }
        Command::Compare { file, json } => {
            let raw = std::fs::read_to_string(&file)
                .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
            let response = compare(compare_request_from_json(&raw)?)?;
            if json {
                return print_json(&response);
            }
            println!(
                "Shared seed {} over {} months",
                response.seed, response.common_months
            );
            for scenario in &response.scenarios {
                print_summary(scenario);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            error!("{msg}");
            ExitCode::FAILURE
        }
    }
}
