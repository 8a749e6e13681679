use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use fincalc::api::{
    AppState, InflationArgs, TaxArgs, format_money, render_inflation_text, render_tax_text,
    run_http_server, run_inflation, run_tax,
};
use fincalc::data::{DataError, InflationDataset, TaxRules};

/// Income tax and inflation calculator
#[derive(Parser, Debug)]
#[command(name = "fincalc", version, about)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Tax rules file replacing the embedded one
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Inflation dataset replacing the embedded one
    #[arg(long, global = true)]
    inflation_data: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Re-price an amount between two years
    Inflation(InflationArgs),
    /// Compute tax for a gross amount, or the gross for a target net
    Tax(TaxArgs),
    /// List the tax years in the rules file
    Years,
    /// List the inflation series in the dataset
    Series,
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

fn load_rules(cli: &Cli) -> Result<TaxRules, DataError> {
    match &cli.rules {
        Some(path) => TaxRules::from_path(path),
        None => TaxRules::embedded(),
    }
}

fn load_inflation(cli: &Cli) -> Result<InflationDataset, DataError> {
    match &cli.inflation_data {
        Some(path) => InflationDataset::from_path(path),
        None => InflationDataset::embedded(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

async fn run(cli: Cli) -> Result<(), String> {
    match &cli.command {
        Commands::Inflation(args) => {
            let dataset = load_inflation(&cli).map_err(|e| e.to_string())?;
            let response = run_inflation(args, &dataset).map_err(|e| e.to_string())?;
            if cli.json {
                print_json(&response)?;
            } else {
                print!("{}", render_inflation_text(&response));
            }
        }
        Commands::Tax(args) => {
            let rules = load_rules(&cli).map_err(|e| e.to_string())?;
            let response = run_tax(args, &rules).map_err(|e| e.to_string())?;
            if cli.json {
                print_json(&response)?;
            } else {
                print!("{}", render_tax_text(&response));
            }
        }
        Commands::Years => {
            let rules = load_rules(&cli).map_err(|e| e.to_string())?;
            let summaries = rules.summaries();
            if cli.json {
                print_json(&summaries)?;
            } else {
                for summary in summaries {
                    let marker = if summary.year == rules.default_year() {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "{marker} {}  {}  non-resident {:.0}%  deposit base {}",
                        summary.year,
                        summary.scheme_name,
                        summary.non_resident_rate * 100.0,
                        format_money(summary.deposit_non_taxable_base)
                    );
                }
            }
        }
        Commands::Series => {
            let dataset = load_inflation(&cli).map_err(|e| e.to_string())?;
            let summaries: Vec<_> = dataset.all_series().iter().map(|s| s.summary()).collect();
            if cli.json {
                print_json(&summaries)?;
            } else {
                for summary in summaries {
                    let span = match (summary.first_year, summary.last_year) {
                        (Some(first), Some(last)) => format!("{first}..={last}"),
                        _ => "-".to_string(),
                    };
                    println!("{:<16} {:<12} {}", summary.id, span, summary.name);
                }
            }
        }
        Commands::Serve { port } => {
            let rules = load_rules(&cli).map_err(|e| e.to_string())?;
            let dataset = load_inflation(&cli).map_err(|e| e.to_string())?;
            debug!(
                years = rules.years().count(),
                series = dataset.all_series().len(),
                "datasets loaded"
            );
            run_http_server(*port, AppState::new(rules, dataset))
                .await
                .map_err(|e| format!("server error: {e}"))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!("{e}");
        std::process::exit(1);
    }
}
