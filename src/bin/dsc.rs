//! DSC engine CLI
//!
//! Scenario simulator and calculators for the over-collateralized stable-unit
//! engine.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;

use dsc_engine::cli::{parse_units, OutputFormat, OutputFormatter, Scenario, Simulation};
use dsc_engine::core::config::EngineParams;
use dsc_engine::core::health::calculate_health_factor;

/// DSC engine CLI - collateral, health factors and liquidations
#[derive(Parser)]
#[command(name = "dsc")]
#[command(version = dsc_engine::VERSION)]
#[command(about = "Simulate and inspect the DSC engine", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Engine parameter file (JSON)
    #[arg(short, long, env = "DSC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format: text, json, json-pretty
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file against an in-memory engine
    Simulate {
        /// Scenario file (JSON)
        scenario: PathBuf,
    },

    /// Compute a health factor
    Health {
        /// Collateral value in USD
        #[arg(long)]
        collateral_usd: String,

        /// Outstanding debt in DSC
        #[arg(long)]
        debt: String,
    },

    /// Print the effective engine parameters
    Params,

    /// Write default engine parameters to a file
    InitConfig {
        /// Destination file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = OutputFormatter::new(cli.format);
    if let Err(e) = run_command(&cli, &output) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, output: &OutputFormatter) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Simulate { scenario } => cmd_simulate(cli, scenario, output),
        Commands::Health { collateral_usd, debt } => cmd_health(cli, collateral_usd, debt, output),
        Commands::Params => {
            output.data(&load_params(cli)?);
            Ok(())
        }
        Commands::InitConfig { path, force } => cmd_init_config(path, *force, output),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_simulate(cli: &Cli, path: &Path, output: &OutputFormatter) -> anyhow::Result<()> {
    let mut scenario = Scenario::load(path)?;
    if cli.config.is_some() {
        scenario.params = load_params(cli)?;
    }

    let report = Simulation::run(&scenario)?;
    output.report(&report);
    Ok(())
}

fn cmd_health(
    cli: &Cli,
    collateral_usd: &str,
    debt: &str,
    output: &OutputFormatter,
) -> anyhow::Result<()> {
    let params = load_params(cli)?;
    let hf = calculate_health_factor(parse_units(debt)?, parse_units(collateral_usd)?, &params)?;

    output.kv("health_factor", &hf.to_string());
    if hf.meets(params.min_health_factor) {
        output.success("position is healthy");
    } else {
        output.error("position is liquidatable");
    }
    Ok(())
}

fn cmd_init_config(path: &Path, force: bool, output: &OutputFormatter) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists. Use --force to overwrite.", path.display());
    }
    EngineParams::default().save(path)?;
    output.success(&format!("default parameters written to {}", path.display()));
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn load_params(cli: &Cli) -> anyhow::Result<EngineParams> {
    let params = match &cli.config {
        Some(path) => EngineParams::load(path)?,
        None => EngineParams::default(),
    };
    Ok(params.from_env()?)
}
