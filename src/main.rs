use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cloud_cost_optimizer::collector::gcp::{CollectorConfig, GcpCollector, RestGcpApi};
use cloud_cost_optimizer::config::Config;
use cloud_cost_optimizer::credentials::resolve_access_token;
use cloud_cost_optimizer::display::DisplayManager;
use cloud_cost_optimizer::logging::init_logging;
use cloud_cost_optimizer::{CostOptimizationAnalyzer, ScanOptions};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cloud-cost-optimizer")]
#[command(about = "Find idle cloud resources and turn them into cost-optimization recommendations")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect billing and inventory data and print recommendations
    Scan {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Days of billing history to collect
        #[arg(long)]
        days: Option<i64>,
        /// Show at most N recommendations
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the effective configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Scan {
        json: false,
        days: None,
        limit: None,
    }) {
        Commands::Scan { json, days, limit } => {
            if let Err(e) = run_scan(cli.config, json, days, limit) {
                handle_error(e, json);
            }
        }
        Commands::Config => {
            let result = Config::load(cli.config.as_deref()).and_then(|config| config.to_toml());
            match result {
                Ok(toml) => print!("{}", toml),
                Err(e) => handle_error(e, false),
            }
        }
    }
}

fn run_scan(
    config_path: Option<PathBuf>,
    json: bool,
    days: Option<i64>,
    limit: Option<usize>,
) -> Result<()> {
    let mut config = Config::load(config_path.as_deref())?;
    if let Some(days) = days {
        config.analysis.lookback_days = days;
    }
    config.validate()?;
    let _log_guard = init_logging(&config.logging, &config.paths);

    if config.gcp.project_id.trim().is_empty() {
        bail!("Missing required configuration field: project_id");
    }

    let token = resolve_access_token()?;
    let client = RestGcpApi::new(token, config.gcp.billing_export())
        .context("Failed to build GCP client")?;

    let mut collector = GcpCollector::new(CollectorConfig {
        project_id: config.gcp.project_id.clone(),
        billing_account_id: config.gcp.billing_account_id.clone(),
        credential_handle: Arc::new(client),
    });

    let mut options = ScanOptions::from(&config.analysis);
    if limit.is_some() {
        options.max_recommendations = limit;
    }

    let report = CostOptimizationAnalyzer::new(options).scan(&mut collector, &config.gcp.project_id)?;
    DisplayManager::new().display_scan(&report, json);
    Ok(())
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
