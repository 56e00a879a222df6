mod output;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use goldprice_lib::{PriceLog, Preset};

use crate::output::OutputFormat;
use crate::run::Overrides;

#[derive(Parser)]
#[command(name = "goldprice")]
#[command(about = "Discover the current gold price and append it to a CSV log")]
struct Cli {
    /// Path to a TOML config file (defaults to $GOLDPRICE_CONFIG, then built-in settings)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Built-in source list: single-page or multi-source
    #[arg(long)]
    preset: Option<Preset>,

    /// CSV log to append to (overrides the config's log_path)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Output format: table, json or plain
    #[arg(long, default_value = "table")]
    output: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("goldprice=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = Overrides {
        config: cli.config,
        preset: cli.preset,
        log: cli.log,
    };

    let pass = run::run_pass(&overrides).await;
    let log = PriceLog::new(&pass.log_path);
    if let Err(e) = log.append(&pass.record) {
        eprintln!("Failed to append to {}: {}", log.path().display(), e);
        output::print_record(&pass.record, &cli.output);
        return Ok(ExitCode::FAILURE);
    }
    tracing::info!("Saved record to {}", log.path().display());

    output::print_record(&pass.record, &cli.output);

    if pass.record.status.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
