//! Check that PostgreSQL holds the same data as the JSON collections

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keystone::{
    db::{self, Repositories},
    migration,
};

#[derive(Parser, Debug)]
#[command(name = "verify-migration")]
#[command(about = "Compare Keystone JSON storage with PostgreSQL", long_about = None)]
struct Cli {
    /// Directory holding the JSON collection files
    #[arg(long, env = "KEYSTONE_STORAGE_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keystone=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    match run(cli).await {
        Ok(report) => {
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{text}"),
                    Err(e) => eprintln!("Failed to encode report: {e}"),
                }
            } else {
                println!("{}", report.render());
            }
            if report.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Verification failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<migration::VerifyReport> {
    let url = cli
        .database_url
        .as_deref()
        .context("--database-url or DATABASE_URL is required")?;
    let pool = db::connect(url, 5).await?;
    let repos = Repositories::postgres(pool);
    migration::verify(&cli.data_dir, &repos).await
}
