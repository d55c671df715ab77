//! Copy the JSON collections into PostgreSQL
//!
//! Backs up the data directory, applies the schema and upserts every record
//! by its key. Safe to run repeatedly. Exits non-zero when any record failed.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keystone::{
    db::{self, migrations::run_migrations, pool::redact_url, Repositories},
    migration,
};

#[derive(Parser, Debug)]
#[command(name = "migrate-to-postgresql")]
#[command(about = "Migrate Keystone JSON storage into PostgreSQL", long_about = None)]
struct Cli {
    /// Directory holding the JSON collection files
    #[arg(long, env = "KEYSTONE_STORAGE_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Read and validate the JSON files without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Do not copy the JSON files to data_dir/backups first
    #[arg(long)]
    skip_backup: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keystone=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(report) => {
            println!("{}", report.render());
            let failed = report.total_failed();
            if failed > 0 {
                eprintln!("{failed} record(s) failed to migrate");
                ExitCode::FAILURE
            } else {
                if report.dry_run {
                    println!("Dry run: nothing was written");
                }
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Migration aborted: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<migration::MigrationReport> {
    if !cli.data_dir.is_dir() {
        anyhow::bail!("Data directory {} does not exist", cli.data_dir.display());
    }

    if cli.dry_run {
        return migration::migrate(&cli.data_dir, None).await;
    }

    let url = cli
        .database_url
        .as_deref()
        .context("--database-url or DATABASE_URL is required")?;

    let backup_dir = if cli.skip_backup {
        None
    } else {
        migration::backup_collections(&cli.data_dir).await?
    };

    tracing::info!("Connecting to {}", redact_url(url));
    let pool = match db::connect(url, 5).await {
        Ok(pool) => pool,
        Err(e) => {
            if let Some(dir) = &backup_dir {
                tracing::info!("JSON files are untouched; backup kept at {}", dir.display());
            }
            return Err(e);
        }
    };

    let applied = run_migrations(&pool).await?;
    tracing::info!("Schema ready ({} migration(s) applied)", applied);

    let repos = Repositories::postgres(pool);
    let mut report = migration::migrate(&cli.data_dir, Some(&repos)).await?;
    report.backup_dir = backup_dir;
    if let Some(dir) = &report.backup_dir {
        println!("Backup: {}", dir.display());
    }
    Ok(report)
}
