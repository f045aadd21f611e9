//! history-sync - audit table generator for MySQL
//!
//! Compares each configured table with its history table (`<table>_<suffix>`)
//! and prints the SQL that brings the history table up to date, followed by
//! the insert/update/delete triggers that fill it. The SQL is only emitted,
//! never executed.
//!
//! Pipeline per table:
//! - Catalog: read source and history columns from `information_schema`
//! - Diff: added / removed / modified columns
//! - DDL: `CREATE TABLE` or `ALTER TABLE ... MODIFY / DROP / ADD COLUMN`
//! - Triggers: drop the ones we own, then create all three again

mod catalog;
mod config;
mod connection;
mod ddl;
mod diff;
mod error;
mod generator;
mod output;
mod render;
mod schema;
mod trigger;

use crate::catalog::MySqlCatalog;
use crate::config::{Settings, CONFIG_TEMPLATE};
use crate::generator::Generator;
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "history-sync")]
#[command(about = "Generate history tables and audit triggers for MySQL tables")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a config template and exit
    #[arg(short, long)]
    gen_config: bool,

    /// Only process these tables instead of the configured list
    #[arg(short, long = "table", value_name = "TABLE")]
    tables: Vec<String>,

    /// Log format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if cli.gen_config {
        let mut out = output::open(cli.output.as_deref())?;
        out.write_all(CONFIG_TEMPLATE.as_bytes())?;
        out.flush()?;
        return Ok(ExitCode::SUCCESS);
    }

    Ok(ExitCode::from(exit_status(run(cli).await)))
}

/// Report a failed run once, through tracing, and map it to a process status
fn exit_status(result: error::AppResult<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!(code = e.code(), "{}", e);
            1
        }
    }
}

async fn run(cli: Cli) -> error::AppResult<()> {
    let settings = Settings::load(&cli.config, &cli.tables)?;
    info!(
        "Generating history SQL for {} tables in `{}` (suffix `{}`)",
        settings.tables.len(),
        settings.database,
        settings.his_suffix
    );

    let pool = settings.connection_params().connect().await?;
    let generator = Generator::new(
        MySqlCatalog::new(pool),
        settings.database.as_str(),
        settings.his_suffix.as_str(),
    );

    let mut out = output::open(cli.output.as_deref())?;
    generator.run(&settings.tables, &mut out).await?;
    Ok(())
}

/// Initialize tracing; logs go to stderr so stdout carries only SQL
fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init(),
    }
}
