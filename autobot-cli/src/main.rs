//! autobot CLI
//!
//! Uploads every `<segment>.<segment>...pdf` receipt of a directory into the
//! SEI case record `<segment>/<segment>/...` through a running WebDriver.
//!
//! Usage:
//!   autobot ./recibos                       # credentials from SEI_USUARIO / SEI_SENHA (.env honored)
//!   autobot ./recibos -u operador -p ...    # explicit credentials
//!   autobot ./recibos --config autobot.yaml --report report.json
//!
//! Exit codes: 0 when every file succeeded, 2 when some files failed, 1 when the run aborted.
//! Ctrl-C stops after the file in progress and still closes the browser; a second Ctrl-C exits at once.

use anyhow::{bail, Context, Result};
use autobot::{Autobot, BatchReport, EngineConfig, FileStatus};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "autobot")]
#[command(about = "Upload PDF receipts into their SEI case records")]
#[command(
    long_about = "Each file named <segment>.<segment>...pdf in DIRECTORY is attached as an external document to the SEI record <segment>/<segment>/... A WebDriver (e.g. chromedriver) must already be listening on --webdriver-url."
)]
struct Cli {
    /// Directory holding the receipts
    directory: String,

    /// SEI username
    #[clap(long, short = 'u', env = "SEI_USUARIO", hide_env_values = true)]
    username: Option<String>,

    /// SEI password
    #[clap(long, short = 'p', env = "SEI_SENHA", hide_env_values = true)]
    password: Option<String>,

    /// YAML file overriding timings, retry budget and page landmarks
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// SEI base URL (overrides the config file)
    #[clap(long)]
    base_url: Option<String>,

    /// WebDriver endpoint (overrides the config file)
    #[clap(long)]
    webdriver_url: Option<String>,

    /// Directory for the daily log file
    #[clap(long, env = "AUTOBOT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Write the per-file report as JSON
    #[clap(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir.clone());
    let cancel = CancellationToken::new();
    tokio::spawn(interrupt_listener(cancel.clone()));

    match run(cli, cancel).await {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(e) => {
            error!("Run aborted: {:#}", e);
            eprintln!("{} {:#}", "❌ Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn interrupt_listener(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("Interrupt received, stopping after the current file");
    eprintln!(
        "{}",
        "Stopping after the current file (Ctrl-C again to exit immediately)".yellow()
    );
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        error!("Second interrupt, exiting without closing the browser session");
        std::process::exit(130);
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<BatchReport> {
    let username = required(cli.username, "username (--username or SEI_USUARIO)")?;
    let password = required(cli.password, "password (--password or SEI_SENHA)")?;
    if cli.directory.trim().is_empty() {
        bail!("Missing source directory");
    }

    let config = load_config(
        cli.config.as_ref(),
        cli.base_url.clone(),
        cli.webdriver_url.clone(),
    )?;
    let bot = Autobot::new(config).context("Invalid configuration")?;

    let report = bot
        .run(&username, &password, &cli.directory, cancel)
        .await
        .with_context(|| format!("Failed to process {}", cli.directory))?;

    print_summary(&report);

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }
    Ok(report)
}

fn required(value: Option<String>, what: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("Missing {what}"),
    }
}

fn load_config(
    path: Option<&PathBuf>,
    base_url: Option<String>,
    webdriver_url: Option<String>,
) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(url) = base_url {
        config.base_url = url;
    }
    if let Some(url) = webdriver_url {
        config.webdriver_url = url;
    }
    Ok(config)
}

fn print_summary(report: &BatchReport) {
    for task in &report.tasks {
        match task.status {
            FileStatus::Succeeded => println!("  {} {}", "✓".green(), task.file_name),
            _ => println!(
                "  {} {} ({})",
                "✗".red(),
                task.file_name,
                task.last_error.as_deref().unwrap_or("not processed")
            ),
        }
    }

    let line = format!(
        "{} file(s): {} succeeded, {} failed",
        report.total(),
        report.succeeded(),
        report.failed()
    );
    if report.is_success() {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line.yellow().bold());
    }
}

fn init_logging(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    use tracing_appender::rolling;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = log_dir.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("autobot")
            .join("logs")
    });

    let file_layer = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&log_dir, "autobot.log"));
            Some((
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true),
                guard,
            ))
        }
        Err(e) => {
            eprintln!("Cannot create log directory {}: {}", log_dir.display(), e);
            None
        }
    };
    let (file_layer, guard) = match file_layer {
        Some((layer, guard)) => (Some(layer), Some(guard)),
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(
            // Respect RUST_LOG if provided, else default to info
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
    guard
}
