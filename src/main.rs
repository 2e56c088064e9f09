//! CLI entry point for the chat media downloader.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tgmedia_core::config::AppConfig;
use tgmedia_core::download::{BarProgress, RetryingDownloader};
use tgmedia_core::listing::MessageLister;
use tgmedia_core::service::{HttpMessageService, MessageService};
use tgmedia_core::session::{Session, SessionEnd, StdConsole};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let mut config = AppConfig::load(&args.config)?;
    config
        .apply(&args.overrides())
        .context("Invalid command-line override")?;

    let service: Arc<dyn MessageService> = Arc::new(
        HttpMessageService::new(&config.service_url, &config.credentials())
            .context("Failed to set up the gateway client")?,
    );
    info!(
        service = service.name(),
        url = %config.service_url,
        download_dir = %config.download_dir.display(),
        "client started"
    );

    let session = Session::new(
        MessageLister::new(Arc::clone(&service)),
        RetryingDownloader::new(service, &config.download_dir).with_policy(config.retry_policy()),
        args.session_options(),
    );

    let mut console = StdConsole::new();
    let mut progress = if args.quiet {
        BarProgress::hidden()
    } else {
        BarProgress::new()
    };

    match session.run(&mut console, &mut progress).await {
        SessionEnd::Completed(report) => {
            info!(
                succeeded = report.succeeded(),
                skipped = report.skipped(),
                failed = report.failed(),
                "download complete"
            );
        }
        other => debug!(end = ?other, "session ended without downloads"),
    }

    Ok(())
}
