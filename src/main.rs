use anyhow::{Context, Result};
use clap::Parser;
use repoingest::config::Config;
use repoingest::pipeline::{
    IngestionRequest, MemoryEvents, MemoryStore, Orchestrator, TaskStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Ingest a repository and print the resulting task record.
#[derive(Parser, Debug)]
#[command(name = "repoingest", version, about)]
struct Cli {
    /// Local directory to ingest.
    path: Option<PathBuf>,

    /// HTTPS git URL to clone and ingest instead of a local path.
    #[arg(long)]
    git_url: Option<String>,

    /// Path to a JSON config file.
    #[arg(long, default_value = "")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config).context("failed to load config")?;
    if let Some(path) = &cli.path {
        // Allow ingesting exactly the directory the user pointed at
        config.allowed_base_dir = path.clone();
    }
    config.validate().context("invalid configuration")?;

    let request = IngestionRequest {
        path: cli.path,
        git_url: cli.git_url,
    };

    let store = Arc::new(MemoryStore::new());
    let events = Arc::new(MemoryEvents::new());
    let orchestrator = Orchestrator::new(config, store.clone(), events.clone())
        .context("failed to initialize orchestrator")?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling after current batch");
            ctrl_c_cancel.cancel();
        }
    });

    let (progress_tx, mut progress_rx) = watch::channel(TaskStatus::default());
    let reporter = tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let status = progress_rx.borrow_and_update().clone();
            info!(
                "{:?}: {}/{} files{}",
                status.state,
                status.files_processed,
                status.files_total,
                status
                    .current_file
                    .as_deref()
                    .map(|f| format!(" ({f})"))
                    .unwrap_or_default()
            );
        }
    });

    let task = orchestrator.run(request, cancel, Some(progress_tx)).await?;
    reporter.await.ok();

    info!(
        "stored {} resources, {} chunks, {} relationships over {} batch events",
        store.resource_count(),
        store.chunk_count(),
        store.relationships().len(),
        events.batch_count()
    );
    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}
