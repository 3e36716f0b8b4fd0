use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use flashtrans_config::Config;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub mod controller;
pub mod events;
pub mod io;
pub mod profile;
pub mod state;
pub mod ui;

#[cfg(test)]
mod tests;

use self::controller::AppController;
use self::profile::ProfileStore;
use self::state::AppState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "flashtrans", version, about = "Selection, typed, OCR and chat translation pipeline")]
struct Cli {
    /// Profile to load from the profile directory
    #[arg(short, long, default_value = "main")]
    profile: String,

    /// Override the worker count
    #[arg(short, long)]
    workers: Option<usize>,

    /// Log JSON lines instead of plain text
    #[arg(long)]
    log_json: bool,

    /// Create a profile cloned from main and exit
    #[arg(long, value_name = "NAME")]
    add_profile: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Some(name) = &cli.add_profile {
        let store = ProfileStore::from_env();
        store.init()?;
        let path = store.add_from_main(name)?;
        tracing::info!("Profile written to {}", path.display());
        return Ok(());
    }

    let config = load_config(&cli)?;
    let state = Arc::new(AppState::new(config));

    let mut controller = AppController::new(state);
    let mut tasks = controller.spawn_tasks(io::spawn_stdin_reader());

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for ctrl+c: {}", e);
            }
            tracing::info!("Shutdown requested");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) => tracing::info!("Task finished, shutting down"),
                Ok(Err(e)) => tracing::error!("Task exited with error: {:#}", e),
                Err(e) => tracing::error!("Task panicked: {}", e),
            }
        }
    }

    controller.drain(tasks, SHUTDOWN_GRACE).await;
    tracing::info!("Bye");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(atty::is(atty::Stream::Stdout)))
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let store = ProfileStore::from_env();
    store.init()?;

    let mut config = store.load(&cli.profile)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    if let Some(workers) = cli.workers {
        config.pipeline.workers = workers;
    }

    tracing::info!(
        "Profile {} loaded: translator {:?}, ocr {:?}, {} worker(s)",
        cli.profile,
        config.translator.provider,
        config.ocr.engine,
        config.pipeline.worker_count()
    );
    Ok(config)
}
