use services::{AppServices, Clock, SupplierConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;

use args::{ArgsError, Invocation, print_usage};

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,app=info,services=info,storage=info,quiz_core=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv = std::env::args().skip(1);
    let invocation = match Invocation::parse(argv, |key| std::env::var(key).ok()) {
        Ok(Some(invocation)) => invocation,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            print_usage();
            return Err(err.into());
        }
    };
    let settings = invocation.settings;
    debug!(api = %settings.api_base_url, db = %settings.db_url, "starting");

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&settings.db_url)?;
    let config = SupplierConfig::new(&settings.api_base_url)?.with_timeout(settings.timeout);
    let app = AppServices::new_sqlite(&settings.db_url, Clock::default_clock(), config).await?;

    commands::dispatch(&app, invocation.command).await
}

#[tokio::main]
async fn main() {
    setup_logging();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
