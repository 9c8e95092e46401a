mod app;
mod cli;
mod commands;
mod ui;

use anyhow::Context;
use storeflux_core::{AppConfig, AppConfigStore};
use tokio::io::BufReader;

use crate::app::AppState;
use crate::cli::{CliArgs, USAGE};

fn main() -> anyhow::Result<()> {
    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    if args.help {
        print!("{}", USAGE);
        return Ok(());
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = load_config(&args).inspect_err(|e| log::error!("Startup failed: {:#}", e))?;
    let (storage, monitor) = storeflux_http::connect(&config)
        .inspect_err(|e| log::error!("Failed to build API client: {}", e))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async {
        let mut app = AppState::new(&config, storage, monitor);
        app.start().await;

        let stdin = BufReader::new(tokio::io::stdin());
        app::run_shell(&mut app, stdin, &mut std::io::stdout()).await
    })?;

    log::info!("Shutdown complete");
    Ok(())
}

fn load_config(args: &CliArgs) -> anyhow::Result<AppConfig> {
    let store = match &args.config_path {
        Some(path) => AppConfigStore::from_path(path.clone()),
        None => AppConfigStore::new()?,
    };

    let mut config = store
        .load()
        .with_context(|| format!("failed to load {}", store.path().display()))?;
    config.apply_env()?;
    config.apply_overrides(args.api_url.clone(), args.backend.clone())?;

    log::info!(
        "Using {} ({} backend)",
        config.api_url,
        config.default_backend.display_name()
    );

    Ok(config)
}
