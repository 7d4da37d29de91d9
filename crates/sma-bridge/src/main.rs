mod cli;
mod error;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sma_bridge::{AppState, router};

use crate::cli::Cli;
use crate::error::BridgeError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), BridgeError> {
    let config_path = cli.config.clone().unwrap_or_else(sma_config::config_path);
    let mut settings =
        sma_config::load(cli.config.as_deref()).map_err(|source| BridgeError::Config {
            path: config_path.display().to_string(),
            source,
        })?;

    // CLI flags win over file and environment.
    if let Some(listen) = cli.listen {
        settings.listen = listen;
    }
    if let Some(cooldown) = cli.cooldown {
        settings.cooldown_secs = Some(cooldown);
    }

    let listener = TcpListener::bind(settings.listen)
        .await
        .map_err(|source| BridgeError::Bind {
            addr: settings.listen,
            source,
        })?;

    let state = AppState::from_settings(&settings);
    info!(
        listen = %settings.listen,
        endpoint = %state.endpoint,
        cooldown_secs = state.bridge.options().cooldown.as_secs_f64(),
        policy = %state.bridge.options().cooldown_policy,
        live_data = state.live_data.is_some(),
        "sma-bridge listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(BridgeError::Serve)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
