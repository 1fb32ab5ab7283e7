//! calgate entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use calgate_core::{TracingConfig, init_tracing};
use calgate_providers::google::MemoryCredentialStore;
use calgate_server::cli::Cli;
use calgate_server::{AppState, ServerConfig, ServerResult, app, shutdown_signal};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let config = ServerConfig::from_cli(&cli)?;

    let tracing_config = if cli.debug {
        TracingConfig::debug()
    } else {
        TracingConfig::service()
    };
    init_tracing(tracing_config.with_format(config.log_format))?;

    if !config.google.credentials.looks_like_google_client() {
        warn!("GOOGLE_CLIENT_ID does not look like a Google OAuth client ID");
    }

    let state = AppState::new(&config.google, Arc::new(MemoryCredentialStore::new()))?;

    if cli.print_auth_url {
        println!("{}", state.auth.authorization_url());
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
    info!(
        address = %listener.local_addr()?,
        auth_url = %config.auth_entry_url(),
        "calgate listening"
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("calgate stopped");
    Ok(())
}
