use std::process;
use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod crew;
mod server;
mod tools;
mod utils;

use config::Config;
use crew::openai::OpenAiClient;
use server::{create_app, AppState};
use utils::pdf::PdfExtractLoader;

#[tokio::main]
async fn main() {
    // Parse command line arguments first
    let matches = config::command().get_matches();

    let config = match Config::from_matches(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            process::exit(2);
        }
    };

    // RUST_LOG wins; otherwise errors only in quiet mode, info by default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.quiet {
            EnvFilter::new("error")
        } else {
            EnvFilter::new("financial_analyzer=info,tower_http=info")
        }
    });

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    if let Err(e) = run(config).await {
        error!("Server failed: {:#}", e);
        process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    // Log LLM configuration status (without exposing secrets)
    if config.llm.api_key.is_none() {
        warn!("No LLM API key configured - requests are sent without authorization");
    }

    let llm = OpenAiClient::new(
        config.llm.api_key.as_deref(),
        config.llm.endpoint.as_deref(),
        config.llm.model.as_deref(),
        config.llm.max_tokens,
        config.llm.timeout,
    )?;
    info!("Using model {} at {}", llm.model(), llm.endpoint());
    info!(
        "Staging uploads in {} (max {} bytes)",
        config.scratch_dir.display(),
        config.max_upload_bytes
    );

    let state = AppState {
        scratch_dir: config.scratch_dir.clone(),
        llm: Arc::new(llm),
        loader: Arc::new(PdfExtractLoader),
        max_iterations: config.max_iterations,
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
