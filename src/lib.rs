pub mod commands;
pub mod config;
pub mod doc_processor;
pub mod llm;
pub mod session;
pub mod store;

use commands::AppState;
use config::AppConfig;
use doc_processor::DocumentExtractor;
use llm::GenerationClient;
use session::ChatSession;
use std::sync::Arc;
use tracing::info;

/// Install the `fmt` subscriber, honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let addr = config.bind_addr()?;

    let generator = GenerationClient::new(config.gemini.clone())?;
    let session = Arc::new(ChatSession::new(
        Arc::new(generator),
        DocumentExtractor::default(),
    ));
    info!(model = %config.gemini.model, %addr, "doc-chat listening");

    let state = Arc::new(AppState { session, config });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, commands::build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
