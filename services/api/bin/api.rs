//! Main Entrypoint for the Voxrelay API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Building the provider adapters, the session store, and the turn pipeline.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use voxrelay_api::{config::Config, router::create_router, state::AppState};
use voxrelay_core::{
    ConversationAdapter, InMemorySessionStore, TurnOrchestrator,
    llm_client::OpenAICompatibleClient, synthesis::MurfSynthesizer,
    transcription::AssemblyAiTranscriber,
};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!(config = ?config, "Configuration loaded. Initializing application state...");

    if !config.fallback_audio_path.is_file() {
        warn!(
            path = %config.fallback_audio_path.display(),
            "Fallback audio file not found; failed turns will return 500."
        );
    }

    // --- 3. Initialize the Turn Pipeline ---
    let transcriber = Arc::new(AssemblyAiTranscriber::new(config.assemblyai_config()));
    let llm_client = Arc::new(OpenAICompatibleClient::new(config.chat_model_config()));
    let session_store = Arc::new(InMemorySessionStore::new());
    let synthesizer = Arc::new(MurfSynthesizer::new(config.murf_config()));

    for (name, configured) in [
        ("ASSEMBLYAI_API_KEY", transcriber.is_configured()),
        ("GEMINI_API_KEY", llm_client.is_configured()),
        ("MURF_API_KEY", synthesizer.is_configured()),
    ] {
        if !configured {
            warn!("{} is not set; turns needing it will fall back to the error audio.", name);
        }
    }

    let orchestrator = TurnOrchestrator::new(
        transcriber,
        ConversationAdapter::new(llm_client, session_store),
        synthesizer,
    );

    let app_state = Arc::new(AppState {
        orchestrator: Arc::new(orchestrator),
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // --- 5. Start Server ---
    info!(
        model = %config.chat_model,
        voice = %config.murf_voice_id,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
