//! Jarvis Chat - a minimal web chat in front of Google Gemini
//!
//! Serves a single chat page and forwards each user turn to the model,
//! keeping the transcript in memory.

mod api;
mod config;
mod llm;
mod session;
mod turn;

#[cfg(test)]
mod testing;

use api::{create_router, AppState};
use config::Config;
use llm::{ConversationService, GeminiChat, LoggingConversation};
use std::future::IntoFuture;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turn::TurnController;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jarvis_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration; a missing API key stops here, before anything is served
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    // Initialize the model client
    let gemini = GeminiChat::new(&config.gemini_settings()).map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize Gemini API");
        e
    })?;
    let service: Arc<dyn ConversationService> =
        Arc::new(LoggingConversation::new(Arc::new(gemini)));

    tracing::info!(
        model = %service.model_id(),
        turn_timeout_secs = config.turn_timeout.as_secs(),
        "Gemini client initialized"
    );

    let controller = Arc::new(TurnController::new(service, config.turn_timeout));
    let state = AppState::new(controller.clone());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = config.listen_addr();
    tracing::info!("Jarvis chat listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    // Open render streams never end, so stop on the signal instead of draining
    tokio::select! {
        result = axum::serve(listener, app).into_future() => result?,
        () = shutdown_signal() => {}
    }

    controller.end_session().await;
    tracing::info!("Jarvis chat stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
