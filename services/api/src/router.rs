//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application:
//! the voice chat endpoint, the browser client and its static assets, and
//! the OpenAPI documentation.

use crate::{
    handlers,
    models::{ChatResponse, ChatUpload, ErrorResponse},
    state::AppState,
};

use axum::{Router, extract::DefaultBodyLimit, routing::post};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::agent_chat),
    components(schemas(ChatResponse, ChatUpload, ErrorResponse)),
    tags(
        (name = "Voxrelay API", description = "Voice conversation turns relayed through speech and language providers")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let index_page = app_state.config.index_page.clone();
    let static_dir = app_state.config.static_dir.clone();
    let max_upload_bytes = app_state.config.max_upload_bytes;

    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/agent/chat/{session_id}", post(handlers::agent_chat))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(app_state);

    Router::new()
        .route_service("/", ServeFile::new(index_page))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
