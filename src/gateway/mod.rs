pub mod auth;
pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use state::AppState;

/// All routes, with JWT auth on everything but health and docs
pub fn build_router(state: Arc<AppState>) -> Router {
    let company_routes = Router::new()
        .route(
            "/{company_id}/transfers",
            post(handlers::create_transfer).get(handlers::list_transfers),
        )
        .layer(from_fn_with_state(state.clone(), auth::jwt_auth_middleware));

    let transfer_routes = Router::new()
        .route("/{transfer_id}", get(handlers::get_transfer))
        .route("/{transfer_id}/approve", post(handlers::approve_transfer))
        .route("/{transfer_id}/reject", post(handlers::reject_transfer))
        .layer(from_fn_with_state(state.clone(), auth::jwt_auth_middleware));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .nest("/api/v1/companies", company_routes)
        .nest("/api/v1/transfers", transfer_routes)
        .with_state(state)
        // stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Bind and serve until ctrl-c
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.with_context(|| {
        format!(
            "Failed to bind to {} (port {} may already be in use)",
            addr, config.port
        )
    })?;

    info!("🚀 Gateway listening on http://{}", addr);
    info!("📖 API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
