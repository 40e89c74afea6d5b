//! Rota API - HTTP surface for reviewer assignment
//!
//! Thin JSON layer over [`rota_core::AssignmentEngine`] and
//! [`rota_core::Roster`]. Every failure is answered with
//! `{"error": {"code", "message"}}`.

mod error;
mod handlers;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use rota_core::{AssignmentEngine, Roster};
use tower_http::trace::TraceLayer;

pub use error::ApiErr;

/// Shared state for the axum routes
#[derive(Clone)]
pub struct AppState {
    pub engine: AssignmentEngine,
    pub roster: Roster,
}

impl AppState {
    pub fn new(engine: AssignmentEngine, roster: Roster) -> Self {
        Self { engine, roster }
    }
}

/// Build the full router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/team/add", post(handlers::add_team))
        .route("/team/get", get(handlers::get_team))
        .route("/team/deactivateUsers", post(handlers::deactivate_users))
        .route("/users/setIsActive", post(handlers::set_is_active))
        .route("/users/getReview", get(handlers::get_review))
        .route("/pullRequest/create", post(handlers::create_pull_request))
        .route("/pullRequest/merge", post(handlers::merge_pull_request))
        .route("/pullRequest/reassign", post(handlers::reassign_reviewer))
        .route("/stats", get(handlers::stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until ctrl-c
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
