//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::api::websocket::ws_handler;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Fallback handler for unknown routes
async fn fallback_handler(uri: axum::http::Uri) -> Response {
    let body = serde_json::json!({ "error": format!("Not Found: {}", uri.path()) });
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from(body.to_string()),
    )
        .into_response()
}

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket for real-time updates
        .route("/ws", get(ws_handler))
        // Wallet
        .route("/api/wallet", get(handlers::get_wallet))
        .route("/api/owners/{address}", get(handlers::get_owner))
        .route("/api/deposit", post(handlers::deposit))
        // Transactions
        .route(
            "/api/transactions",
            get(handlers::list_transactions).post(handlers::submit_transaction),
        )
        .route("/api/transactions/{id}", get(handlers::get_transaction))
        .route(
            "/api/transactions/{id}/approve",
            post(handlers::approve_transaction),
        )
        .route(
            "/api/transactions/{id}/revoke",
            post(handlers::revoke_transaction),
        )
        .route(
            "/api/transactions/{id}/execute",
            post(handlers::execute_transaction),
        )
        .route(
            "/api/transactions/{id}/approvals/{owner}",
            get(handlers::get_approval),
        )
        // Events and forwarded value
        .route("/api/events", get(handlers::get_events))
        .route("/api/ledger", get(handlers::get_ledger))
        .fallback(fallback_handler)
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}

/// Bind `port` and serve the API until the process stops
pub async fn serve(state: ApiState, port: u16) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;

    log::info!("API server listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await
}
