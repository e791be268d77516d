//! # Server Configuration
//!
//! This module contains the server setup and configuration for the Reports API.

use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dispatch::DispatchCoordinator;
use crate::handlers;
use crate::telemetry::{TraceContext, with_trace_context};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub dispatcher: Arc<DispatchCoordinator>,
    pub history_retention_days: i64,
}

/// Attach a per-request trace context so errors and logs carry a correlation
/// ID. An incoming `x-request-id` is honored, otherwise one is generated.
async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let context = TraceContext {
        trace_id: trace_id.clone(),
    };
    let mut response = with_trace_context(context, next.run(request)).await;
    if let Ok(value) = axum::http::HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert("x-trace-id", value);
    }
    response
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/tenants/{tenant_id}/connectors/{connector_id}/history",
            get(handlers::history::list_history),
        )
        .route(
            "/tenants/{tenant_id}/connectors/{connector_id}/runs",
            post(handlers::runs::trigger_run),
        )
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_app(state);

    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::history::list_history,
        crate::handlers::runs::trigger_run,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::history::HistoryEntry,
            crate::handlers::history::HistoryResponse,
            crate::handlers::runs::RunResponse,
            crate::error::ApiError,
        )
    ),
    info(
        title = "Reports API",
        description = "Scheduled report generation and history",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
