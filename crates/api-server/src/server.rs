//! API server — exposes the insight and rule endpoints over HTTP.

use crate::rest::{self, AppState};
use adwatch_core::config::AppConfig;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Builds the router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Insight discovery and retrieval
        .route(
            "/v1/insight-targets",
            get(rest::list_targets).post(rest::list_targets_with),
        )
        .route("/v1/insights", post(rest::fetch_insight))
        // Rule checks
        .route("/v1/rules/check", post(rest::check_rules))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/live", get(rest::liveness))
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
