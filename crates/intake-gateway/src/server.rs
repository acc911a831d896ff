// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use intake_config::model::GatewayConfig;
use intake_core::{IntakeError, PluginAdapter};
use intake_engine::Engine;

use crate::auth::{AuthConfig, auth_middleware};
use crate::bridge::BridgeIngress;
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Engine,
    /// Present when the bridge channel adapter is in use.
    pub ingress: Option<BridgeIngress>,
    pub auth: AuthConfig,
    pub bot_name: String,
    /// Adapters probed by `GET /health`. Starts with the engine's channel.
    pub health_sources: Vec<Arc<dyn PluginAdapter>>,
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(engine: Engine, auth: AuthConfig, bot_name: impl Into<String>) -> Self {
        let channel: Arc<dyn PluginAdapter> = engine.channel();
        Self {
            engine,
            ingress: None,
            auth,
            bot_name: bot_name.into(),
            health_sources: vec![channel],
            start_time: std::time::Instant::now(),
        }
    }

    /// Include another adapter, typically storage, in `GET /health`.
    pub fn with_health_source(mut self, adapter: Arc<dyn PluginAdapter>) -> Self {
        self.health_sources.push(adapter);
        self
    }

    pub fn with_ingress(mut self, ingress: BridgeIngress) -> Self {
        self.ingress = Some(ingress);
        self
    }
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&GatewayConfig> for ServerConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Build the gateway router.
///
/// - GET /health (no auth)
/// - /api/* operator routes (bearer auth)
/// - POST /bridge/events (bearer auth)
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/status", get(handlers::get_status))
        .route("/api/conversations", get(handlers::list_conversations))
        .route("/api/conversation/{contact}", get(handlers::get_conversation))
        .route(
            "/api/conversation/{contact}/history",
            get(handlers::get_history),
        )
        .route(
            "/api/conversation/{contact}/reset",
            post(handlers::reset_conversation),
        )
        .route(
            "/api/conversation/{contact}/unblock",
            post(handlers::unblock_contact),
        )
        .route(
            "/api/conversation/{contact}/forward",
            post(handlers::forward_to_human),
        )
        .route("/api/send-message", post(handlers::send_message))
        .route("/api/maintenance/run", post(handlers::run_maintenance))
        .route("/api/blocked", get(handlers::list_blocked))
        .route("/bridge/events", post(handlers::post_bridge_event))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server and serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), IntakeError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| IntakeError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| IntakeError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway server stopped");
    Ok(())
}
