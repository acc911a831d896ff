// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the operator API and the bridge ingress.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use intake_core::{ChannelStatus, HealthStatus, IntakeError, LoggedMessage, Session};
use intake_engine::{
    ConversationState, ConversationSummary, ExcludedContact, MaintenanceReport,
};

use crate::bridge::{BridgeEvent, normalize_contact};
use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// An engine error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(IntakeError);

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            IntakeError::NotFound { .. } => StatusCode::NOT_FOUND,
            IntakeError::ContactBusy { .. } => StatusCode::CONFLICT,
            IntakeError::Channel { .. } => StatusCode::SERVICE_UNAVAILABLE,
            IntakeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "operator request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Body extraction failures share the `ErrorResponse` shape with every other error.
fn rejected(rejection: JsonRejection) -> Response {
    error_response(rejection.status(), rejection.body_text())
}

/// Accepts either a contact id or a transport chat id (`5511...@c.us`).
///
/// Group chats never have a conversation, so they resolve to not found.
fn contact_id(raw: &str) -> Result<String, ApiError> {
    normalize_contact(raw.trim()).ok_or_else(|| {
        ApiError(IntakeError::NotFound {
            contact: raw.to_string(),
        })
    })
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Worst status across `components`.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub components: Vec<ComponentHealth>,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    fn new(name: &str, health: HealthStatus) -> Self {
        let (status, detail) = match health {
            HealthStatus::Healthy => ("healthy", None),
            HealthStatus::Degraded(reason) => ("degraded", Some(reason)),
            HealthStatus::Unhealthy(reason) => ("unhealthy", Some(reason)),
        };
        Self {
            name: name.to_string(),
            status: status.to_string(),
            detail,
        }
    }

    fn severity(&self) -> u8 {
        match self.status.as_str() {
            "healthy" => 0,
            "degraded" => 1,
            _ => 2,
        }
    }
}

/// Response body for GET /api/status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub bot: String,
    pub channel: ChannelStatus,
    pub ready: bool,
    /// Pairing artifact, present only while the transport waits to be paired.
    pub pairing_code: Option<String>,
    /// Contacts with a step running right now.
    pub in_flight: usize,
    pub uptime_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Request body for POST /api/send-message.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub contact: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub delivered: bool,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
}

/// GET /health (unauthenticated)
///
/// Probes every registered adapter. A failed probe counts as unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let mut components = Vec::with_capacity(state.health_sources.len());
    for adapter in &state.health_sources {
        let health = adapter
            .health_check()
            .await
            .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
        components.push(ComponentHealth::new(adapter.name(), health));
    }

    let status = match components.iter().map(ComponentHealth::severity).max() {
        Some(2) => "unhealthy",
        Some(1) => "degraded",
        _ => "healthy",
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        components,
    })
}

/// GET /api/status
pub async fn get_status(State(state): State<GatewayState>) -> Json<StatusResponse> {
    let channel = state.engine.channel_status();
    Json(StatusResponse {
        bot: state.bot_name.clone(),
        ready: channel.is_ready(),
        pairing_code: channel.pairing_code().map(str::to_string),
        channel,
        in_flight: state.engine.guard().len(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<GatewayState>,
) -> ApiResult<Vec<ConversationSummary>> {
    Ok(Json(state.engine.list_conversations().await?))
}

/// GET /api/conversation/{contact}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(contact): Path<String>,
) -> ApiResult<ConversationState> {
    let contact = contact_id(&contact)?;
    Ok(Json(state.engine.get_conversation_state(&contact).await?))
}

/// GET /api/conversation/{contact}/history?limit=N
pub async fn get_history(
    State(state): State<GatewayState>,
    Path(contact): Path<String>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Vec<LoggedMessage>> {
    let contact = contact_id(&contact)?;
    let limit = params.limit.filter(|l| *l > 0);
    Ok(Json(
        state
            .engine
            .get_conversation_history(&contact, limit)
            .await?,
    ))
}

/// POST /api/conversation/{contact}/reset
pub async fn reset_conversation(
    State(state): State<GatewayState>,
    Path(contact): Path<String>,
) -> ApiResult<Session> {
    let contact = contact_id(&contact)?;
    Ok(Json(state.engine.reset_conversation(&contact).await?))
}

/// POST /api/conversation/{contact}/unblock
pub async fn unblock_contact(
    State(state): State<GatewayState>,
    Path(contact): Path<String>,
) -> ApiResult<Session> {
    let contact = contact_id(&contact)?;
    Ok(Json(state.engine.unblock_contact(&contact).await?))
}

/// POST /api/conversation/{contact}/forward
pub async fn forward_to_human(
    State(state): State<GatewayState>,
    Path(contact): Path<String>,
) -> ApiResult<Session> {
    let contact = contact_id(&contact)?;
    Ok(Json(state.engine.forward_to_human(&contact).await?))
}

/// POST /api/send-message
pub async fn send_message(
    State(state): State<GatewayState>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return rejected(rejection),
    };
    if body.contact.trim().is_empty() || body.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "contact and text are required");
    }
    let Some(contact) = normalize_contact(body.contact.trim()) else {
        return error_response(StatusCode::BAD_REQUEST, "group chats cannot be messaged");
    };

    let delivered = state.engine.send_custom_message(&contact, &body.text).await;
    let status = if delivered {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(SendMessageResponse { delivered })).into_response()
}

/// POST /api/maintenance/run
pub async fn run_maintenance(State(state): State<GatewayState>) -> ApiResult<MaintenanceReport> {
    Ok(Json(state.engine.trigger_maintenance_now().await?))
}

/// GET /api/blocked
pub async fn list_blocked(State(state): State<GatewayState>) -> ApiResult<Vec<ExcludedContact>> {
    Ok(Json(state.engine.list_excluded().await?))
}

/// POST /bridge/events
pub async fn post_bridge_event(
    State(state): State<GatewayState>,
    event: Result<Json<BridgeEvent>, JsonRejection>,
) -> Response {
    let Some(ingress) = &state.ingress else {
        return error_response(StatusCode::NOT_FOUND, "bridge channel not enabled");
    };
    let event = match event {
        Ok(Json(event)) => event,
        Err(rejection) => return rejected(rejection),
    };

    match ingress.accept(event).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true })).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
