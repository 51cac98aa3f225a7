//! HTTP control surface
//!
//! One POST route per command. Every route goes through the gateway; nothing
//! here touches the drone directly.

use crate::gateway::Gateway;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use flightdeck_shared::{Command, CommandError, Outcome};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Body returned by every control route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    fn success() -> Self {
        Self {
            message: "success".into(),
            error: None,
        }
    }

    fn failed(cause: &CommandError) -> Self {
        Self {
            message: "failed".into(),
            error: Some(cause.to_string()),
        }
    }
}

pub fn router(gateway: Gateway) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/takeoff", post(take_off))
        .route("/land", post(land))
        .route("/commands/:name", post(run_named))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

async fn health() -> Json<CommandResponse> {
    Json(CommandResponse {
        message: "ok".into(),
        error: None,
    })
}

async fn take_off(State(gateway): State<Gateway>) -> (StatusCode, Json<CommandResponse>) {
    info!("Command takeOff...");
    respond("taking off", gateway.submit(Command::TakeOff).await)
}

async fn land(State(gateway): State<Gateway>) -> (StatusCode, Json<CommandResponse>) {
    info!("Command land...");
    respond("landing", gateway.submit(Command::Land).await)
}

async fn run_named(
    State(gateway): State<Gateway>,
    Path(name): Path<String>,
) -> (StatusCode, Json<CommandResponse>) {
    info!("Command {}...", name);
    respond(&name, gateway.submit_tag(&name).await)
}

fn respond(action: &str, outcome: Outcome) -> (StatusCode, Json<CommandResponse>) {
    match outcome {
        Ok(()) => (StatusCode::OK, Json(CommandResponse::success())),
        Err(e) => {
            warn!("Error {}: {}", action, e);
            (status_for(&e), Json(CommandResponse::failed(&e)))
        }
    }
}

fn status_for(error: &CommandError) -> StatusCode {
    match error {
        CommandError::Device(_) | CommandError::Unrecognized(_) => StatusCode::BAD_REQUEST,
        CommandError::Unresponsive(_) => StatusCode::GATEWAY_TIMEOUT,
        CommandError::Closed => StatusCode::SERVICE_UNAVAILABLE,
    }
}
