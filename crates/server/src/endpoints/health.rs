//! # /health ハンドラ

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use photomint_types::{HealthResponse, MAX_PAYLOAD_SIZE, PAYLOAD_VERSION, SERVICE_NAME};

use crate::config::ServiceState;

/// GET /health
pub async fn handle_health(State(state): State<Arc<ServiceState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: PAYLOAD_VERSION.to_string(),
        method: state.config.method.clone(),
        max_payload_size: MAX_PAYLOAD_SIZE,
    })
}
