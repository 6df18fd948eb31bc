use axum::Json;

use crate::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("contacts-api", env!("CARGO_PKG_VERSION")))
}
