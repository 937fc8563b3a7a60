use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Liveness plus a `SELECT 1` round trip to the database.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    let timestamp = OffsetDateTime::now_utc();
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(Health {
                status: "healthy",
                database: "connected",
                timestamp,
            }),
        ),
        Err(e) => {
            error!(error = %e, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Health {
                    status: "unhealthy",
                    database: "disconnected",
                    timestamp,
                }),
            )
        }
    }
}
