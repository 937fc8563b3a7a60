//! Chat relay to the AI microservice and the conversation log.

pub mod client;
mod dto;
pub mod handlers;
mod repo;
mod services;

use axum::Router;

use crate::state::AppState;

/// Mounted under `/chat` and, for older clients, `/conversations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/chat", handlers::chat_routes())
        .nest("/conversations", handlers::chat_routes())
}
