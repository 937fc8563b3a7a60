//! Administrative account management.

mod dto;
pub mod handlers;
mod services;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
