use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::dto::{ChatReply, ChatRequest, ConversationList, ListQuery};
use super::services;
use crate::{
    auth::{
        extractors::AuthUser,
        permissions::{require_permission, Permission},
    },
    extract::{Json, Query},
    error::AppResult,
    state::AppState,
};

/// Routes relative to the mount point; see [`super::router`].
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(send_message))
        .route("/conversations", get(all_conversations))
        .route("/conversations/my", get(my_conversations))
}

#[instrument(skip(state, user, req))]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ChatRequest>,
) -> AppResult<Json<ChatReply>> {
    require_permission(&state.db, &user, Permission::ChatCreate).await?;
    let reply = services::send_message(
        &state.db,
        state.ai.as_ref(),
        state.config.ai.history_turns,
        user.id,
        &req.message,
    )
    .await?;
    Ok(Json(reply))
}

#[instrument(skip(state, user))]
pub async fn all_conversations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<ConversationList>> {
    require_permission(&state.db, &user, Permission::ChatRead).await?;
    let conversations = services::all_conversations(&state.db, q.limit()).await?;
    Ok(Json(ConversationList { conversations }))
}

#[instrument(skip(state, user))]
pub async fn my_conversations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<ConversationList>> {
    let conversations = services::user_conversations(&state.db, user.id, q.limit()).await?;
    Ok(Json(ConversationList { conversations }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn chat_routes_require_a_token() {
        for (method, uri) in [
            ("POST", "/chat"),
            ("GET", "/chat/conversations"),
            ("GET", "/chat/conversations/my"),
            ("POST", "/conversations"),
            ("GET", "/conversations/conversations/my"),
        ] {
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(r#"{"message":"hi"}"#))
                .unwrap();
            let res = crate::chat::router()
                .with_state(AppState::fake())
                .oneshot(req)
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }
}
