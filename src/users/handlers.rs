use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    CreateUserRequest, MessageResponse, Pagination, UpdateUserRequest, UserCreated, UserDetail,
    UserList, UserUpdated,
};
use super::services;
use crate::{
    auth::{
        dto::PublicUser,
        extractors::AuthUser,
        permissions::{require_permission, Permission},
        repo_types::{Role, User},
        services::{create_user as register_user, CreateUser},
    },
    extract::{Json, Path, Query},
    error::AppResult,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, caller))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(p): Query<Pagination>,
) -> AppResult<Json<UserList>> {
    require_permission(&state.db, &caller, Permission::UsersRead).await?;
    let (limit, offset) = p.clamped();
    let users = services::list_users(&state.db, limit, offset).await?;
    Ok(Json(UserList { users }))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserCreated>)> {
    require_permission(&state.db, &caller, Permission::UsersCreate).await?;
    let data = CreateUser {
        username: payload.username,
        email: payload.email,
        password: payload.password,
        first_name: payload.first_name,
        last_name: payload.last_name,
        role: payload.role.unwrap_or(Role::User),
    };
    let user = register_user(&state.db, data, Some(caller.id)).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserCreated {
            message: "User created successfully",
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, caller))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserDetail>> {
    require_permission(&state.db, &caller, Permission::UsersRead).await?;
    let user = services::get_user(&state.db, id).await?;
    let permissions = User::permissions(&state.db, id).await?;
    Ok(Json(UserDetail { user, permissions }))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserUpdated>> {
    require_permission(&state.db, &caller, Permission::UsersUpdate).await?;
    let user = services::update_user(&state.db, id, payload, caller.id).await?;
    Ok(Json(UserUpdated {
        message: "User updated successfully",
        user,
    }))
}

#[instrument(skip(state, caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    require_permission(&state.db, &caller, Permission::UsersDelete).await?;
    services::deactivate_user(&state.db, id, caller.id).await?;
    Ok(Json(MessageResponse {
        message: "User deactivated successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn user_routes_require_a_token() {
        let id = Uuid::new_v4();
        for (method, uri) in [
            ("GET", "/users".to_string()),
            ("POST", "/users".to_string()),
            ("GET", format!("/users/{id}")),
            ("PUT", format!("/users/{id}")),
            ("DELETE", format!("/users/{id}")),
        ] {
            let req = Request::builder()
                .method(method)
                .uri(&uri)
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap();
            let res = user_routes()
                .with_state(AppState::fake())
                .oneshot(req)
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }
}
