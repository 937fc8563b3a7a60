use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MeResponse, PublicUser, RegisterRequest},
        extractors::AuthUser,
        repo_types::{Role, User},
        services::{authenticate, create_user, CreateUser, JwtKeys},
    },
    extract::Json,
    error::AppResult,
    intake::{dto::IntakeStatus, services as intake},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
        .route("/auth/intake-status", get(intake_status))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let data = CreateUser {
        username: payload.username,
        email: payload.email,
        password: payload.password,
        first_name: payload.first_name,
        last_name: payload.last_name,
        role: Role::User,
    };
    let user = create_user(&state.db, data, None).await?;
    let token = JwtKeys::from_ref(&state).sign(&user)?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully",
            user: PublicUser::from(user),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let (user, token) = authenticate(&state.db, &keys, &payload.username, &payload.password).await?;
    Ok(Json(AuthResponse {
        message: "Login successful",
        user: PublicUser::from(user),
        token,
    }))
}

#[instrument(skip(state, user))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<MeResponse>> {
    let permissions = User::permissions(&state.db, user.id).await?;
    Ok(Json(MeResponse { user, permissions }))
}

#[instrument(skip(state, user))]
pub async fn intake_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<IntakeStatus>> {
    Ok(Json(intake::status(&state.db, user.id).await?))
}
