use super::models::{LoginRequest, LoginResponse, RegisterRequest, User};
use super::services;
use crate::common::auth::AuthSession;
use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(register))
        .routes(routes!(me))
        .with_state(state.clone())
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed token and user", body = LoginResponse),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "users"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, BusinessError> {
    services::login(&state.db, &state.config, &request.email, &request.password)
        .await
        .map(Json)
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid user data"),
        (status = 403, description = "Only lab administrators may register users"),
        (status = 409, description = "Email already registered")
    ),
    tag = "users"
)]
pub async fn register(
    State(state): State<AppState>,
    session: AuthSession,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), BusinessError> {
    let user = services::register(&state.db, &state.config, &session, request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The authenticated user", body = User),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "users"
)]
pub async fn me(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<User>, BusinessError> {
    services::get_user(&state.db, session.user_id).await.map(Json)
}
