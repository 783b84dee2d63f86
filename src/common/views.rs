use super::models::HealthCheck;
use super::models::UIConfiguration;
use crate::common::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(healthz))
        .routes(routes!(get_ui_config))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = OK, description = "Service and database are reachable", body = HealthCheck),
        (status = INTERNAL_SERVER_ERROR, description = "Database is unreachable", body = HealthCheck)
    )
)]
pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthCheck>) {
    if state.db.ping().await.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthCheck {
                status: "error".to_string(),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(HealthCheck {
            status: "ok".to_string(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = OK, description = "Web UI configuration", body = UIConfiguration)
    )
)]
pub async fn get_ui_config(State(state): State<AppState>) -> Json<UIConfiguration> {
    Json(UIConfiguration::from_config(&state.config))
}
