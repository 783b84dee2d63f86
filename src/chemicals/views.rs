use super::models::{self as chemical_requests, ChemicalRequest, ChemicalRequestCreate};
use crate::common::errors::{BusinessError, DbErrorExt};
use crate::common::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_chemical_requests))
        .routes(routes!(add_chemical_request))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/all",
    responses(
        (status = 200, description = "Chemical requests, newest first", body = Vec<ChemicalRequest>)
    ),
    security(()),
    tag = "chemicals"
)]
pub async fn list_chemical_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChemicalRequest>>, BusinessError> {
    let requests = chemical_requests::Entity::find()
        .order_by_desc(chemical_requests::Column::CreatedAt)
        .order_by_desc(chemical_requests::Column::Id)
        .all(&state.db)
        .await
        .map_err(|e| e.to_business_error("chemical_request"))?;

    Ok(Json(
        requests.into_iter().map(ChemicalRequest::from).collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/add",
    request_body = ChemicalRequestCreate,
    responses(
        (status = 201, description = "Chemical request recorded", body = ChemicalRequest),
        (status = 400, description = "Invalid chemical request")
    ),
    security(()),
    tag = "chemicals"
)]
pub async fn add_chemical_request(
    State(state): State<AppState>,
    Json(payload): Json<ChemicalRequestCreate>,
) -> Result<(StatusCode, Json<ChemicalRequest>), BusinessError> {
    let request = payload.validate()?;

    let model = chemical_requests::ActiveModel {
        id: Set(Uuid::new_v4()),
        chemical_name: Set(request.chemical_name),
        custom_chemical: Set(request.custom_chemical),
        quantity: Set(request.quantity),
        hand_over_range: Set(request.hand_over_range),
        created_at: Set(Utc::now()),
    }
    .insert(&state.db)
    .await
    .map_err(|e| e.to_business_error("chemical_request"))?;

    tracing::info!(chemical = %model.chemical_name, "Recorded chemical request");
    Ok((StatusCode::CREATED, Json(ChemicalRequest::from(model))))
}
