use super::models::{
    PublicSample, ReceivedUpdate, Sample, SampleCreate, SampleListQuery, SampleQrCode,
    SampleUpdate,
};
use super::{qr, report, services};
use crate::common::auth::AuthSession;
use crate::common::errors::BusinessError;
use crate::common::models::attachment_disposition;
use crate::common::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_samples, create_sample))
        .routes(routes!(get_sample, update_sample, delete_sample))
        .routes(routes!(set_received))
        .routes(routes!(get_public_sample))
        .routes(routes!(download_report))
        .routes(routes!(get_qr_code))
        .routes(routes!(retry_notification))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/",
    params(SampleListQuery),
    responses(
        (status = 200, description = "All samples in creation order", body = Vec<Sample>),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "samples"
)]
pub async fn list_samples(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(query): Query<SampleListQuery>,
) -> Result<Json<Vec<Sample>>, BusinessError> {
    services::list_samples(&state.db, &query).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/",
    request_body = SampleCreate,
    responses(
        (status = 201, description = "Sample created", body = Sample),
        (status = 400, description = "Request Ref No is missing"),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "samples"
)]
pub async fn create_sample(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<SampleCreate>,
) -> Result<(StatusCode, Json<Sample>), BusinessError> {
    let sample = services::create_sample(&state.db, &session, payload).await?;
    Ok((StatusCode::CREATED, Json(sample)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Sample id")),
    responses(
        (status = 200, description = "The sample", body = Sample),
        (status = 404, description = "Sample not found")
    ),
    tag = "samples"
)]
pub async fn get_sample(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Sample>, BusinessError> {
    services::get_sample(&state.db, id).await.map(Json)
}

#[utoipa::path(
    put,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Sample id")),
    request_body = SampleUpdate,
    responses(
        (status = 200, description = "Updated sample", body = Sample),
        (status = 404, description = "Sample not found"),
        (status = 422, description = "Lifecycle rule violated")
    ),
    tag = "samples"
)]
pub async fn update_sample(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(update): Json<SampleUpdate>,
) -> Result<Json<Sample>, BusinessError> {
    tracing::debug!(%id, user = %session.email, "Updating sample");
    services::update_sample(&state, id, update).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Sample id")),
    responses(
        (status = 204, description = "Sample deleted"),
        (status = 403, description = "Finalized samples can only be deleted by a lab administrator"),
        (status = 404, description = "Sample not found")
    ),
    tag = "samples"
)]
pub async fn delete_sample(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, BusinessError> {
    services::delete_sample(&state.db, &session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/samples/{id}/received",
    params(("id" = Uuid, Path, description = "Sample id")),
    request_body = ReceivedUpdate,
    responses(
        (status = 200, description = "Updated sample", body = Sample),
        (status = 422, description = "Receipt cannot be undone")
    ),
    tag = "samples"
)]
pub async fn set_received(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
    Json(update): Json<ReceivedUpdate>,
) -> Result<Json<Sample>, BusinessError> {
    services::set_received(&state, id, update.received)
        .await
        .map(Json)
}

#[utoipa::path(
    get,
    path = "/public/{id}",
    params(("id" = Uuid, Path, description = "Sample id")),
    responses(
        (status = 200, description = "Redacted sample for the public page", body = PublicSample),
        (status = 404, description = "Sample not found")
    ),
    security(()),
    tag = "samples"
)]
pub async fn get_public_sample(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicSample>, BusinessError> {
    services::get_public_sample(&state.db, id).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/{id}/report",
    params(("id" = Uuid, Path, description = "Sample id")),
    responses(
        (status = 200, description = "PDF report", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Sample not found")
    ),
    tag = "samples"
)]
pub async fn download_report(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Response, BusinessError> {
    let sample = services::get_sample(&state.db, id).await?;
    let pdf = services::render_report(&state, &sample).await?;
    let disposition = attachment_disposition(&report::report_file_name(&sample));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/{id}/qr",
    params(("id" = Uuid, Path, description = "Sample id")),
    responses(
        (status = 200, description = "Public link and its QR code", body = SampleQrCode),
        (status = 404, description = "Sample not found")
    ),
    tag = "samples"
)]
pub async fn get_qr_code(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<SampleQrCode>, BusinessError> {
    // 404 for unknown samples rather than a QR code to nowhere
    let sample = services::get_sample(&state.db, id).await?;
    let url = qr::public_link(&state.config.public_frontend_url, sample.id);
    let qr_code = qr::qr_data_url(&url)?;
    Ok(Json(SampleQrCode { url, qr_code }))
}

#[utoipa::path(
    post,
    path = "/{id}/notify",
    params(("id" = Uuid, Path, description = "Sample id")),
    responses(
        (status = 200, description = "Report delivered, or already delivered earlier", body = Sample),
        (status = 422, description = "Sample is not finalized"),
        (status = 502, description = "Email provider rejected the report")
    ),
    tag = "samples"
)]
pub async fn retry_notification(
    State(state): State<AppState>,
    _session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Sample>, BusinessError> {
    services::retry_notification(&state, id).await.map(Json)
}
