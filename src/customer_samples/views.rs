use super::models::{
    self as customer_samples, CustomerSample, CustomerSampleCreate, CustomerSampleCreated,
};
use crate::common::errors::{BusinessError, DbErrorExt};
use crate::common::models::MessageResponse;
use crate::common::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_customer_samples))
        .routes(routes!(add_customer_sample))
        .routes(routes!(delete_customer_sample))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "All customer samples, newest first", body = Vec<CustomerSample>)
    ),
    security(()),
    tag = "customer samples"
)]
pub async fn list_customer_samples(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerSample>>, BusinessError> {
    let samples = customer_samples::Entity::find()
        .order_by_desc(customer_samples::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(|e| e.to_business_error("customer_sample"))?;

    Ok(Json(samples.into_iter().map(CustomerSample::from).collect()))
}

#[utoipa::path(
    post,
    path = "/add",
    request_body = CustomerSampleCreate,
    responses(
        (status = 201, description = "Customer sample added", body = CustomerSampleCreated),
        (status = 400, description = "Invalid customer sample"),
        (status = 409, description = "Reference number already exists")
    ),
    security(()),
    tag = "customer samples"
)]
pub async fn add_customer_sample(
    State(state): State<AppState>,
    Json(payload): Json<CustomerSampleCreate>,
) -> Result<(StatusCode, Json<CustomerSampleCreated>), BusinessError> {
    let sample = payload.validate()?;

    let model = customer_samples::ActiveModel {
        id: Set(Uuid::new_v4()),
        reference_number: Set(sample.reference_number),
        quantity: Set(sample.quantity),
        grade: Set(sample.grade),
        sample_date: Set(sample.date),
        sample_time: Set(sample.time),
        created_at: Set(Utc::now()),
    }
    .insert(&state.db)
    .await
    .map_err(|e| e.to_business_error("customer_sample"))?;

    Ok((
        StatusCode::CREATED,
        Json(CustomerSampleCreated {
            message: format!("Sample {} added successfully", model.reference_number),
            sample: CustomerSample::from(model),
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/{reference_number}",
    params(("reference_number" = String, Path, description = "Reference number of the sample")),
    responses(
        (status = 200, description = "Customer sample deleted", body = MessageResponse),
        (status = 404, description = "No sample with this reference number")
    ),
    security(()),
    tag = "customer samples"
)]
pub async fn delete_customer_sample(
    State(state): State<AppState>,
    Path(reference_number): Path<String>,
) -> Result<Json<MessageResponse>, BusinessError> {
    let result = customer_samples::Entity::delete_many()
        .filter(customer_samples::Column::ReferenceNumber.eq(reference_number.as_str()))
        .exec(&state.db)
        .await
        .map_err(|e| e.to_business_error("customer_sample"))?;

    if result.rows_affected == 0 {
        return Err(BusinessError::not_found("customer sample", reference_number));
    }

    tracing::info!(%reference_number, "Deleted customer sample");
    Ok(Json(MessageResponse {
        message: format!("Sample {reference_number} deleted successfully"),
    }))
}
