use super::models::{
    self as reference_records, Reference, ReferenceUpload, SampleOutRequest, SampleOutResponse,
};
use crate::common::errors::{BusinessError, DbErrorExt};
use crate::common::models::attachment_disposition;
use crate::common::state::AppState;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, IntoActiveModel, QueryOrder};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_references))
        .routes(routes!(add_reference))
        .routes(routes!(mark_sample_out))
        .routes(routes!(download_document))
        .with_state(state.clone())
}

struct UploadedDocument {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

fn bad_multipart(e: impl std::fmt::Display) -> BusinessError {
    BusinessError::validation("document", format!("Invalid multipart body: {e}"))
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "All references, newest first", body = Vec<Reference>)
    ),
    security(()),
    tag = "references"
)]
pub async fn list_references(
    State(state): State<AppState>,
) -> Result<Json<Vec<Reference>>, BusinessError> {
    let references = reference_records::Entity::find()
        .order_by_desc(reference_records::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(|e| e.to_business_error("reference"))?;

    Ok(Json(references.into_iter().map(Reference::from).collect()))
}

#[utoipa::path(
    post,
    path = "/add",
    request_body(content = ReferenceUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Reference created", body = Reference),
        (status = 400, description = "Missing reference number or malformed upload")
    ),
    security(()),
    tag = "references"
)]
pub async fn add_reference(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Reference>), BusinessError> {
    let mut ref_number: Option<String> = None;
    let mut document: Option<UploadedDocument> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("refNumber") => {
                ref_number = Some(field.text().await.map_err(bad_multipart)?);
            }
            Some("document") => {
                let file_name = field.file_name().unwrap_or("document").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?.to_vec();
                if !bytes.is_empty() {
                    document = Some(UploadedDocument {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            _ => {}
        }
    }

    let ref_number = crate::common::models::non_blank(ref_number)
        .ok_or_else(|| BusinessError::validation("refNumber", "Please enter a reference number"))?;

    let model = reference_records::ActiveModel {
        id: Set(Uuid::new_v4()),
        ref_number: Set(ref_number),
        file_name: Set(document.as_ref().map(|d| d.file_name.clone())),
        content_type: Set(document.as_ref().map(|d| d.content_type.clone())),
        file_data: Set(document.as_ref().map(|d| STANDARD.encode(&d.bytes))),
        sample_out: Set(false),
        sample_out_at: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(&state.db)
    .await
    .map_err(|e| e.to_business_error("reference"))?;

    tracing::info!(ref_number = %model.ref_number, has_document = model.file_data.is_some(), "Created reference");
    Ok((StatusCode::CREATED, Json(Reference::from(model))))
}

#[utoipa::path(
    post,
    path = "/sample-out",
    request_body = SampleOutRequest,
    responses(
        (status = 200, description = "Reference marked as sample out", body = SampleOutResponse),
        (status = 404, description = "Reference not found")
    ),
    security(()),
    tag = "references"
)]
pub async fn mark_sample_out(
    State(state): State<AppState>,
    Json(request): Json<SampleOutRequest>,
) -> Result<Json<SampleOutResponse>, BusinessError> {
    let model = reference_records::Entity::find_by_id(request.id)
        .one(&state.db)
        .await
        .map_err(|e| e.to_business_error("reference"))?
        .ok_or_else(|| BusinessError::not_found("reference", request.id))?;

    // Already out: keep the original timestamp
    let model = if model.sample_out {
        model
    } else {
        let mut active = model.into_active_model();
        active.sample_out = Set(true);
        active.sample_out_at = Set(Some(Utc::now()));
        active
            .update(&state.db)
            .await
            .map_err(|e| e.to_business_error("reference"))?
    };

    Ok(Json(SampleOutResponse {
        message: format!("Reference {} marked as sample out", model.ref_number),
        reference: Reference::from(model),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}/document",
    params(("id" = Uuid, Path, description = "Reference id")),
    responses(
        (status = 200, description = "The uploaded document", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 404, description = "Reference or document not found")
    ),
    security(()),
    tag = "references"
)]
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, BusinessError> {
    let model = reference_records::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(|e| e.to_business_error("reference"))?
        .ok_or_else(|| BusinessError::not_found("reference", id))?;

    let Some(file_data) = model.file_data else {
        return Err(BusinessError::not_found("reference document", id));
    };
    let bytes = STANDARD
        .decode(file_data)
        .map_err(|e| BusinessError::internal(format!("Stored document is not valid base64: {e}")))?;

    let file_name = model.file_name.unwrap_or_else(|| "document".to_string());
    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                model
                    .content_type
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
            ),
            (header::CONTENT_DISPOSITION, attachment_disposition(&file_name)),
        ],
        bytes,
    )
        .into_response())
}
