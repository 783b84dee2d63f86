use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reference_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub ref_number: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    /// Base64 encoded document
    #[sea_orm(column_type = "Text", nullable)]
    pub file_data: Option<String>,
    pub sample_out: bool,
    pub sample_out_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub ref_number: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    /// Base64 encoded document, downloadable by the client as-is
    pub file_data: Option<String>,
    pub sample_out: bool,
    pub sample_out_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for Reference {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            ref_number: model.ref_number,
            file_name: model.file_name,
            content_type: model.content_type,
            file_data: model.file_data,
            sample_out: model.sample_out,
            sample_out_at: model.sample_out_at,
            created_at: model.created_at,
        }
    }
}

/// Multipart form accepted by `POST /api/reference/add`
#[derive(ToSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)] // Only describes the form in the API docs
pub struct ReferenceUpload {
    pub ref_number: String,
    #[schema(value_type = Option<String>, format = Binary)]
    pub document: Option<Vec<u8>>,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct SampleOutRequest {
    pub id: Uuid,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SampleOutResponse {
    pub message: String,
    pub reference: Reference,
}
