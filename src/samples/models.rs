use crate::common::models::{lenient_string, text_or_list};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "samples")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sequence_number: i32,
    #[sea_orm(unique)]
    pub sample_id: String,
    #[sea_orm(column_type = "Text")]
    pub request_ref_no: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub sample_ref_no: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub origin: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub destination: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub sample_route: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub test_method: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,
    pub sample_in_date: Option<String>,
    pub sample_in_time: Option<String>,
    pub gate_pass_no: Option<String>,
    pub received: bool,
    pub received_date: Option<String>,
    pub received_time: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub analysed_by: Option<String>,
    pub completed_date: Option<String>,
    pub completed_time: Option<String>,
    pub is_finalized: bool,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub notification_sent_at: Option<DateTime<Utc>>,
    pub notification_attempts: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub notification_error: Option<String>,
    /// Set while a report delivery owns the sample
    pub notification_in_flight: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::results::Entity")]
    Results,
    #[sea_orm(
        belongs_to = "crate::users::models::Entity",
        from = "Column::CreatedBy",
        to = "crate::users::models::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Users,
}

impl Related<super::results::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Results.def()
    }
}

impl Related<crate::users::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Display id derived from the sequence number, e.g. `SMP-00042`
pub fn display_id(sequence_number: i32) -> String {
    format!("SMP-{sequence_number:05}")
}

/// One row of the analysis results table, in parts per billion
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultRow {
    #[serde(rename = "As_ppb", default, deserialize_with = "lenient_string")]
    pub as_ppb: String,
    #[serde(rename = "Sb_ppb", default, deserialize_with = "lenient_string")]
    pub sb_ppb: String,
    #[serde(rename = "Al_ppb", default, deserialize_with = "lenient_string")]
    pub al_ppb: String,
}

impl From<super::results::Model> for ResultRow {
    fn from(row: super::results::Model) -> Self {
        Self {
            as_ppb: row.as_ppb,
            sb_ppb: row.sb_ppb,
            al_ppb: row.al_ppb,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Created,
    Received,
    ResultsEntered,
    Finalized,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStatus {
    pub sent_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub sample_id: String,
    pub request_ref_no: String,
    pub sample_ref_no: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sample_route: Option<String>,
    pub test_method: Option<String>,
    pub remarks: Option<String>,
    pub sample_in_date: Option<String>,
    pub sample_in_time: Option<String>,
    pub gate_pass_no: Option<String>,
    pub received: bool,
    pub sample_received_date: Option<String>,
    pub sample_received_time: Option<String>,
    pub received_date: Option<String>,
    pub received_time: Option<String>,
    pub results: Vec<ResultRow>,
    pub analysed_by: Option<String>,
    pub completed_date: Option<String>,
    pub completed_time: Option<String>,
    pub is_finalized: bool,
    pub finalized_at: Option<DateTime<Utc>>,
    pub status: SampleStatus,
    pub notification: NotificationStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Sample {
    pub fn from_parts(model: Model, results: Vec<ResultRow>) -> Self {
        let status = if model.is_finalized {
            SampleStatus::Finalized
        } else if !results.is_empty() {
            SampleStatus::ResultsEntered
        } else if model.received {
            SampleStatus::Received
        } else {
            SampleStatus::Created
        };

        Self {
            id: model.id,
            sample_id: model.sample_id,
            request_ref_no: model.request_ref_no,
            sample_ref_no: model.sample_ref_no,
            from: model.origin,
            to: model.destination,
            sample_route: model.sample_route,
            test_method: model.test_method,
            remarks: model.remarks,
            sample_in_date: model.sample_in_date,
            sample_in_time: model.sample_in_time,
            gate_pass_no: model.gate_pass_no,
            received: model.received,
            sample_received_date: model.received_date.clone(),
            sample_received_time: model.received_time.clone(),
            received_date: model.received_date,
            received_time: model.received_time,
            results,
            analysed_by: model.analysed_by,
            completed_date: model.completed_date,
            completed_time: model.completed_time,
            is_finalized: model.is_finalized,
            finalized_at: model.finalized_at,
            status,
            notification: NotificationStatus {
                sent_at: model.notification_sent_at,
                attempts: model.notification_attempts,
                last_error: model.notification_error,
            },
            created_by: model.created_by,
            created_at: model.created_at,
            last_updated: model.last_updated,
        }
    }
}

/// The view served without authentication to whoever scans the QR code.
/// Gate pass, intake timestamps, the creator and the notification
/// bookkeeping are withheld.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicSample {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub sample_id: String,
    pub request_ref_no: String,
    pub sample_ref_no: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sample_route: Option<String>,
    pub test_method: Option<String>,
    pub remarks: Option<String>,
    pub received: bool,
    pub sample_received_date: Option<String>,
    pub sample_received_time: Option<String>,
    pub received_date: Option<String>,
    pub received_time: Option<String>,
    pub results: Vec<ResultRow>,
    pub analysed_by: Option<String>,
    pub completed_date: Option<String>,
    pub completed_time: Option<String>,
    pub is_finalized: bool,
    pub status: SampleStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Sample> for PublicSample {
    fn from(sample: Sample) -> Self {
        Self {
            id: sample.id,
            sample_id: sample.sample_id,
            request_ref_no: sample.request_ref_no,
            sample_ref_no: sample.sample_ref_no,
            from: sample.from,
            to: sample.to,
            sample_route: sample.sample_route,
            test_method: sample.test_method,
            remarks: sample.remarks,
            received: sample.received,
            sample_received_date: sample.sample_received_date,
            sample_received_time: sample.sample_received_time,
            received_date: sample.received_date,
            received_time: sample.received_time,
            results: sample.results,
            analysed_by: sample.analysed_by,
            completed_date: sample.completed_date,
            completed_time: sample.completed_time,
            is_finalized: sample.is_finalized,
            status: sample.status,
            created_at: sample.created_at,
        }
    }
}

/// Intake form. Lifecycle fields (`received`, `results`, `isFinalized`, ...)
/// are not part of it and are dropped if sent.
#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SampleCreate {
    pub request_ref_no: Option<String>,
    pub sample_ref_no: Option<String>,
    #[serde(default, deserialize_with = "text_or_list")]
    #[schema(value_type = Option<String>)]
    pub from: Option<String>,
    pub to: Option<String>,
    pub sample_route: Option<String>,
    pub test_method: Option<String>,
    pub remarks: Option<String>,
    pub sample_in_date: Option<String>,
    pub sample_in_time: Option<String>,
    pub gate_pass_no: Option<String>,
}

/// Partial update; absent fields are left untouched
#[derive(ToSchema, Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SampleUpdate {
    pub request_ref_no: Option<String>,
    pub sample_ref_no: Option<String>,
    #[serde(default, deserialize_with = "text_or_list")]
    #[schema(value_type = Option<String>)]
    pub from: Option<String>,
    pub to: Option<String>,
    pub sample_route: Option<String>,
    pub test_method: Option<String>,
    pub remarks: Option<String>,
    pub sample_in_date: Option<String>,
    pub sample_in_time: Option<String>,
    pub gate_pass_no: Option<String>,
    pub received: Option<bool>,
    #[serde(alias = "receivedDate")]
    pub sample_received_date: Option<String>,
    #[serde(alias = "receivedTime")]
    pub sample_received_time: Option<String>,
    pub results: Option<Vec<ResultRow>>,
    pub analysed_by: Option<String>,
    pub completed_date: Option<String>,
    pub completed_time: Option<String>,
    pub is_finalized: Option<bool>,
}

impl SampleUpdate {
    /// Whether the update carries anything besides the finalize flag
    pub fn has_changes_besides_finalize(&self) -> bool {
        self.request_ref_no.is_some()
            || self.sample_ref_no.is_some()
            || self.from.is_some()
            || self.to.is_some()
            || self.sample_route.is_some()
            || self.test_method.is_some()
            || self.remarks.is_some()
            || self.sample_in_date.is_some()
            || self.sample_in_time.is_some()
            || self.gate_pass_no.is_some()
            || self.received.is_some()
            || self.sample_received_date.is_some()
            || self.sample_received_time.is_some()
            || self.results.is_some()
            || self.analysed_by.is_some()
            || self.completed_date.is_some()
            || self.completed_time.is_some()
    }
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ReceivedUpdate {
    pub received: bool,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct SampleListQuery {
    /// Only samples with this received flag
    pub received: Option<bool>,
    /// Only samples with this finalized flag
    pub finalized: Option<bool>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SampleQrCode {
    pub url: String,
    /// PNG image as a `data:image/png;base64,...` URL
    pub qr_code: String,
}
