use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::models::non_blank;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const GRADES: [&str; 5] = ["A", "B", "C", "D", "Other"];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "customer_samples")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub reference_number: String,
    pub quantity: String,
    pub grade: String,
    pub sample_date: Option<String>,
    pub sample_time: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSample {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub reference_number: String,
    pub quantity: String,
    pub grade: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for CustomerSample {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            reference_number: model.reference_number,
            quantity: model.quantity,
            grade: model.grade,
            date: model.sample_date,
            time: model.sample_time,
            created_at: model.created_at,
        }
    }
}

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSampleCreate {
    pub reference_number: Option<String>,
    pub quantity: Option<String>,
    pub grade: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ValidCustomerSample {
    pub reference_number: String,
    pub quantity: String,
    pub grade: String,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl CustomerSampleCreate {
    /// Grade defaults to "A" like the intake form
    pub fn validate(self) -> BusinessResult<ValidCustomerSample> {
        let reference_number = non_blank(self.reference_number).ok_or_else(|| {
            BusinessError::validation("referenceNumber", "Reference number is required")
        })?;
        let quantity = non_blank(self.quantity)
            .ok_or_else(|| BusinessError::validation("quantity", "Quantity is required"))?;
        let grade = non_blank(self.grade).unwrap_or_else(|| "A".to_string());
        if !GRADES.contains(&grade.as_str()) {
            return Err(BusinessError::validation(
                "grade",
                format!("Grade must be one of {}", GRADES.join(", ")),
            ));
        }

        Ok(ValidCustomerSample {
            reference_number,
            quantity,
            grade,
            date: non_blank(self.date),
            time: non_blank(self.time),
        })
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CustomerSampleCreated {
    pub message: String,
    pub sample: CustomerSample,
}
