use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::models::non_blank;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const CHEMICAL_NAMES: [&str; 7] = [
    "Hydrochloric Acid",
    "Sulfuric Acid",
    "Ethanol",
    "Sodium Hydroxide",
    "Ammonia Solution",
    "Acetone",
    OTHER_CHEMICAL,
];

pub const OTHER_CHEMICAL: &str = "Other";

pub const HAND_OVER_RANGES: [&str; 5] = [
    "Within 1 Week",
    "Within 2 Weeks",
    "Within 3 Weeks",
    "Within 1 Month",
    "Fixed Date",
];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "chemical_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub chemical_name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub custom_chemical: Option<String>,
    pub quantity: String,
    pub hand_over_range: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChemicalRequest {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub chemical_name: String,
    pub custom_chemical: Option<String>,
    pub quantity: String,
    pub hand_over_range: String,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for ChemicalRequest {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            chemical_name: model.chemical_name,
            custom_chemical: model.custom_chemical,
            quantity: model.quantity,
            hand_over_range: model.hand_over_range,
            created_at: model.created_at,
        }
    }
}

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChemicalRequestCreate {
    pub chemical_name: Option<String>,
    pub custom_chemical: Option<String>,
    pub quantity: Option<String>,
    pub hand_over_range: Option<String>,
}

/// A request that passed validation; `custom_chemical` is only kept for "Other"
#[derive(Debug, PartialEq, Eq)]
pub struct ValidChemicalRequest {
    pub chemical_name: String,
    pub custom_chemical: Option<String>,
    pub quantity: String,
    pub hand_over_range: String,
}

impl ChemicalRequestCreate {
    pub fn validate(self) -> BusinessResult<ValidChemicalRequest> {
        let chemical_name = non_blank(self.chemical_name)
            .ok_or_else(|| BusinessError::validation("chemicalName", "Chemical name is required"))?;
        if !CHEMICAL_NAMES.contains(&chemical_name.as_str()) {
            return Err(BusinessError::validation(
                "chemicalName",
                format!("Unknown chemical '{chemical_name}'"),
            ));
        }

        let custom_chemical = if chemical_name == OTHER_CHEMICAL {
            Some(non_blank(self.custom_chemical).ok_or_else(|| {
                BusinessError::validation("customChemical", "Please specify the chemical")
            })?)
        } else {
            None
        };

        let quantity = non_blank(self.quantity)
            .ok_or_else(|| BusinessError::validation("quantity", "Quantity is required"))?;

        let hand_over_range = non_blank(self.hand_over_range).ok_or_else(|| {
            BusinessError::validation("handOverRange", "Hand over range is required")
        })?;
        if !HAND_OVER_RANGES.contains(&hand_over_range.as_str()) {
            return Err(BusinessError::validation(
                "handOverRange",
                format!("Unknown hand over range '{hand_over_range}'"),
            ));
        }

        Ok(ValidChemicalRequest {
            chemical_name,
            custom_chemical,
            quantity,
            hand_over_range,
        })
    }
}
