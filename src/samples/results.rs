use sea_orm::entity::prelude::*;
use uuid::Uuid;

/// One analysis results row; `position` keeps the order the client sent
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sample_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sample_id: Uuid,
    pub position: i32,
    #[sea_orm(column_type = "Text")]
    pub as_ppb: String,
    #[sea_orm(column_type = "Text")]
    pub sb_ppb: String,
    #[sea_orm(column_type = "Text")]
    pub al_ppb: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::models::Entity",
        from = "Column::SampleId",
        to = "super::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Samples,
}

impl Related<super::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Samples.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
