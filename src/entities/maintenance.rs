use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum MaintenanceStatus {
    #[sea_orm(string_value = "Pending")]
    #[strum(serialize = "Pending")]
    Pending,
    #[sea_orm(string_value = "In Progress")]
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    #[sea_orm(string_value = "Completed")]
    #[strum(serialize = "Completed")]
    Completed,
}

impl MaintenanceStatus {
    pub const ALL: [MaintenanceStatus; 3] = [
        MaintenanceStatus::Pending,
        MaintenanceStatus::InProgress,
        MaintenanceStatus::Completed,
    ];

    pub fn is_open(self) -> bool {
        self != MaintenanceStatus::Completed
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "maintenance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub asset_id: i32,
    pub start_date: DateTime<Utc>,
    /// Set only when the record is completed
    pub end_date: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub cost: Option<f64>,
    pub technician: String,
    pub status: MaintenanceStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::asset::Entity",
        from = "Column::AssetId",
        to = "super::asset::Column::Id",
        on_delete = "Cascade"
    )]
    Asset,
}

impl Related<super::asset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Asset.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
