use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};

/// Asset availability. Only checkout, maintenance and the retire/reinstate
/// operations move an asset between these states.
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
pub enum AssetStatus {
    #[sea_orm(string_value = "Available")]
    #[strum(serialize = "Available")]
    Available,
    #[sea_orm(string_value = "In-use")]
    #[serde(rename = "In-use")]
    #[strum(serialize = "In-use")]
    InUse,
    #[sea_orm(string_value = "Maintenance")]
    #[strum(serialize = "Maintenance")]
    Maintenance,
    #[sea_orm(string_value = "Out of Service")]
    #[serde(rename = "Out of Service")]
    #[strum(serialize = "Out of Service")]
    OutOfService,
}

impl AssetStatus {
    pub const ALL: [AssetStatus; 4] = [
        AssetStatus::Available,
        AssetStatus::InUse,
        AssetStatus::Maintenance,
        AssetStatus::OutOfService,
    ];
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub serial_number: String,
    pub asset_type: String,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_cost: Option<f64>,
    pub location: String,
    pub status: AssetStatus,
    pub condition: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub qr_code: Option<String>,
    /// Composite this asset is a component of
    pub parent_id: Option<i32>,
    pub last_updated: DateTime<Utc>,
}

impl Model {
    pub fn is_component(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Parent,
    #[sea_orm(has_many = "super::checkout::Entity")]
    Checkouts,
    #[sea_orm(has_many = "super::maintenance::Entity")]
    Maintenance,
    #[sea_orm(has_many = "super::asset_transfer::Entity")]
    Transfers,
}

impl Related<super::checkout::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Checkouts.def()
    }
}

impl Related<super::maintenance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Maintenance.def()
    }
}

impl Related<super::asset_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transfers.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        active_model.last_updated = Set(Utc::now());
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_labels_round_trip() {
        for status in AssetStatus::ALL {
            let label = status.to_string();
            assert_eq!(AssetStatus::from_str(&label).unwrap(), status);
        }
        assert_eq!(AssetStatus::InUse.to_string(), "In-use");
        assert_eq!(AssetStatus::OutOfService.to_string(), "Out of Service");
    }
}
