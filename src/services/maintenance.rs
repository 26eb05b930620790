use crate::{
    db::DbPool,
    entities::{asset, checkout, maintenance, MaintenanceStatus},
    errors::ServiceError,
    lifecycle::TransitionError,
    services::asset_names,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Fields shared by the add and update forms
#[derive(Debug, Clone)]
pub struct MaintenanceDetails {
    pub description: String,
    pub technician: String,
    pub cost: Option<f64>,
    pub status: MaintenanceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceRow {
    pub record: maintenance::Model,
    pub asset_name: String,
}

pub struct MaintenanceService {
    db: Arc<DbPool>,
}

impl MaintenanceService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Opens a record and puts the asset into Maintenance
    #[instrument(skip(self, details))]
    pub async fn create(
        &self,
        asset_id: i32,
        details: MaintenanceDetails,
    ) -> Result<maintenance::Model, ServiceError> {
        let details = check_details(details)?;
        if !details.status.is_open() {
            return Err(ServiceError::field(
                "status",
                "New maintenance records start as Pending or In Progress.",
            ));
        }

        let created = self
            .db
            .transaction::<_, maintenance::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let asset = asset::Entity::find_by_id(asset_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Asset", asset_id))?;
                    let next = asset.status.begin_maintenance()?;

                    let on_loan = checkout::Entity::find()
                        .filter(checkout::Column::AssetId.eq(asset_id))
                        .filter(checkout::Column::ActualReturn.is_null())
                        .count(txn)
                        .await?;
                    if on_loan > 0 {
                        return Err(TransitionError::CheckedOut.into());
                    }

                    let open = maintenance::Entity::find()
                        .filter(maintenance::Column::AssetId.eq(asset_id))
                        .filter(maintenance::Column::Status.ne(MaintenanceStatus::Completed))
                        .count(txn)
                        .await?;
                    if open > 0 {
                        return Err(ServiceError::InvalidOperation(format!(
                            "{} already has an open maintenance record.",
                            asset.name
                        )));
                    }

                    set_asset_status(txn, asset_id, next).await?;
                    let record = maintenance::ActiveModel {
                        asset_id: Set(asset_id),
                        start_date: Set(Utc::now()),
                        end_date: Set(None),
                        description: Set(details.description),
                        cost: Set(details.cost),
                        technician: Set(details.technician),
                        status: Set(details.status),
                        ..Default::default()
                    };
                    Ok(record.insert(txn).await?)
                })
            })
            .await?;

        info!(maintenance_id = created.id, asset_id, status = %created.status, "maintenance opened");
        Ok(created)
    }

    /// Applies edits and a status move, keeping the asset in step
    #[instrument(skip(self, details))]
    pub async fn update(
        &self,
        id: i32,
        details: MaintenanceDetails,
    ) -> Result<maintenance::Model, ServiceError> {
        let details = check_details(details)?;

        let updated = self
            .db
            .transaction::<_, maintenance::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let record = maintenance::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Maintenance record", id))?;
                    let step = record.status.transition_to(details.status)?;
                    let asset_id = record.asset_id;

                    let mut model = record.into_active_model();
                    model.description = Set(details.description);
                    model.technician = Set(details.technician);
                    model.cost = Set(details.cost);
                    model.status = Set(step.status);
                    if step.sets_end_date {
                        model.end_date = Set(Some(Utc::now()));
                    }
                    let updated = model.update(txn).await?;

                    set_asset_status(txn, asset_id, step.asset_status).await?;
                    Ok(updated)
                })
            })
            .await?;

        info!(maintenance_id = id, status = %updated.status, "maintenance updated");
        Ok(updated)
    }

    /// Marks the record Completed and returns the asset to service
    #[instrument(skip(self))]
    pub async fn complete(&self, id: i32) -> Result<maintenance::Model, ServiceError> {
        let record = self.get(id).await?;
        self.update(
            id,
            MaintenanceDetails {
                description: record.description,
                technician: record.technician,
                cost: record.cost,
                status: MaintenanceStatus::Completed,
            },
        )
        .await
    }

    pub async fn get(&self, id: i32) -> Result<maintenance::Model, ServiceError> {
        maintenance::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Maintenance record", id))
    }

    pub async fn row(&self, id: i32) -> Result<MaintenanceRow, ServiceError> {
        let record = self.get(id).await?;
        self.rows(vec![record])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Maintenance record", id))
    }

    /// Records in one status, newest first
    #[instrument(skip(self))]
    pub async fn list(&self, status: MaintenanceStatus) -> Result<Vec<MaintenanceRow>, ServiceError> {
        let records = maintenance::Entity::find()
            .filter(maintenance::Column::Status.eq(status))
            .order_by_desc(maintenance::Column::StartDate)
            .order_by_desc(maintenance::Column::Id)
            .all(&*self.db)
            .await?;
        self.rows(records).await
    }

    pub async fn for_asset(&self, asset_id: i32) -> Result<Vec<maintenance::Model>, ServiceError> {
        Ok(maintenance::Entity::find()
            .filter(maintenance::Column::AssetId.eq(asset_id))
            .order_by_desc(maintenance::Column::StartDate)
            .all(&*self.db)
            .await?)
    }

    pub async fn count_pending(&self) -> Result<u64, ServiceError> {
        Ok(maintenance::Entity::find()
            .filter(maintenance::Column::Status.eq(MaintenanceStatus::Pending))
            .count(&*self.db)
            .await?)
    }

    async fn rows(
        &self,
        records: Vec<maintenance::Model>,
    ) -> Result<Vec<MaintenanceRow>, ServiceError> {
        maintenance_rows(&*self.db, records).await
    }
}

/// Attaches asset names to maintenance records
pub(crate) async fn maintenance_rows<C: ConnectionTrait>(
    db: &C,
    records: Vec<maintenance::Model>,
) -> Result<Vec<MaintenanceRow>, ServiceError> {
    let names = asset_names(db, records.iter().map(|r| r.asset_id)).await?;
    Ok(records
        .into_iter()
        .map(|record| MaintenanceRow {
            asset_name: names
                .get(&record.asset_id)
                .cloned()
                .unwrap_or_else(|| format!("Asset #{}", record.asset_id)),
            record,
        })
        .collect())
}

fn check_details(details: MaintenanceDetails) -> Result<MaintenanceDetails, ServiceError> {
    let description = details.description.trim().to_string();
    if description.is_empty() {
        return Err(ServiceError::field("description", "Description is required."));
    }
    let technician = details.technician.trim().to_string();
    if technician.is_empty() {
        return Err(ServiceError::field("technician", "Technician is required."));
    }
    if details.cost.map(|c| c < 0.0 || !c.is_finite()).unwrap_or(false) {
        return Err(ServiceError::field("cost", "Cost cannot be negative."));
    }
    Ok(MaintenanceDetails {
        description,
        technician,
        ..details
    })
}

async fn set_asset_status(
    txn: &DatabaseTransaction,
    asset_id: i32,
    status: crate::entities::AssetStatus,
) -> Result<(), ServiceError> {
    asset::Entity::update_many()
        .col_expr(asset::Column::Status, Expr::value(status.to_string()))
        .col_expr(asset::Column::LastUpdated, Expr::value(Utc::now()))
        .filter(asset::Column::Id.eq(asset_id))
        .exec(txn)
        .await?;
    Ok(())
}
