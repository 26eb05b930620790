use crate::{
    catalog::{self, ASSET_LOCATIONS, ASSET_TYPES, COMPOSITE_TYPE},
    db::DbPool,
    entities::{asset, asset_transfer, checkout, maintenance, AssetStatus},
    errors::ServiceError,
    services::{non_blank, qr::qr_payload, transfers::move_with_components, Page},
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Editable asset fields; status is never part of an edit
#[derive(Debug, Clone)]
pub struct AssetInput {
    pub name: String,
    pub serial_number: String,
    pub asset_type: String,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_cost: Option<f64>,
    pub location: String,
    pub condition: Option<String>,
    pub notes: Option<String>,
}

/// A component recorded together with its composite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSerial {
    pub asset_type: &'static str,
    pub serial_number: String,
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub details: AssetInput,
    /// Available or Out of Service
    pub initial_status: AssetStatus,
    pub components: Vec<ComponentSerial>,
}

#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub location: Option<String>,
    pub status: Option<AssetStatus>,
}

pub struct AssetService {
    db: Arc<DbPool>,
}

impl AssetService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: AssetFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<asset::Model>, ServiceError> {
        let mut query = asset::Entity::find();
        if let Some(location) = non_blank(filter.location) {
            query = query.filter(asset::Column::Location.eq(location));
        }
        if let Some(status) = filter.status {
            query = query.filter(asset::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_asc(asset::Column::Name)
            .order_by_asc(asset::Column::Id)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page {
            items,
            page,
            per_page,
            total,
        })
    }

    pub async fn find(&self, id: i32) -> Result<Option<asset::Model>, ServiceError> {
        Ok(asset::Entity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn get(&self, id: i32) -> Result<asset::Model, ServiceError> {
        self.find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Asset", id))
    }

    /// Direct children of a composite
    pub async fn components(&self, parent_id: i32) -> Result<Vec<asset::Model>, ServiceError> {
        Ok(asset::Entity::find()
            .filter(asset::Column::ParentId.eq(parent_id))
            .order_by_asc(asset::Column::AssetType)
            .all(&*self.db)
            .await?)
    }

    /// Inserts the asset and any components in one transaction
    #[instrument(skip(self, new), fields(serial = %new.details.serial_number))]
    pub async fn create(&self, new: NewAsset) -> Result<asset::Model, ServiceError> {
        if !matches!(
            new.initial_status,
            AssetStatus::Available | AssetStatus::OutOfService
        ) {
            return Err(ServiceError::field(
                "status",
                "New assets start as Available or Out of Service.",
            ));
        }
        let details = normalize(new.details)?;
        if !new.components.is_empty() && details.asset_type != COMPOSITE_TYPE {
            return Err(ServiceError::field(
                "asset_type",
                format!("Only {} assets have component serials.", COMPOSITE_TYPE),
            ));
        }
        let mut serials = vec![details.serial_number.clone()];
        for component in &new.components {
            let serial = component.serial_number.trim().to_string();
            if serials.contains(&serial) {
                return Err(ServiceError::field(
                    "serial_number",
                    format!("Serial number {} is used more than once.", serial),
                ));
            }
            serials.push(serial);
        }

        let status = new.initial_status;
        let components = new.components;
        let created = self
            .db
            .transaction::<_, asset::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    for serial in &serials {
                        ensure_serial_free(txn, serial, None).await?;
                    }

                    let parent = insert_asset(txn, &details, status, None).await?;
                    for component in components {
                        let component_details = AssetInput {
                            name: format!("{} {}", details.name, component.asset_type),
                            serial_number: component.serial_number.trim().to_string(),
                            asset_type: component.asset_type.to_string(),
                            purchase_date: details.purchase_date,
                            purchase_cost: None,
                            location: details.location.clone(),
                            condition: details.condition.clone(),
                            notes: None,
                        };
                        insert_asset(txn, &component_details, status, Some(parent.id)).await?;
                    }
                    Ok(parent)
                })
            })
            .await?;

        info!(asset_id = created.id, asset_type = %created.asset_type, "asset created");
        Ok(created)
    }

    /// Updates details; a location change follows the transfer rules
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: AssetInput,
        actor_id: i32,
    ) -> Result<asset::Model, ServiceError> {
        let details = normalize(input)?;

        let updated = self
            .db
            .transaction::<_, asset::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = asset::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Asset", id))?;
                    ensure_serial_free(txn, &details.serial_number, Some(id)).await?;

                    if existing.location != details.location {
                        move_with_components(
                            txn,
                            &existing,
                            &details.location,
                            Some(actor_id),
                            Some("Location changed while editing".to_string()),
                        )
                        .await?;
                    }

                    let mut model = existing.into_active_model();
                    model.name = Set(details.name.clone());
                    model.serial_number = Set(details.serial_number.clone());
                    model.asset_type = Set(details.asset_type.clone());
                    model.purchase_date = Set(details.purchase_date);
                    model.purchase_cost = Set(details.purchase_cost);
                    model.location = Set(details.location.clone());
                    model.condition = Set(details.condition.clone());
                    model.notes = Set(details.notes.clone());
                    let mut updated = model.update(txn).await?;

                    let payload = qr_payload(&updated);
                    if updated.qr_code.as_deref() != Some(payload.as_str()) {
                        let mut model = updated.into_active_model();
                        model.qr_code = Set(Some(payload));
                        updated = model.update(txn).await?;
                    }
                    Ok(updated)
                })
            })
            .await?;

        info!(asset_id = id, "asset updated");
        Ok(updated)
    }

    /// Deletes an asset, its components and every history row they own
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<Vec<i32>, ServiceError> {
        let removed = self
            .db
            .transaction::<_, Vec<i32>, ServiceError>(move |txn| {
                Box::pin(async move {
                    let root = asset::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Asset", id))?;

                    let mut ids = vec![root.id];
                    let mut frontier = vec![root.id];
                    while !frontier.is_empty() {
                        let children: Vec<i32> = asset::Entity::find()
                            .filter(asset::Column::ParentId.is_in(frontier.clone()))
                            .all(txn)
                            .await?
                            .into_iter()
                            .map(|a| a.id)
                            .filter(|child| !ids.contains(child))
                            .collect();
                        ids.extend(children.iter().copied());
                        frontier = children;
                    }

                    let open = checkout::Entity::find()
                        .filter(checkout::Column::AssetId.is_in(ids.clone()))
                        .filter(checkout::Column::ActualReturn.is_null())
                        .count(txn)
                        .await?;
                    if open > 0 {
                        return Err(ServiceError::InvalidOperation(format!(
                            "{} or one of its components is checked out; check it in before deleting.",
                            root.name
                        )));
                    }

                    checkout::Entity::delete_many()
                        .filter(checkout::Column::AssetId.is_in(ids.clone()))
                        .exec(txn)
                        .await?;
                    maintenance::Entity::delete_many()
                        .filter(maintenance::Column::AssetId.is_in(ids.clone()))
                        .exec(txn)
                        .await?;
                    asset_transfer::Entity::delete_many()
                        .filter(asset_transfer::Column::AssetId.is_in(ids.clone()))
                        .exec(txn)
                        .await?;
                    // children first so the self reference never dangles
                    for asset_id in ids.iter().rev() {
                        asset::Entity::delete_by_id(*asset_id).exec(txn).await?;
                    }
                    Ok(ids)
                })
            })
            .await?;

        info!(asset_id = id, removed = removed.len(), "asset deleted");
        Ok(removed)
    }

    /// Available -> Out of Service
    #[instrument(skip(self))]
    pub async fn retire(&self, id: i32) -> Result<asset::Model, ServiceError> {
        let asset = self.get(id).await?;
        let next = asset.status.retire()?;
        self.swap_status(asset, next).await
    }

    /// Out of Service -> Available
    #[instrument(skip(self))]
    pub async fn reinstate(&self, id: i32) -> Result<asset::Model, ServiceError> {
        let asset = self.get(id).await?;
        let next = asset.status.reinstate()?;
        self.swap_status(asset, next).await
    }

    async fn swap_status(
        &self,
        asset: asset::Model,
        next: AssetStatus,
    ) -> Result<asset::Model, ServiceError> {
        let result = asset::Entity::update_many()
            .col_expr(asset::Column::Status, Expr::value(next.to_string()))
            .col_expr(asset::Column::LastUpdated, Expr::value(chrono::Utc::now()))
            .filter(asset::Column::Id.eq(asset.id))
            .filter(asset::Column::Status.eq(asset.status))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            warn!(asset_id = asset.id, "status changed concurrently");
            return Err(ServiceError::Conflict(
                "The asset changed while you were editing it. Please try again.".into(),
            ));
        }
        info!(asset_id = asset.id, from = %asset.status, to = %next, "asset status changed");
        self.get(asset.id).await
    }
}

/// Trims fields and maps type and location onto their catalog spelling
fn normalize(input: AssetInput) -> Result<AssetInput, ServiceError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::field("name", "Name is required."));
    }
    let serial_number = input.serial_number.trim().to_string();
    if serial_number.is_empty() {
        return Err(ServiceError::field("serial_number", "Serial number is required."));
    }
    let asset_type = catalog::canonical(ASSET_TYPES, &input.asset_type)
        .ok_or_else(|| ServiceError::field("asset_type", "Choose a valid asset type."))?;
    let location = catalog::canonical(ASSET_LOCATIONS, &input.location)
        .ok_or_else(|| ServiceError::field("location", "Choose a valid location."))?;
    if input.purchase_cost.map(|c| c < 0.0 || !c.is_finite()).unwrap_or(false) {
        return Err(ServiceError::field(
            "purchase_cost",
            "Purchase cost cannot be negative.",
        ));
    }

    Ok(AssetInput {
        name,
        serial_number,
        asset_type: asset_type.to_string(),
        purchase_date: input.purchase_date,
        purchase_cost: input.purchase_cost,
        location: location.to_string(),
        condition: non_blank(input.condition),
        notes: non_blank(input.notes),
    })
}

async fn ensure_serial_free<C: ConnectionTrait>(
    conn: &C,
    serial: &str,
    except: Option<i32>,
) -> Result<(), ServiceError> {
    let mut query = asset::Entity::find().filter(asset::Column::SerialNumber.eq(serial));
    if let Some(id) = except {
        query = query.filter(asset::Column::Id.ne(id));
    }
    if query.count(conn).await? > 0 {
        return Err(ServiceError::field(
            "serial_number",
            format!("Serial number {} is already registered.", serial),
        ));
    }
    Ok(())
}

/// Inserts then stamps the QR payload, which needs the generated id
async fn insert_asset<C: ConnectionTrait>(
    conn: &C,
    details: &AssetInput,
    status: AssetStatus,
    parent_id: Option<i32>,
) -> Result<asset::Model, ServiceError> {
    let inserted = asset::ActiveModel {
        name: Set(details.name.clone()),
        serial_number: Set(details.serial_number.clone()),
        asset_type: Set(details.asset_type.clone()),
        purchase_date: Set(details.purchase_date),
        purchase_cost: Set(details.purchase_cost),
        location: Set(details.location.clone()),
        status: Set(status),
        condition: Set(details.condition.clone()),
        notes: Set(details.notes.clone()),
        qr_code: Set(None),
        parent_id: Set(parent_id),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let payload = qr_payload(&inserted);
    let mut model = inserted.into_active_model();
    model.qr_code = Set(Some(payload));
    Ok(model.update(conn).await?)
}
