use crate::{
    catalog::{self, DEFAULT_STATIONERY_LOCATION, STATIONERY_ITEM_TYPES, STATIONERY_UNITS},
    config::AppConfig,
    db::DbPool,
    entities::stationery,
    errors::ServiceError,
    lifecycle::{StockAdjustment, TransitionError},
    services::non_blank,
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct NewStationery {
    pub item_type: String,
    pub quantity: i32,
    pub unit: String,
    /// Falls back to the configured default for the item type
    pub threshold: Option<i32>,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StockUpdate {
    pub adjustment: StockAdjustment,
    pub threshold: Option<i32>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StationeryFilter {
    pub item_type: Option<String>,
    pub location: Option<String>,
}

pub struct StationeryService {
    db: Arc<DbPool>,
    config: Arc<AppConfig>,
}

impl StationeryService {
    pub fn new(db: Arc<DbPool>, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: StationeryFilter) -> Result<Vec<stationery::Model>, ServiceError> {
        let mut query = stationery::Entity::find();
        if let Some(item_type) = non_blank(filter.item_type) {
            query = query.filter(stationery::Column::ItemType.eq(item_type));
        }
        if let Some(location) = non_blank(filter.location) {
            query = query.filter(stationery::Column::Location.eq(location));
        }
        Ok(query
            .order_by_asc(stationery::Column::ItemType)
            .order_by_asc(stationery::Column::Id)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(&self, id: i32) -> Result<stationery::Model, ServiceError> {
        stationery::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stationery item", id))
    }

    /// Distinct locations in use, for the filter dropdown
    pub async fn locations(&self) -> Result<Vec<String>, ServiceError> {
        let mut locations: Vec<String> = stationery::Entity::find()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|item| item.location)
            .collect();
        locations.sort();
        locations.dedup();
        Ok(locations)
    }

    #[instrument(skip(self, new), fields(item_type = %new.item_type))]
    pub async fn create(&self, new: NewStationery) -> Result<stationery::Model, ServiceError> {
        let item_type = catalog::canonical(STATIONERY_ITEM_TYPES, &new.item_type)
            .ok_or_else(|| ServiceError::field("item_type", "Choose a valid item type."))?;
        let unit = catalog::canonical(STATIONERY_UNITS, &new.unit)
            .ok_or_else(|| ServiceError::field("unit", "Choose a valid unit."))?;
        if new.quantity < 0 {
            return Err(ServiceError::field("quantity", "Quantity cannot be negative."));
        }
        let threshold = new
            .threshold
            .or_else(|| self.config.default_threshold_for(item_type))
            .unwrap_or(0);
        if threshold < 0 {
            return Err(ServiceError::field("threshold", "Threshold cannot be negative."));
        }
        let location = non_blank(new.location).unwrap_or_else(|| DEFAULT_STATIONERY_LOCATION.into());

        let created = stationery::ActiveModel {
            item_type: Set(item_type.to_string()),
            quantity: Set(new.quantity),
            unit: Set(unit.to_string()),
            threshold: Set(threshold),
            location: Set(location),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(item_id = created.id, quantity = created.quantity, "stationery item added");
        Ok(created)
    }

    /// Adds or removes stock, optionally moving the item or its threshold
    #[instrument(skip(self, update))]
    pub async fn adjust(&self, id: i32, update: StockUpdate) -> Result<stationery::Model, ServiceError> {
        if update.threshold.map(|t| t < 0).unwrap_or(false) {
            return Err(ServiceError::field("threshold", "Threshold cannot be negative."));
        }
        let location = non_blank(update.location);
        let adjustment = update.adjustment;
        let threshold = update.threshold;

        let item = self
            .db
            .transaction::<_, stationery::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = stationery::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Stationery item", id))?;
                    adjustment
                        .apply(item.quantity)
                        .map_err(|err| stock_error(err, &item.unit))?;

                    let quantity = Expr::col(stationery::Column::Quantity);
                    let guarded = match adjustment {
                        StockAdjustment::Add(n) => stationery::Entity::update_many()
                            .col_expr(stationery::Column::Quantity, quantity.add(n))
                            .filter(stationery::Column::Id.eq(id)),
                        StockAdjustment::Subtract(n) => stationery::Entity::update_many()
                            .col_expr(stationery::Column::Quantity, quantity.sub(n))
                            .filter(stationery::Column::Id.eq(id))
                            .filter(stationery::Column::Quantity.gte(n)),
                    };
                    if guarded.exec(txn).await?.rows_affected == 0 {
                        let current = stationery::Entity::find_by_id(id)
                            .one(txn)
                            .await?
                            .map(|i| i.quantity)
                            .unwrap_or(0);
                        return Err(stock_error(
                            TransitionError::InsufficientStock {
                                requested: adjustment.amount(),
                                available: current,
                            },
                            &item.unit,
                        ));
                    }

                    let mut model = stationery::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Stationery item", id))?
                        .into_active_model();
                    if let Some(threshold) = threshold {
                        model.threshold = Set(threshold);
                    }
                    if let Some(location) = location {
                        model.location = Set(location);
                    }
                    Ok(model.update(txn).await?)
                })
            })
            .await?;

        info!(item_id = id, ?adjustment, quantity = item.quantity, "stock adjusted");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<stationery::Model, ServiceError> {
        let item = self.get(id).await?;
        stationery::Entity::delete_by_id(id).exec(&*self.db).await?;
        info!(item_id = id, item_type = %item.item_type, "stationery item deleted");
        Ok(item)
    }

    /// Items strictly below their reorder threshold
    pub async fn low_stock(&self) -> Result<Vec<stationery::Model>, ServiceError> {
        low_stock_items(&*self.db).await
    }
}

pub(crate) async fn low_stock_items<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<stationery::Model>, ServiceError> {
    Ok(stationery::Entity::find()
        .filter(
            Expr::col(stationery::Column::Quantity).lt(Expr::col(stationery::Column::Threshold)),
        )
        .order_by_asc(stationery::Column::ItemType)
        .all(db)
        .await?)
}

fn stock_error(err: TransitionError, unit: &str) -> ServiceError {
    match err {
        TransitionError::InsufficientStock {
            requested,
            available,
        } => ServiceError::InsufficientStock(format!(
            "Cannot subtract {}; only {} {} in stock.",
            requested, available, unit
        )),
        other => other.into(),
    }
}
