use crate::{
    db::DbPool,
    entities::{asset, checkout, user, AssetStatus},
    errors::ServiceError,
    lifecycle::TransitionError,
    services::{asset_names, non_blank, usernames, Page},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Loan period used when the form leaves the return date empty
pub const DEFAULT_LOAN_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct NewCheckout {
    pub asset_id: i32,
    pub user_id: i32,
    pub expected_return: Option<DateTime<Utc>>,
    pub condition_out: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckIn {
    pub condition_in: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRow {
    pub checkout: checkout::Model,
    pub asset_name: String,
    pub username: String,
}

pub struct CheckoutService {
    db: Arc<DbPool>,
}

impl CheckoutService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Opens a checkout and marks the asset In-use in one transaction
    #[instrument(skip(self, new), fields(asset_id = new.asset_id, user_id = new.user_id))]
    pub async fn check_out(&self, new: NewCheckout) -> Result<checkout::Model, ServiceError> {
        let condition_out = new.condition_out.trim().to_string();
        if condition_out.is_empty() {
            return Err(ServiceError::field("condition", "Condition is required."));
        }
        let now = Utc::now();
        let expected_return = new
            .expected_return
            .unwrap_or_else(|| now + Duration::days(DEFAULT_LOAN_DAYS));
        if expected_return < now {
            return Err(ServiceError::field(
                "expected_return",
                "Expected return cannot be in the past.",
            ));
        }
        let notes = non_blank(new.notes);
        let (asset_id, user_id) = (new.asset_id, new.user_id);

        let opened = self
            .db
            .transaction::<_, checkout::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    if user::Entity::find().count(txn).await? == 0 {
                        return Err(ServiceError::InvalidOperation(
                            "No users available. Add users before checking out assets.".into(),
                        ));
                    }
                    match user::Entity::find_by_id(user_id).one(txn).await? {
                        Some(borrower) if borrower.is_active => {}
                        _ => return Err(ServiceError::field("user_id", "Choose an active user.")),
                    }

                    let asset = asset::Entity::find_by_id(asset_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Asset", asset_id))?;
                    let next = asset.status.check_out()?;

                    let claimed = asset::Entity::update_many()
                        .col_expr(asset::Column::Status, Expr::value(next.to_string()))
                        .col_expr(asset::Column::LastUpdated, Expr::value(now))
                        .filter(asset::Column::Id.eq(asset_id))
                        .filter(asset::Column::Status.eq(AssetStatus::Available))
                        .exec(txn)
                        .await?;
                    if claimed.rows_affected == 0 {
                        warn!(asset_id, "asset claimed by a concurrent checkout");
                        return Err(TransitionError::AssetUnavailable(AssetStatus::InUse).into());
                    }

                    let row = checkout::ActiveModel {
                        asset_id: Set(asset_id),
                        user_id: Set(user_id),
                        checkout_date: Set(now),
                        expected_return: Set(Some(expected_return)),
                        actual_return: Set(None),
                        condition_out: Set(condition_out),
                        condition_in: Set(None),
                        notes: Set(notes),
                        ..Default::default()
                    };
                    row.insert(txn).await.map_err(|err| match err.sql_err() {
                        Some(SqlErr::UniqueConstraintViolation(_)) => {
                            ServiceError::from(TransitionError::AssetUnavailable(AssetStatus::InUse))
                        }
                        _ => ServiceError::DatabaseError(err),
                    })
                })
            })
            .await?;

        info!(checkout_id = opened.id, asset_id, user_id, "asset checked out");
        Ok(opened)
    }

    /// Closes an open checkout and frees the asset
    #[instrument(skip(self, check_in))]
    pub async fn check_in(
        &self,
        checkout_id: i32,
        check_in: CheckIn,
    ) -> Result<checkout::Model, ServiceError> {
        let condition_in = check_in.condition_in.trim().to_string();
        if condition_in.is_empty() {
            return Err(ServiceError::field("condition", "Condition is required."));
        }
        let notes = non_blank(check_in.notes);
        let now = Utc::now();

        let closed = self
            .db
            .transaction::<_, checkout::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = checkout::Entity::find_by_id(checkout_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Checkout", checkout_id))?;
                    if !existing.is_open() {
                        return Err(TransitionError::AlreadyCheckedIn.into());
                    }

                    let notes = match (existing.notes.clone(), notes) {
                        (Some(before), Some(after)) => Some(format!("{}\n{}", before, after)),
                        (before, after) => after.or(before),
                    };
                    let result = checkout::Entity::update_many()
                        .col_expr(checkout::Column::ActualReturn, Expr::value(now))
                        .col_expr(checkout::Column::ConditionIn, Expr::value(condition_in))
                        .col_expr(checkout::Column::Notes, Expr::value(notes))
                        .filter(checkout::Column::Id.eq(checkout_id))
                        .filter(checkout::Column::ActualReturn.is_null())
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(TransitionError::AlreadyCheckedIn.into());
                    }

                    let asset = asset::Entity::find_by_id(existing.asset_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Asset", existing.asset_id))?;
                    asset::Entity::update_many()
                        .col_expr(
                            asset::Column::Status,
                            Expr::value(asset.status.check_in().to_string()),
                        )
                        .col_expr(asset::Column::LastUpdated, Expr::value(now))
                        .filter(asset::Column::Id.eq(asset.id))
                        .exec(txn)
                        .await?;

                    checkout::Entity::find_by_id(checkout_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Checkout", checkout_id))
                })
            })
            .await?;

        info!(checkout_id, asset_id = closed.asset_id, "asset checked in");
        Ok(closed)
    }

    pub async fn get(&self, id: i32) -> Result<checkout::Model, ServiceError> {
        checkout::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Checkout", id))
    }

    pub async fn row(&self, id: i32) -> Result<CheckoutRow, ServiceError> {
        let checkout = self.get(id).await?;
        self.rows(vec![checkout])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Checkout", id))
    }

    pub async fn open_for_asset(
        &self,
        asset_id: i32,
    ) -> Result<Option<checkout::Model>, ServiceError> {
        Ok(checkout::Entity::find()
            .filter(checkout::Column::AssetId.eq(asset_id))
            .filter(checkout::Column::ActualReturn.is_null())
            .one(&*self.db)
            .await?)
    }

    /// Every checkout of an asset, newest first
    pub async fn for_asset(&self, asset_id: i32) -> Result<Vec<CheckoutRow>, ServiceError> {
        let checkouts = checkout::Entity::find()
            .filter(checkout::Column::AssetId.eq(asset_id))
            .order_by_desc(checkout::Column::CheckoutDate)
            .all(&*self.db)
            .await?;
        self.rows(checkouts).await
    }

    /// Open checkouts, newest first
    #[instrument(skip(self))]
    pub async fn active(&self) -> Result<Vec<CheckoutRow>, ServiceError> {
        let checkouts = checkout::Entity::find()
            .filter(checkout::Column::ActualReturn.is_null())
            .order_by_desc(checkout::Column::CheckoutDate)
            .order_by_desc(checkout::Column::Id)
            .all(&*self.db)
            .await?;
        self.rows(checkouts).await
    }

    /// Returned checkouts, most recently returned first
    #[instrument(skip(self))]
    pub async fn history(&self, page: u64, per_page: u64) -> Result<Page<CheckoutRow>, ServiceError> {
        let paginator = checkout::Entity::find()
            .filter(checkout::Column::ActualReturn.is_not_null())
            .order_by_desc(checkout::Column::ActualReturn)
            .order_by_desc(checkout::Column::Id)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let checkouts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page {
            items: self.rows(checkouts).await?,
            page,
            per_page,
            total,
        })
    }

    pub async fn count_open(&self) -> Result<u64, ServiceError> {
        Ok(checkout::Entity::find()
            .filter(checkout::Column::ActualReturn.is_null())
            .count(&*self.db)
            .await?)
    }

    async fn rows(&self, checkouts: Vec<checkout::Model>) -> Result<Vec<CheckoutRow>, ServiceError> {
        checkout_rows(&*self.db, checkouts).await
    }
}

/// Attaches asset names and usernames to checkouts
pub(crate) async fn checkout_rows<C: ConnectionTrait>(
    db: &C,
    checkouts: Vec<checkout::Model>,
) -> Result<Vec<CheckoutRow>, ServiceError> {
    let assets = asset_names(db, checkouts.iter().map(|c| c.asset_id)).await?;
    let users = usernames(db, checkouts.iter().map(|c| c.user_id)).await?;
    Ok(checkouts
        .into_iter()
        .map(|checkout| CheckoutRow {
            asset_name: assets
                .get(&checkout.asset_id)
                .cloned()
                .unwrap_or_else(|| format!("Asset #{}", checkout.asset_id)),
            username: users
                .get(&checkout.user_id)
                .cloned()
                .unwrap_or_else(|| format!("User #{}", checkout.user_id)),
            checkout,
        })
        .collect())
}
