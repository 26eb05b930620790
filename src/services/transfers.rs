use crate::{
    catalog::{self, ASSET_LOCATIONS},
    db::DbPool,
    entities::{asset, asset_transfer, AssetStatus},
    errors::ServiceError,
    services::{asset_names, non_blank, qr::qr_payload, usernames, Page},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub asset_id: i32,
    pub to_location: String,
    pub notes: Option<String>,
    pub transferred_by: i32,
}

/// A log entry with the names the listing shows
#[derive(Debug, Clone, Serialize)]
pub struct TransferRow {
    pub transfer: asset_transfer::Model,
    pub asset_name: String,
    pub transferred_by: Option<String>,
}

pub struct TransferService {
    db: Arc<DbPool>,
}

impl TransferService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Moves an asset and its components, logging one row per moved asset
    #[instrument(skip(self, transfer), fields(asset_id = transfer.asset_id))]
    pub async fn transfer(
        &self,
        transfer: NewTransfer,
    ) -> Result<Vec<asset_transfer::Model>, ServiceError> {
        let to_location = catalog::canonical(ASSET_LOCATIONS, &transfer.to_location)
            .ok_or_else(|| ServiceError::field("to_location", "Choose a valid location."))?;
        let notes = non_blank(transfer.notes);
        let asset_id = transfer.asset_id;
        let by = transfer.transferred_by;

        let rows = self
            .db
            .transaction::<_, Vec<asset_transfer::Model>, ServiceError>(move |txn| {
                Box::pin(async move {
                    let asset = asset::Entity::find_by_id(asset_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("Asset", asset_id))?;

                    if asset.location == to_location {
                        return Err(ServiceError::InvalidOperation(format!(
                            "{} is already at {}.",
                            asset.name, to_location
                        )));
                    }

                    move_with_components(txn, &asset, to_location, Some(by), notes).await
                })
            })
            .await?;

        info!(asset_id, moved = rows.len(), to = to_location, "asset transferred");
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, per_page: u64) -> Result<Page<TransferRow>, ServiceError> {
        let paginator = asset_transfer::Entity::find()
            .order_by_desc(asset_transfer::Column::TransferredAt)
            .order_by_desc(asset_transfer::Column::Id)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let transfers = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(Page {
            items: self.rows(transfers).await?,
            page,
            per_page,
            total,
        })
    }

    pub async fn for_asset(&self, asset_id: i32) -> Result<Vec<TransferRow>, ServiceError> {
        let transfers = asset_transfer::Entity::find()
            .filter(asset_transfer::Column::AssetId.eq(asset_id))
            .order_by_desc(asset_transfer::Column::TransferredAt)
            .all(&*self.db)
            .await?;
        self.rows(transfers).await
    }

    async fn rows(
        &self,
        transfers: Vec<asset_transfer::Model>,
    ) -> Result<Vec<TransferRow>, ServiceError> {
        let assets = asset_names(&*self.db, transfers.iter().map(|t| t.asset_id)).await?;
        let users = usernames(&*self.db, transfers.iter().filter_map(|t| t.transferred_by)).await?;

        Ok(transfers
            .into_iter()
            .map(|transfer| TransferRow {
                asset_name: assets
                    .get(&transfer.asset_id)
                    .cloned()
                    .unwrap_or_else(|| format!("Asset #{}", transfer.asset_id)),
                transferred_by: transfer
                    .transferred_by
                    .and_then(|id| users.get(&id).cloned()),
                transfer,
            })
            .collect())
    }
}

/// Moves an asset and the components that are not already there.
///
/// Refused while the asset or any component is checked out.
pub(crate) async fn move_with_components<C: ConnectionTrait>(
    conn: &C,
    asset: &asset::Model,
    to_location: &str,
    by: Option<i32>,
    notes: Option<String>,
) -> Result<Vec<asset_transfer::Model>, ServiceError> {
    let components = asset::Entity::find()
        .filter(asset::Column::ParentId.eq(asset.id))
        .all(conn)
        .await?;

    if let Some(busy) = std::iter::once(asset)
        .chain(components.iter())
        .find(|a| a.status == AssetStatus::InUse)
    {
        return Err(ServiceError::InvalidOperation(format!(
            "{} is checked out; check it in before transferring.",
            busy.name
        )));
    }

    let mut rows = Vec::with_capacity(components.len() + 1);
    rows.push(record_move(conn, asset, to_location, by, notes.clone()).await?);
    for component in components.iter().filter(|c| c.location != to_location) {
        rows.push(record_move(conn, component, to_location, by, notes.clone()).await?);
    }
    Ok(rows)
}

/// Sets the asset's location, refreshes its label and appends the log row
async fn record_move<C: ConnectionTrait>(
    conn: &C,
    asset: &asset::Model,
    to_location: &str,
    by: Option<i32>,
    notes: Option<String>,
) -> Result<asset_transfer::Model, ServiceError> {
    let moved = asset::Model {
        location: to_location.to_string(),
        ..asset.clone()
    };
    asset::Entity::update_many()
        .col_expr(asset::Column::Location, Expr::value(to_location.to_string()))
        .col_expr(asset::Column::QrCode, Expr::value(Some(qr_payload(&moved))))
        .col_expr(asset::Column::LastUpdated, Expr::value(Utc::now()))
        .filter(asset::Column::Id.eq(asset.id))
        .exec(conn)
        .await?;

    let row = asset_transfer::ActiveModel {
        asset_id: Set(asset.id),
        from_location: Set(asset.location.clone()),
        to_location: Set(to_location.to_string()),
        transferred_by: Set(by),
        transferred_at: Set(Utc::now()),
        notes: Set(notes),
        ..Default::default()
    };
    Ok(row.insert(conn).await?)
}
