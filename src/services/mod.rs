use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::{asset, user};

pub mod assets;
pub mod checkouts;
pub mod maintenance;
pub mod qr;
pub mod reports;
pub mod stationery;
pub mod transfers;
pub mod users;

pub use assets::AssetService;
pub use checkouts::CheckoutService;
pub use maintenance::MaintenanceService;
pub use reports::ReportService;
pub use stationery::StationeryService;
pub use transfers::TransferService;
pub use users::UserService;

/// One page of an ordered listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Clamps a requested page number to 1-based
pub fn normalize_page(page: Option<u64>) -> u64 {
    page.filter(|p| *p >= 1).unwrap_or(1)
}

/// Trims and drops empty optional text
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Asset names keyed by id, for listings that show related rows
pub(crate) async fn asset_names<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>, DbErr> {
    let ids: Vec<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(asset::Entity::find()
        .filter(asset::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect())
}

/// Usernames keyed by id
pub(crate) async fn usernames<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>, DbErr> {
    let ids: Vec<i32> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect())
}

/// Services shared by handlers, the scheduler and the CLI
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub assets: Arc<AssetService>,
    pub checkouts: Arc<CheckoutService>,
    pub maintenance: Arc<MaintenanceService>,
    pub stationery: Arc<StationeryService>,
    pub transfers: Arc<TransferService>,
    pub reports: Arc<ReportService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, config: Arc<AppConfig>) -> Self {
        Self {
            users: Arc::new(UserService::new(db.clone())),
            assets: Arc::new(AssetService::new(db.clone())),
            checkouts: Arc::new(CheckoutService::new(db.clone())),
            maintenance: Arc::new(MaintenanceService::new(db.clone())),
            stationery: Arc::new(StationeryService::new(db.clone(), config)),
            transfers: Arc::new(TransferService::new(db.clone())),
            reports: Arc::new(ReportService::new(db)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_math() {
        let page = Page::<u8> {
            items: vec![],
            page: 2,
            per_page: 20,
            total: 41,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_prev());
        assert!(page.has_next());

        let empty = Page::<u8> {
            items: vec![],
            page: 1,
            per_page: 20,
            total: 0,
        };
        assert_eq!(empty.total_pages(), 1);
        assert!(!empty.has_next());
    }

    #[test]
    fn page_numbers_start_at_one() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(0)), 1);
        assert_eq!(normalize_page(Some(4)), 4);
    }
}
