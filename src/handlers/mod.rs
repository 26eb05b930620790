pub mod admin;
pub mod api;
pub mod assets;
pub mod auth;
pub mod checkouts;
pub mod common;
pub mod dashboard;
pub mod maintenance;
pub mod reports;
pub mod stationery;
pub mod transfers;

use axum::Router;

pub use crate::AppState;

/// Every page and JSON route, without middleware
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::auth_routes())
        .merge(dashboard::dashboard_routes())
        .merge(api::api_routes())
        .merge(assets::asset_routes())
        .merge(checkouts::checkout_routes())
        .merge(maintenance::maintenance_routes())
        .merge(stationery::stationery_routes())
        .merge(transfers::transfer_routes())
        .merge(reports::report_routes())
        .merge(admin::admin_routes())
}
