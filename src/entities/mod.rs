pub mod asset;
pub mod asset_transfer;
pub mod checkout;
pub mod maintenance;
pub mod stationery;
pub mod user;

pub use asset::AssetStatus;
pub use maintenance::MaintenanceStatus;
pub use user::UserRole;
