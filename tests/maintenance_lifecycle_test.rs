mod common;

use common::TestApp;
use inventory_desk::{
    entities::{AssetStatus, MaintenanceStatus, UserRole},
    services::{checkouts::NewCheckout, maintenance::MaintenanceDetails},
};

fn details(status: MaintenanceStatus) -> MaintenanceDetails {
    MaintenanceDetails {
        description: "Replace fuser".into(),
        technician: "Yusuf".into(),
        cost: Some(45.5),
        status,
    }
}

#[tokio::test]
async fn opening_maintenance_takes_asset_out_of_circulation() {
    let app = TestApp::new().await;
    let borrower = app.user("amira", UserRole::Staff).await;
    let printer = app.asset("Printer 2", "PR-002", "Printer").await;
    let maintenance = &app.state.services.maintenance;

    let record = maintenance
        .create(printer.id, details(MaintenanceStatus::Pending))
        .await
        .unwrap();
    assert_eq!(record.status, MaintenanceStatus::Pending);
    assert!(record.end_date.is_none());

    let asset = app.state.services.assets.get(printer.id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Maintenance);

    let err = app
        .state
        .services
        .checkouts
        .check_out(NewCheckout {
            asset_id: printer.id,
            user_id: borrower.id,
            expected_return: None,
            condition_out: "Good".into(),
            notes: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.response_message(), "Asset is not available (Status: Maintenance)");
}

#[tokio::test]
async fn only_one_open_record_per_asset() {
    let app = TestApp::new().await;
    let printer = app.asset("Printer 2", "PR-002", "Printer").await;
    let maintenance = &app.state.services.maintenance;

    maintenance
        .create(printer.id, details(MaintenanceStatus::InProgress))
        .await
        .unwrap();
    let err = maintenance
        .create(printer.id, details(MaintenanceStatus::Pending))
        .await
        .unwrap_err();
    assert_eq!(
        err.response_message(),
        "Printer 2 already has an open maintenance record."
    );
    assert_eq!(maintenance.for_asset(printer.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn completing_returns_asset_and_is_terminal() {
    let app = TestApp::new().await;
    let printer = app.asset("Printer 2", "PR-002", "Printer").await;
    let maintenance = &app.state.services.maintenance;

    let record = maintenance
        .create(printer.id, details(MaintenanceStatus::Pending))
        .await
        .unwrap();
    let progressed = maintenance
        .update(record.id, details(MaintenanceStatus::InProgress))
        .await
        .unwrap();
    assert_eq!(progressed.status, MaintenanceStatus::InProgress);
    assert!(progressed.end_date.is_none());

    let done = maintenance.complete(record.id).await.unwrap();
    assert_eq!(done.status, MaintenanceStatus::Completed);
    assert!(done.end_date.is_some());
    let asset = app.state.services.assets.get(printer.id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Available);

    let err = maintenance
        .update(record.id, details(MaintenanceStatus::InProgress))
        .await
        .unwrap_err();
    assert_eq!(err.response_message(), "Maintenance record is already completed.");
    assert!(maintenance
        .list(MaintenanceStatus::Pending)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        maintenance.list(MaintenanceStatus::Completed).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn checked_out_assets_cannot_enter_maintenance() {
    let app = TestApp::new().await;
    let borrower = app.user("amira", UserRole::Staff).await;
    let laptop = app.asset("Laptop 7", "LT-007", "Laptop").await;

    app.state
        .services
        .checkouts
        .check_out(NewCheckout {
            asset_id: laptop.id,
            user_id: borrower.id,
            expected_return: None,
            condition_out: "Good".into(),
            notes: None,
        })
        .await
        .unwrap();

    let err = app
        .state
        .services
        .maintenance
        .create(laptop.id, details(MaintenanceStatus::Pending))
        .await
        .unwrap_err();
    assert_eq!(
        err.response_message(),
        "Asset is checked out; check it in before scheduling maintenance."
    );
    let asset = app.state.services.assets.get(laptop.id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::InUse);
}

#[tokio::test]
async fn new_records_cannot_start_completed() {
    let app = TestApp::new().await;
    let printer = app.asset("Printer 2", "PR-002", "Printer").await;

    let result = app
        .state
        .services
        .maintenance
        .create(printer.id, details(MaintenanceStatus::Completed))
        .await;
    assert!(result.is_err());
    let asset = app.state.services.assets.get(printer.id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Available);
}

#[tokio::test]
async fn retired_assets_must_be_reinstated_before_maintenance() {
    let app = TestApp::new().await;
    let printer = app.asset("Printer 2", "PR-002", "Printer").await;
    let assets = &app.state.services.assets;
    let maintenance = &app.state.services.maintenance;

    assets.retire(printer.id).await.unwrap();
    let err = maintenance
        .create(printer.id, details(MaintenanceStatus::Pending))
        .await
        .unwrap_err();
    assert_eq!(
        err.response_message(),
        "Asset is out of service; reinstate it before scheduling maintenance."
    );
    assert_eq!(
        assets.get(printer.id).await.unwrap().status,
        AssetStatus::OutOfService
    );

    assets.reinstate(printer.id).await.unwrap();
    maintenance
        .create(printer.id, details(MaintenanceStatus::Pending))
        .await
        .unwrap();
    assert_eq!(
        assets.get(printer.id).await.unwrap().status,
        AssetStatus::Maintenance
    );
}
