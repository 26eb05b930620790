mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::TestApp;
use inventory_desk::{
    entities::{AssetStatus, UserRole},
    errors::ServiceError,
    services::checkouts::{CheckIn, NewCheckout},
};

fn checkout_of(asset_id: i32, user_id: i32) -> NewCheckout {
    NewCheckout {
        asset_id,
        user_id,
        expected_return: None,
        condition_out: "Good".into(),
        notes: Some("For exams".into()),
    }
}

#[tokio::test]
async fn checkout_then_checkin_round_trip() {
    let app = TestApp::new().await;
    let borrower = app.user("amira", UserRole::Staff).await;
    let laptop = app.asset("Laptop 7", "LT-007", "Laptop").await;
    let checkouts = &app.state.services.checkouts;

    let opened = checkouts.check_out(checkout_of(laptop.id, borrower.id)).await.unwrap();
    assert!(opened.is_open());
    let due = opened.expected_return.expect("default due date");
    assert!(due > Utc::now() + Duration::days(6));

    let asset = app.state.services.assets.get(laptop.id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::InUse);
    assert_eq!(checkouts.active().await.unwrap().len(), 1);

    let closed = checkouts
        .check_in(
            opened.id,
            CheckIn {
                condition_in: "Scratched lid".into(),
                notes: Some("Returned late".into()),
            },
        )
        .await
        .unwrap();
    assert!(closed.actual_return.is_some());
    assert_eq!(closed.condition_in.as_deref(), Some("Scratched lid"));
    assert_eq!(closed.notes.as_deref(), Some("For exams\nReturned late"));

    let asset = app.state.services.assets.get(laptop.id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Available);
    assert!(checkouts.active().await.unwrap().is_empty());
    assert_eq!(checkouts.history(1, 20).await.unwrap().total, 1);
}

#[tokio::test]
async fn asset_cannot_be_checked_out_twice() {
    let app = TestApp::new().await;
    let first = app.user("amira", UserRole::Staff).await;
    let second = app.user("bilal", UserRole::Staff).await;
    let laptop = app.asset("Laptop 7", "LT-007", "Laptop").await;
    let checkouts = &app.state.services.checkouts;

    checkouts.check_out(checkout_of(laptop.id, first.id)).await.unwrap();
    let err = checkouts
        .check_out(checkout_of(laptop.id, second.id))
        .await
        .unwrap_err();
    assert_eq!(err.response_message(), "Asset is not available (Status: In-use)");
}

#[tokio::test]
async fn checking_in_twice_is_rejected() {
    let app = TestApp::new().await;
    let borrower = app.user("amira", UserRole::Staff).await;
    let laptop = app.asset("Laptop 7", "LT-007", "Laptop").await;
    let checkouts = &app.state.services.checkouts;

    let opened = checkouts.check_out(checkout_of(laptop.id, borrower.id)).await.unwrap();
    let check_in = CheckIn {
        condition_in: "Good".into(),
        notes: None,
    };
    checkouts.check_in(opened.id, check_in.clone()).await.unwrap();
    let err = checkouts.check_in(opened.id, check_in).await.unwrap_err();
    assert_eq!(err.response_message(), "This asset has already been checked in.");
}

#[tokio::test]
async fn checkout_validates_borrower_and_dates() {
    let app = TestApp::new().await;
    let admin = app.user("root", UserRole::Admin).await;
    let borrower = app.user("amira", UserRole::Staff).await;
    let laptop = app.asset("Laptop 7", "LT-007", "Laptop").await;
    let checkouts = &app.state.services.checkouts;

    app.state
        .services
        .users
        .deactivate(admin.id, borrower.id)
        .await
        .unwrap();
    assert_matches!(
        checkouts.check_out(checkout_of(laptop.id, borrower.id)).await,
        Err(ServiceError::FieldInvalid { field, .. }) if field == "user_id"
    );

    let mut past_due = checkout_of(laptop.id, admin.id);
    past_due.expected_return = Some(Utc::now() - Duration::days(1));
    assert_matches!(
        checkouts.check_out(past_due).await,
        Err(ServiceError::FieldInvalid { field, .. }) if field == "expected_return"
    );

    let asset = app.state.services.assets.get(laptop.id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Available);
}

#[tokio::test]
async fn retired_assets_cannot_be_borrowed() {
    let app = TestApp::new().await;
    let borrower = app.user("amira", UserRole::Staff).await;
    let printer = app.asset("Printer 2", "PR-002", "Printer").await;

    app.state.services.assets.retire(printer.id).await.unwrap();
    let err = app
        .state
        .services
        .checkouts
        .check_out(checkout_of(printer.id, borrower.id))
        .await
        .unwrap_err();
    assert_eq!(
        err.response_message(),
        "Asset is not available (Status: Out of Service)"
    );
}

#[tokio::test]
async fn checkout_needs_at_least_one_user() {
    let app = TestApp::new().await;
    let laptop = app.asset("Laptop 7", "LT-007", "Laptop").await;

    let err = app
        .state
        .services
        .checkouts
        .check_out(checkout_of(laptop.id, 1))
        .await
        .unwrap_err();
    assert_eq!(
        err.response_message(),
        "No users available. Add users before checking out assets."
    );

    let asset = app.state.services.assets.get(laptop.id).await.unwrap();
    assert_eq!(asset.status, AssetStatus::Available);
}
