mod common;

use assert_matches::assert_matches;
use common::TestApp;
use inventory_desk::{
    errors::ServiceError,
    lifecycle::StockAdjustment,
    notifications::LOW_STOCK_SUBJECT,
    scheduler,
    services::stationery::{NewStationery, StockUpdate},
};

fn adjust(adjustment: StockAdjustment) -> StockUpdate {
    StockUpdate {
        adjustment,
        threshold: None,
        location: None,
    }
}

#[tokio::test]
async fn new_items_take_the_configured_default_threshold() {
    let app = TestApp::new().await;
    let stationery = &app.state.services.stationery;

    let a4 = stationery
        .create(NewStationery {
            item_type: "a4".into(),
            quantity: 500,
            unit: "Sheets".into(),
            threshold: None,
            location: None,
        })
        .await
        .unwrap();
    assert_eq!(a4.item_type, "A4");
    assert_eq!(a4.unit, "sheets");
    assert_eq!(a4.threshold, 100);
    assert_eq!(a4.location, "Main Office");

    let err = stationery
        .create(NewStationery {
            item_type: "A4".into(),
            quantity: -1,
            unit: "sheets".into(),
            threshold: None,
            location: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::FieldInvalid { field, .. } if field == "quantity");
}

#[tokio::test]
async fn stock_goes_up_and_down() {
    let app = TestApp::new().await;
    let item = app.stationery("A3", 40, 10).await;
    let stationery = &app.state.services.stationery;

    let item = stationery
        .adjust(item.id, adjust(StockAdjustment::Add(25)))
        .await
        .unwrap();
    assert_eq!(item.quantity, 65);

    let item = stationery
        .adjust(
            item.id,
            StockUpdate {
                adjustment: StockAdjustment::Subtract(60),
                threshold: Some(20),
                location: Some("Store Room".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(item.quantity, 5);
    assert_eq!(item.threshold, 20);
    assert_eq!(item.location, "Store Room");
    assert!(item.is_low_stock());
}

#[tokio::test]
async fn cannot_subtract_more_than_is_in_stock() {
    let app = TestApp::new().await;
    let item = app.stationery("A5", 5, 2).await;
    let stationery = &app.state.services.stationery;

    let err = stationery
        .adjust(item.id, adjust(StockAdjustment::Subtract(12)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(err.response_message(), "Cannot subtract 12; only 5 sheets in stock.");

    let unchanged = stationery.get(item.id).await.unwrap();
    assert_eq!(unchanged.quantity, 5);
}

#[tokio::test]
async fn low_stock_lists_items_strictly_below_threshold() {
    let app = TestApp::new().await;
    app.stationery("A4", 99, 100).await;
    app.stationery("A3", 50, 50).await;
    app.stationery("A5", 0, 1).await;

    let low: Vec<String> = app
        .state
        .services
        .stationery
        .low_stock()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.item_type)
        .collect();
    assert_eq!(low.len(), 2);
    assert!(low.contains(&"A4".to_string()));
    assert!(low.contains(&"A5".to_string()));
}

#[tokio::test]
async fn low_stock_check_mails_the_admins() {
    let app = TestApp::new().await;
    app.stationery("A4", 30, 100).await;
    app.stationery("A3", 80, 50).await;

    let low = scheduler::run_low_stock_check(&app.state.services.reports, &app.state.notifier)
        .await
        .unwrap();
    assert_eq!(low, 1);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, LOW_STOCK_SUBJECT);
    assert_eq!(sent[0].to, vec!["admin@example.com".to_string()]);
    assert!(sent[0]
        .text_body
        .contains("A4: 30 sheets remaining (Threshold: 100)"));
    assert!(!sent[0].text_body.contains("A3:"));
}

#[tokio::test]
async fn low_stock_check_stays_quiet_when_stock_is_fine() {
    let app = TestApp::new().await;
    app.stationery("A4", 300, 100).await;

    let low = scheduler::run_low_stock_check(&app.state.services.reports, &app.state.notifier)
        .await
        .unwrap();
    assert_eq!(low, 0);
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn deleting_an_item_removes_it() {
    let app = TestApp::new().await;
    let item = app.stationery("A4", 10, 5).await;
    let stationery = &app.state.services.stationery;

    let removed = stationery.delete(item.id).await.unwrap();
    assert_eq!(removed.id, item.id);
    assert_matches!(stationery.get(item.id).await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn restocking_clears_the_low_stock_list() {
    let app = TestApp::new().await;
    let a4 = app.stationery("A4", 10, 15).await;
    let stationery = &app.state.services.stationery;

    let low: Vec<_> = stationery
        .low_stock()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(low, vec![a4.id]);

    let restocked = stationery
        .adjust(a4.id, adjust(StockAdjustment::Add(10)))
        .await
        .unwrap();
    assert_eq!(restocked.quantity, 20);
    assert!(stationery.low_stock().await.unwrap().is_empty());
}
