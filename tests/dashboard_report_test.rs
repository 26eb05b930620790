mod common;

use common::TestApp;
use inventory_desk::{
    entities::{AssetStatus, MaintenanceStatus, UserRole},
    export::{self, ExportFormat},
    services::{
        checkouts::NewCheckout,
        maintenance::MaintenanceDetails,
        reports::{dashboard_table, ReportKind, ReportPeriod},
    },
};

async fn seed(app: &TestApp) {
    let staff = app.user("amira", UserRole::Staff).await;
    app.asset_with_components(
        "Lab PC 1",
        "PC-001",
        "Desktop",
        vec![("Monitor", "MN-001"), ("Keyboard", "KB-001")],
    )
    .await;
    let printer = app.asset("Printer 1", "PR-001", "Printer").await;
    let camera = app.asset("Camera 1", "CA-001", "Camera").await;
    app.stationery("A4", 20, 100).await;
    app.stationery("A3", 80, 50).await;

    app.state
        .services
        .checkouts
        .check_out(NewCheckout {
            asset_id: camera.id,
            user_id: staff.id,
            expected_return: None,
            condition_out: "Good".into(),
            notes: None,
        })
        .await
        .unwrap();
    app.state
        .services
        .maintenance
        .create(
            printer.id,
            MaintenanceDetails {
                description: "Paper jam".into(),
                technician: "Yusuf".into(),
                cost: Some(12.0),
                status: MaintenanceStatus::Pending,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn dashboard_summarises_the_inventory() {
    let app = TestApp::new().await;
    seed(&app).await;

    let summary = app.state.services.reports.dashboard().await.unwrap();
    assert_eq!(summary.total_assets, 5);
    assert_eq!(summary.active_checkouts, 1);
    assert_eq!(summary.pending_maintenance, 1);
    assert_eq!(summary.low_stock.len(), 1);
    assert_eq!(summary.low_stock[0].item_type, "A4");

    let headline = |name: &str| {
        summary
            .headline_counts
            .iter()
            .find(|(category, _)| category == name)
            .map(|(_, n)| *n)
    };
    assert_eq!(headline("Monitor"), Some(1));
    assert_eq!(headline("Keyboard"), Some(1));
    assert_eq!(headline("Printer"), Some(1));
    assert_eq!(headline("Server"), Some(0));
    // Desktop and Camera are not headline categories
    assert_eq!(headline("Other"), Some(2));

    let status = |wanted: AssetStatus| {
        summary
            .status_counts
            .iter()
            .find(|(s, _)| *s == wanted)
            .map(|(_, n)| *n)
    };
    assert_eq!(status(AssetStatus::Available), Some(3));
    assert_eq!(status(AssetStatus::InUse), Some(1));
    assert_eq!(status(AssetStatus::Maintenance), Some(1));
    assert_eq!(status(AssetStatus::OutOfService), Some(0));
}

#[tokio::test]
async fn dashboard_csv_has_section_rows() {
    let app = TestApp::new().await;
    seed(&app).await;

    let summary = app.state.services.reports.dashboard().await.unwrap();
    let bytes = export::render(&dashboard_table(&summary), ExportFormat::Csv).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Section,Category,Count"));
    assert!(text.contains("Asset Type,Other,2"));
    assert!(text.contains("Active Checkouts"));
}

#[tokio::test]
async fn report_pages_aggregate_their_tables() {
    let app = TestApp::new().await;
    seed(&app).await;
    let reports = &app.state.services.reports;

    let assets = reports.asset_report().await.unwrap();
    assert_eq!(assets.total, 5);
    assert!(assets
        .by_location_and_type
        .contains(&("Rabwat".to_string(), "Printer".to_string(), 1)));

    let stationery = reports.stationery_report().await.unwrap();
    assert_eq!(stationery.items.len(), 2);
    assert_eq!(stationery.low_stock.len(), 1);

    let checkouts = reports.checkout_report(ReportPeriod::Week).await.unwrap();
    assert_eq!(checkouts.checkouts.len(), 1);
    assert_eq!(checkouts.still_out, 1);
    assert_eq!(checkouts.checkouts[0].username, "amira");

    let maintenance = reports.maintenance_report().await.unwrap();
    assert_eq!(maintenance.records.len(), 1);
    assert!((maintenance.total_cost - 12.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn every_report_exports_in_every_format() {
    let app = TestApp::new().await;
    seed(&app).await;

    for kind in ["assets", "stationery", "checkouts", "maintenance"] {
        let table = app
            .state
            .services
            .reports
            .table(ReportKind::parse(kind).unwrap())
            .await
            .unwrap();
        assert!(!table.rows.is_empty(), "{} report is empty", kind);

        for format in [ExportFormat::Csv, ExportFormat::Excel, ExportFormat::Pdf] {
            let bytes = export::render(&table, format).unwrap();
            assert!(!bytes.is_empty(), "{} {} export is empty", kind, format);
        }
    }
    assert!(ReportKind::parse("payroll").is_err());
}
