use crate::{
    catalog::DASHBOARD_TYPE_CATEGORIES,
    db::DbPool,
    entities::{asset, checkout, maintenance, stationery, AssetStatus, MaintenanceStatus},
    errors::ServiceError,
    export::{Cell, ReportTable},
    services::{
        checkouts::{checkout_rows, CheckoutRow},
        maintenance::{maintenance_rows, MaintenanceRow},
        stationery::low_stock_items,
    },
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Figures shown on the dashboard and mailed in the report email
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_assets: u64,
    /// Headline categories in display order, then "Other"
    pub headline_counts: Vec<(String, u64)>,
    /// Every recorded type, alphabetical
    pub type_counts: Vec<(String, u64)>,
    /// All four statuses, zero-filled
    pub status_counts: Vec<(AssetStatus, u64)>,
    pub low_stock: Vec<stationery::Model>,
    pub pending_maintenance: u64,
    pub active_checkouts: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetReport {
    /// (location, type, count)
    pub by_location_and_type: Vec<(String, String, u64)>,
    pub status_counts: Vec<(AssetStatus, u64)>,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationeryReport {
    pub items: Vec<stationery::Model>,
    pub low_stock: Vec<stationery::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReport {
    pub period: ReportPeriod,
    pub since: DateTime<Utc>,
    pub checkouts: Vec<CheckoutRow>,
    pub still_out: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceReport {
    pub records: Vec<MaintenanceRow>,
    pub status_counts: Vec<(MaintenanceStatus, u64)>,
    pub total_cost: f64,
}

/// Look-back window of the checkout report
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    #[default]
    Week,
    Month,
    Year,
}

impl ReportPeriod {
    pub const ALL: [ReportPeriod; 3] = [ReportPeriod::Week, ReportPeriod::Month, ReportPeriod::Year];

    pub fn days(self) -> i64 {
        match self {
            ReportPeriod::Week => 7,
            ReportPeriod::Month => 30,
            ReportPeriod::Year => 365,
        }
    }
}

/// Reports that can be downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReportKind {
    Assets,
    Stationery,
    Checkouts,
    Maintenance,
}

impl ReportKind {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        ReportKind::from_str(value)
            .map_err(|_| ServiceError::NotFound(format!("Unknown report: {}", value)))
    }
}

/// Read-only aggregates over the inventory tables
pub struct ReportService {
    db: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardSummary, ServiceError> {
        let type_counts = self.counts_by_type().await?;
        let total_assets = type_counts.iter().map(|(_, n)| n).sum();

        Ok(DashboardSummary {
            total_assets,
            headline_counts: headline_counts(&type_counts),
            type_counts,
            status_counts: self.counts_by_status().await?,
            low_stock: self.low_stock().await?,
            pending_maintenance: maintenance::Entity::find()
                .filter(maintenance::Column::Status.eq(MaintenanceStatus::Pending))
                .count(&*self.db)
                .await?,
            active_checkouts: checkout::Entity::find()
                .filter(checkout::Column::ActualReturn.is_null())
                .count(&*self.db)
                .await?,
        })
    }

    pub async fn low_stock(&self) -> Result<Vec<stationery::Model>, ServiceError> {
        low_stock_items(&*self.db).await
    }

    #[instrument(skip(self))]
    pub async fn asset_report(&self) -> Result<AssetReport, ServiceError> {
        let rows: Vec<(String, String, i64)> = asset::Entity::find()
            .select_only()
            .column(asset::Column::Location)
            .column(asset::Column::AssetType)
            .column_as(Expr::col(asset::Column::Id).count(), "count")
            .group_by(asset::Column::Location)
            .group_by(asset::Column::AssetType)
            .order_by_asc(asset::Column::Location)
            .order_by_asc(asset::Column::AssetType)
            .into_tuple()
            .all(&*self.db)
            .await?;

        let by_location_and_type: Vec<(String, String, u64)> = rows
            .into_iter()
            .map(|(location, asset_type, n)| (location, asset_type, n.max(0) as u64))
            .collect();
        let total = by_location_and_type.iter().map(|(_, _, n)| n).sum();

        Ok(AssetReport {
            by_location_and_type,
            status_counts: self.counts_by_status().await?,
            total,
        })
    }

    #[instrument(skip(self))]
    pub async fn stationery_report(&self) -> Result<StationeryReport, ServiceError> {
        let items = stationery::Entity::find()
            .order_by_asc(stationery::Column::ItemType)
            .order_by_asc(stationery::Column::Id)
            .all(&*self.db)
            .await?;
        let low_stock = items.iter().filter(|i| i.is_low_stock()).cloned().collect();
        Ok(StationeryReport { items, low_stock })
    }

    /// Checkouts opened within the period, newest first
    #[instrument(skip(self))]
    pub async fn checkout_report(&self, period: ReportPeriod) -> Result<CheckoutReport, ServiceError> {
        let since = Utc::now() - Duration::days(period.days());
        let checkouts = checkout::Entity::find()
            .filter(checkout::Column::CheckoutDate.gte(since))
            .order_by_desc(checkout::Column::CheckoutDate)
            .all(&*self.db)
            .await?;
        let checkouts = checkout_rows(&*self.db, checkouts).await?;
        let still_out = checkouts.iter().filter(|row| row.checkout.is_open()).count();

        Ok(CheckoutReport {
            period,
            since,
            checkouts,
            still_out,
        })
    }

    #[instrument(skip(self))]
    pub async fn maintenance_report(&self) -> Result<MaintenanceReport, ServiceError> {
        let records = maintenance::Entity::find()
            .order_by_desc(maintenance::Column::StartDate)
            .all(&*self.db)
            .await?;
        let total_cost = records.iter().filter_map(|r| r.cost).sum();
        let status_counts = MaintenanceStatus::ALL
            .iter()
            .map(|status| {
                let n = records.iter().filter(|r| r.status == *status).count() as u64;
                (*status, n)
            })
            .collect();

        Ok(MaintenanceReport {
            records: maintenance_rows(&*self.db, records).await?,
            status_counts,
            total_cost,
        })
    }

    /// Full table for a downloadable report
    #[instrument(skip(self))]
    pub async fn table(&self, kind: ReportKind) -> Result<ReportTable, ServiceError> {
        match kind {
            ReportKind::Assets => {
                let assets = asset::Entity::find()
                    .order_by_asc(asset::Column::Id)
                    .all(&*self.db)
                    .await?;
                Ok(asset_table(&assets))
            }
            ReportKind::Stationery => Ok(stationery_table(&self.stationery_report().await?.items)),
            ReportKind::Checkouts => {
                let checkouts = checkout::Entity::find()
                    .order_by_desc(checkout::Column::CheckoutDate)
                    .all(&*self.db)
                    .await?;
                Ok(checkout_table(&checkout_rows(&*self.db, checkouts).await?))
            }
            ReportKind::Maintenance => {
                Ok(maintenance_table(&self.maintenance_report().await?.records))
            }
        }
    }

    async fn counts_by_type(&self) -> Result<Vec<(String, u64)>, ServiceError> {
        let rows: Vec<(String, i64)> = asset::Entity::find()
            .select_only()
            .column(asset::Column::AssetType)
            .column_as(Expr::col(asset::Column::Id).count(), "count")
            .group_by(asset::Column::AssetType)
            .order_by_asc(asset::Column::AssetType)
            .into_tuple()
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(asset_type, n)| (asset_type, n.max(0) as u64))
            .collect())
    }

    async fn counts_by_status(&self) -> Result<Vec<(AssetStatus, u64)>, ServiceError> {
        let rows: Vec<(String, i64)> = asset::Entity::find()
            .select_only()
            .column(asset::Column::Status)
            .column_as(Expr::col(asset::Column::Id).count(), "count")
            .group_by(asset::Column::Status)
            .into_tuple()
            .all(&*self.db)
            .await?;
        Ok(zero_filled_statuses(rows))
    }
}

/// Folds per-type counts into the headline categories plus "Other"
pub fn headline_counts(type_counts: &[(String, u64)]) -> Vec<(String, u64)> {
    let mut headline: BTreeMap<&str, u64> = BTreeMap::new();
    let mut other = 0;
    for (asset_type, n) in type_counts {
        match DASHBOARD_TYPE_CATEGORIES
            .iter()
            .find(|category| category.eq_ignore_ascii_case(asset_type.trim()))
        {
            Some(category) => *headline.entry(*category).or_default() += n,
            None => other += n,
        }
    }

    DASHBOARD_TYPE_CATEGORIES
        .iter()
        .map(|category| {
            (
                category.to_string(),
                headline.get(category).copied().unwrap_or(0),
            )
        })
        .chain(std::iter::once(("Other".to_string(), other)))
        .collect()
}

fn zero_filled_statuses(rows: Vec<(String, i64)>) -> Vec<(AssetStatus, u64)> {
    AssetStatus::ALL
        .iter()
        .map(|status| {
            let label = status.to_string();
            let n = rows
                .iter()
                .filter(|(s, _)| *s == label)
                .map(|(_, n)| (*n).max(0) as u64)
                .sum();
            (*status, n)
        })
        .collect()
}

/// Section,Category,Count rows behind the dashboard CSV
pub fn dashboard_table(summary: &DashboardSummary) -> ReportTable {
    let mut table = ReportTable::new("Dashboard Report", &["Section", "Category", "Count"]);
    for (category, n) in &summary.headline_counts {
        table.push(vec!["Asset Type".into(), category.as_str().into(), (*n).into()]);
    }
    for (status, n) in &summary.status_counts {
        table.push(vec!["Status".into(), status.to_string().into(), (*n).into()]);
    }
    table.push(vec![
        "Other".into(),
        "Pending Maintenance".into(),
        summary.pending_maintenance.into(),
    ]);
    table.push(vec![
        "Other".into(),
        "Active Checkouts".into(),
        summary.active_checkouts.into(),
    ]);
    table
}

pub fn asset_table(assets: &[asset::Model]) -> ReportTable {
    let mut table = ReportTable::new(
        "Asset Report",
        &["ID", "Name", "Serial", "Type", "Location", "Status"],
    );
    for a in assets {
        table.push(vec![
            a.id.into(),
            a.name.as_str().into(),
            a.serial_number.as_str().into(),
            a.asset_type.as_str().into(),
            a.location.as_str().into(),
            a.status.to_string().into(),
        ]);
    }
    table
}

pub fn stationery_table(items: &[stationery::Model]) -> ReportTable {
    let mut table = ReportTable::new(
        "Stationery Report",
        &["ID", "Item Type", "Quantity", "Unit", "Threshold", "Location"],
    );
    for item in items {
        table.push(vec![
            item.id.into(),
            item.item_type.as_str().into(),
            item.quantity.into(),
            item.unit.as_str().into(),
            item.threshold.into(),
            item.location.as_str().into(),
        ]);
    }
    table
}

pub fn checkout_table(rows: &[CheckoutRow]) -> ReportTable {
    let mut table = ReportTable::new(
        "Checkout Report",
        &["ID", "Asset", "User", "Checkout Date", "Return Date"],
    );
    for row in rows {
        let returned = row
            .checkout
            .actual_return
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "Not returned".to_string());
        table.push(vec![
            row.checkout.id.into(),
            row.asset_name.as_str().into(),
            row.username.as_str().into(),
            row.checkout.checkout_date.format(DATE_FORMAT).to_string().into(),
            returned.into(),
        ]);
    }
    table
}

pub fn maintenance_table(rows: &[MaintenanceRow]) -> ReportTable {
    let mut table = ReportTable::new(
        "Maintenance Report",
        &["ID", "Asset", "Start Date", "End Date", "Status", "Cost"],
    );
    for row in rows {
        let ended = row
            .record
            .end_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "Ongoing".to_string());
        table.push(vec![
            row.record.id.into(),
            row.asset_name.as_str().into(),
            row.record.start_date.format(DATE_FORMAT).to_string().into(),
            ended.into(),
            row.record.status.to_string().into(),
            row.record.cost.map(Cell::from).unwrap_or_else(|| "".into()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn headline_counts_fold_case_and_others() {
        let counts = vec![
            ("monitor".to_string(), 2),
            ("Monitor".to_string(), 3),
            ("CPU".to_string(), 4),
            ("Laptop".to_string(), 5),
            ("TV".to_string(), 1),
        ];
        let headline = headline_counts(&counts);
        assert_eq!(headline.len(), DASHBOARD_TYPE_CATEGORIES.len() + 1);
        assert_eq!(headline[0], ("Monitor".to_string(), 5));
        assert!(headline.contains(&("CPU".to_string(), 4)));
        assert!(headline.contains(&("Server".to_string(), 0)));
        assert_eq!(headline.last(), Some(&("Other".to_string(), 6)));
    }

    #[test]
    fn statuses_are_zero_filled() {
        let counts = zero_filled_statuses(vec![("In-use".to_string(), 2)]);
        assert_eq!(
            counts,
            vec![
                (AssetStatus::Available, 0),
                (AssetStatus::InUse, 2),
                (AssetStatus::Maintenance, 0),
                (AssetStatus::OutOfService, 0),
            ]
        );
    }

    #[rstest]
    #[case("week", ReportPeriod::Week, 7)]
    #[case("Month", ReportPeriod::Month, 30)]
    #[case("YEAR", ReportPeriod::Year, 365)]
    fn parses_periods(#[case] raw: &str, #[case] period: ReportPeriod, #[case] days: i64) {
        let parsed = ReportPeriod::from_str(raw).unwrap();
        assert_eq!(parsed, period);
        assert_eq!(parsed.days(), days);
    }

    #[test]
    fn unknown_report_is_not_found() {
        assert!(matches!(ReportKind::parse("payroll"), Err(ServiceError::NotFound(_))));
        assert_eq!(ReportKind::parse("Assets").unwrap(), ReportKind::Assets);
    }

    #[test]
    fn dashboard_table_layout() {
        let summary = DashboardSummary {
            total_assets: 3,
            headline_counts: headline_counts(&[("Printer".to_string(), 3)]),
            type_counts: vec![("Printer".to_string(), 3)],
            status_counts: zero_filled_statuses(vec![("Available".to_string(), 3)]),
            low_stock: vec![],
            pending_maintenance: 1,
            active_checkouts: 0,
        };
        let table = dashboard_table(&summary);
        assert_eq!(table.headers, vec!["Section", "Category", "Count"]);
        // 6 headline + Other, 4 statuses, 2 trailing
        assert_eq!(table.rows.len(), 13);
        assert_eq!(
            table.rows[11],
            vec![
                Cell::from("Other"),
                Cell::from("Pending Maintenance"),
                Cell::from(1u64)
            ]
        );
    }
}
