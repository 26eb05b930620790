use maud::{html, Markup};

use super::{fmt_cost, fmt_datetime, fmt_opt_datetime, layout, maintenance_badge, status_badge};
use crate::handlers::common::PageCtx;
use crate::services::reports::{
    AssetReport, CheckoutReport, MaintenanceReport, ReportKind, ReportPeriod, StationeryReport,
};

fn export_links(kind: ReportKind) -> Markup {
    html! {
        p {
            "Download: "
            a href={ "/reports/export/" (kind) "/csv" } { "CSV" } " | "
            a href={ "/reports/export/" (kind) "/excel" } { "Excel" } " | "
            a href={ "/reports/export/" (kind) "/pdf" } { "PDF" }
        }
    }
}

pub fn index(ctx: &PageCtx) -> Markup {
    let reports = [
        ("/reports/assets", "Assets", "Counts by location, type and status."),
        ("/reports/stationery", "Stationery", "Stock levels and items below threshold."),
        ("/reports/checkouts", "Checkouts", "Checkouts opened in the last week, month or year."),
        ("/reports/maintenance", "Maintenance", "All maintenance records with total cost."),
    ];
    layout(
        ctx,
        "Reports",
        html! {
            div class="cards" {
                @for (href, title, blurb) in reports {
                    div class="card" {
                        a href=(href) { strong { (title) } }
                        span class="muted" { (blurb) }
                    }
                }
            }
        },
    )
}

pub fn assets(ctx: &PageCtx, report: &AssetReport) -> Markup {
    layout(
        ctx,
        "Asset report",
        html! {
            (export_links(ReportKind::Assets))
            p { "Total assets: " strong { (report.total) } }
            h2 { "By status" }
            table {
                tbody {
                    @for (status, n) in &report.status_counts {
                        tr { td { (status_badge(*status)) } td { (n) } }
                    }
                }
            }
            h2 { "By location and type" }
            table {
                thead { tr { th { "Location" } th { "Type" } th { "Count" } } }
                tbody {
                    @for (location, asset_type, n) in &report.by_location_and_type {
                        tr { td { (location) } td { (asset_type) } td { (n) } }
                    }
                }
            }
        },
    )
}

pub fn stationery(ctx: &PageCtx, report: &StationeryReport) -> Markup {
    layout(
        ctx,
        "Stationery report",
        html! {
            (export_links(ReportKind::Stationery))
            @if !report.low_stock.is_empty() {
                p class="flash flash-warning" {
                    (report.low_stock.len()) " item(s) below reorder threshold."
                }
            }
            table {
                thead { tr { th { "Item" } th { "Quantity" } th { "Threshold" } th { "Location" } th { "Updated" } } }
                tbody {
                    @for item in &report.items {
                        tr {
                            td {
                                (item.item_type)
                                @if item.is_low_stock() { " " span class="badge badge-out-of-service" { "Low" } }
                            }
                            td { (item.quantity) " " (item.unit) }
                            td { (item.threshold) }
                            td { (item.location) }
                            td { (fmt_datetime(&item.last_updated)) }
                        }
                    }
                }
            }
        },
    )
}

pub fn checkouts(ctx: &PageCtx, report: &CheckoutReport) -> Markup {
    layout(
        ctx,
        "Checkout report",
        html! {
            (export_links(ReportKind::Checkouts))
            p {
                @for (i, period) in ReportPeriod::ALL.iter().enumerate() {
                    @if i > 0 { " | " }
                    @if *period == report.period {
                        strong { "Last " (period) }
                    } @else {
                        a href={ "/reports/checkouts?period=" (period) } { "Last " (period) }
                    }
                }
            }
            p {
                (report.checkouts.len()) " checkout(s) since " (fmt_datetime(&report.since))
                ", " (report.still_out) " still out."
            }
            table {
                thead { tr { th { "Asset" } th { "User" } th { "Out" } th { "Due" } th { "Returned" } } }
                tbody {
                    @for row in &report.checkouts {
                        tr {
                            td { (row.asset_name) }
                            td { (row.username) }
                            td { (fmt_datetime(&row.checkout.checkout_date)) }
                            td { (fmt_opt_datetime(row.checkout.expected_return.as_ref(), "")) }
                            td { (fmt_opt_datetime(row.checkout.actual_return.as_ref(), "Still out")) }
                        }
                    }
                }
            }
        },
    )
}

pub fn maintenance(ctx: &PageCtx, report: &MaintenanceReport) -> Markup {
    layout(
        ctx,
        "Maintenance report",
        html! {
            (export_links(ReportKind::Maintenance))
            p {
                @for (status, n) in &report.status_counts {
                    (maintenance_badge(*status)) " " (n) " "
                }
                " Total cost: " strong { (fmt_cost(Some(report.total_cost))) }
            }
            table {
                thead { tr { th { "Asset" } th { "Started" } th { "Ended" } th { "Status" } th { "Technician" } th { "Cost" } } }
                tbody {
                    @for row in &report.records {
                        tr {
                            td { (row.asset_name) }
                            td { (fmt_datetime(&row.record.start_date)) }
                            td { (fmt_opt_datetime(row.record.end_date.as_ref(), "")) }
                            td { (maintenance_badge(row.record.status)) }
                            td { (row.record.technician) }
                            td { (fmt_cost(row.record.cost)) }
                        }
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_links_use_report_slug() {
        let markup = export_links(ReportKind::Checkouts).into_string();
        assert!(markup.contains("/reports/export/checkouts/csv"));
        assert!(markup.contains("/reports/export/checkouts/pdf"));
    }
}
