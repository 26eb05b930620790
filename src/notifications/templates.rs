//! Bodies of outgoing mail, as (plain text, HTML) pairs.

use maud::{html, Markup, DOCTYPE};

use crate::entities::stationery;
use crate::services::reports::DashboardSummary;

fn wrap(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html {
            head { meta charset="utf-8"; title { (title) } }
            body style="font-family: Arial, sans-serif; color: #222;" {
                h2 { (title) }
                (body)
            }
        }
    }
    .into_string()
}

/// One line per item below threshold
pub fn low_stock_line(item: &stationery::Model) -> String {
    format!(
        "{}: {} {} remaining (Threshold: {})",
        item.item_type, item.quantity, item.unit, item.threshold
    )
}

pub fn low_stock_alert(items: &[stationery::Model]) -> (String, String) {
    let mut text = String::from("The following stationery items are below their reorder threshold:\n\n");
    for item in items {
        text.push_str(&low_stock_line(item));
        text.push('\n');
    }

    let body = html! {
        p { "The following stationery items are below their reorder threshold:" }
        ul {
            @for item in items {
                li { (low_stock_line(item)) }
            }
        }
    };
    (text, wrap("Low Stock Alert", body))
}

pub fn dashboard_report(summary: &DashboardSummary) -> (String, String) {
    let mut text = String::from("Dashboard Report\n\nAssets by type\n");
    for (category, n) in &summary.headline_counts {
        text.push_str(&format!("  {}: {}\n", category, n));
    }
    text.push_str("\nAssets by status\n");
    for (status, n) in &summary.status_counts {
        text.push_str(&format!("  {}: {}\n", status, n));
    }
    text.push_str(&format!(
        "\nPending maintenance: {}\nActive checkouts: {}\n",
        summary.pending_maintenance, summary.active_checkouts
    ));
    if summary.low_stock.is_empty() {
        text.push_str("\nNo stationery is low on stock.\n");
    } else {
        text.push_str("\nLow stock\n");
        for item in &summary.low_stock {
            text.push_str(&format!("  {}\n", low_stock_line(item)));
        }
    }

    let body = html! {
        h3 { "Assets by type" }
        table border="1" cellpadding="4" cellspacing="0" {
            @for (category, n) in &summary.headline_counts {
                tr { td { (category) } td { (n) } }
            }
        }
        h3 { "Assets by status" }
        table border="1" cellpadding="4" cellspacing="0" {
            @for (status, n) in &summary.status_counts {
                tr { td { (status) } td { (n) } }
            }
        }
        p {
            "Pending maintenance: " strong { (summary.pending_maintenance) }
            br;
            "Active checkouts: " strong { (summary.active_checkouts) }
        }
        @if summary.low_stock.is_empty() {
            p { "No stationery is low on stock." }
        } @else {
            h3 { "Low stock" }
            ul {
                @for item in &summary.low_stock {
                    li { (low_stock_line(item)) }
                }
            }
        }
    };
    (text, wrap("Dashboard Report", body))
}

pub fn password_reset(username: &str, link: &str, expires_in_minutes: u64) -> (String, String) {
    let expiry = format!(
        "The link expires in {} minutes. If you did not request a reset, ignore this message.",
        expires_in_minutes
    );
    let text = format!(
        "Dear {},\n\nTo reset your password open the following link:\n\n{}\n\n{}\n",
        username, link, expiry
    );
    let body = html! {
        p { "Dear " (username) "," }
        p { "To reset your password " a href=(link) { "click here" } "." }
        p { "Alternatively, paste this link into your browser:" br; (link) }
        p { (expiry) }
    };
    (text, wrap("Reset Your Password", body))
}
