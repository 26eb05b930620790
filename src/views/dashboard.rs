use maud::{html, Markup, PreEscaped};

use super::{layout, status_badge};
use crate::handlers::common::PageCtx;
use crate::services::reports::DashboardSummary;

const WIDGET_SCRIPT: &str = r#"
async function postJson(url, body) {
  const res = await fetch(url, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(body),
  });
  return [res.status, await res.json()];
}
document.getElementById('scan-form').addEventListener('submit', async (e) => {
  e.preventDefault();
  const out = document.getElementById('scan-result');
  const [status, data] = await postJson('/scan_qr', { qr_data: e.target.qr_data.value });
  if (status === 200) {
    out.innerHTML = '';
    const link = document.createElement('a');
    link.href = data.details_url;
    link.textContent = data.name + ' (' + data.status + ')';
    out.appendChild(link);
  } else {
    out.textContent = data.error;
  }
});
document.getElementById('email-form').addEventListener('submit', async (e) => {
  e.preventDefault();
  const out = document.getElementById('email-result');
  const [, data] = await postJson('/send-dashboard-email', { email: e.target.email.value });
  out.textContent = data.success ? 'Report sent.' : data.error;
});
"#;

pub fn dashboard(ctx: &PageCtx, summary: &DashboardSummary) -> Markup {
    layout(
        ctx,
        "Dashboard",
        html! {
            div class="cards" {
                div class="card" { strong { (summary.total_assets) } "Assets" }
                @for (category, n) in &summary.headline_counts {
                    div class="card" { strong { (n) } (category) }
                }
                div class="card" {
                    strong { (summary.pending_maintenance) }
                    a href="/maintenance?status=Pending" { "Pending maintenance" }
                }
                div class="card" {
                    strong { (summary.active_checkouts) }
                    a href="/checkout/active" { "Active checkouts" }
                }
            }

            h2 { "Assets by status" }
            table {
                thead { tr { th { "Status" } th { "Count" } } }
                tbody {
                    @for (status, n) in &summary.status_counts {
                        tr {
                            td { a href={ "/assets?status=" (status) } { (status_badge(*status)) } }
                            td { (n) }
                        }
                    }
                }
            }

            h2 { "Assets by type" }
            table {
                thead { tr { th { "Type" } th { "Count" } } }
                tbody {
                    @for (asset_type, n) in &summary.type_counts {
                        tr { td { (asset_type) } td { (n) } }
                    }
                }
            }

            h2 { "Low stock" }
            @if summary.low_stock.is_empty() {
                p class="muted" { "All stationery is above its reorder threshold." }
            } @else {
                table {
                    thead { tr { th { "Item" } th { "Quantity" } th { "Threshold" } th { "Location" } } }
                    tbody {
                        @for item in &summary.low_stock {
                            tr {
                                td { a href={ "/stationery/update/" (item.id) } { (item.item_type) } }
                                td { (item.quantity) " " (item.unit) }
                                td { (item.threshold) }
                                td { (item.location) }
                            }
                        }
                    }
                }
            }

            h2 { "Scan a label" }
            form id="scan-form" {
                textarea name="qr_data" rows="4" placeholder="Paste QR contents" {}
                button type="submit" { "Look up" }
            }
            p id="scan-result" {}

            h2 { "Share" }
            form id="email-form" {
                input type="email" name="email" placeholder="name@example.com";
                button type="submit" { "Email this report" }
            }
            p id="email-result" {}
            p { a href="/export-dashboard" { "Download as CSV" } }

            script { (PreEscaped(WIDGET_SCRIPT)) }
        },
    )
}
