use maud::{html, Markup};

use super::{choices, fmt_datetime, layout, pagination, select_field, status_badge, textarea_field};
use crate::catalog::ASSET_LOCATIONS;
use crate::entities::asset;
use crate::handlers::common::{FieldErrors, PageCtx};
use crate::handlers::transfers::TransferForm;
use crate::services::{transfers::TransferRow, Page};

pub fn list(ctx: &PageCtx, page: &Page<TransferRow>) -> Markup {
    layout(
        ctx,
        "Transfers",
        html! {
            @if page.items.is_empty() {
                p class="muted" { "No transfers recorded." }
            } @else {
                table {
                    thead { tr { th { "When" } th { "Asset" } th { "From" } th { "To" } th { "By" } th { "Notes" } } }
                    tbody {
                        @for row in &page.items {
                            tr {
                                td { (fmt_datetime(&row.transfer.transferred_at)) }
                                td { a href={ "/assets/" (row.transfer.asset_id) } { (row.asset_name) } }
                                td { (row.transfer.from_location) }
                                td { (row.transfer.to_location) }
                                td { (row.transferred_by.as_deref().unwrap_or("Unknown")) }
                                td { (row.transfer.notes.as_deref().unwrap_or_default()) }
                            }
                        }
                    }
                }
            }
            (pagination("/transfers", page, ""))
        },
    )
}

pub fn form(
    ctx: &PageCtx,
    asset: &asset::Model,
    form: &TransferForm,
    errors: &FieldErrors,
) -> Markup {
    let destinations = choices(
        ASSET_LOCATIONS
            .iter()
            .copied()
            .filter(|location| *location != asset.location),
    );
    layout(
        ctx,
        &format!("Transfer {}", asset.name),
        html! {
            p {
                "Currently at " strong { (asset.location) } " " (status_badge(asset.status))
                ". Components move with it."
            }
            form method="post" action={ "/transfers/new/" (asset.id) } {
                (select_field("to_location", "Destination", destinations, &form.to_location, "Choose a location", errors))
                (textarea_field("notes", "Notes", &form.notes, errors))
                button type="submit" { "Transfer" }
            }
        },
    )
}
