use maud::{html, Markup};

use super::{
    choices, fmt_cost, fmt_date, fmt_datetime, fmt_opt_datetime, input_field, layout,
    maintenance_badge, pagination, post_button, select_field, status_badge, textarea_field,
};
use crate::catalog::{ASSET_LOCATIONS, ASSET_TYPES, COMPONENT_TYPES, COMPOSITE_TYPE};
use crate::entities::{asset, checkout, maintenance, AssetStatus};
use crate::handlers::assets::{AssetForm, AssetListQuery};
use crate::handlers::common::{FieldErrors, PageCtx};
use crate::services::checkouts::CheckoutRow;
use crate::services::transfers::TransferRow;
use crate::services::Page;

/// Everything shown on an asset's page
pub struct AssetDetails {
    pub asset: asset::Model,
    pub parent: Option<asset::Model>,
    pub components: Vec<asset::Model>,
    pub open_checkout: Option<checkout::Model>,
    pub checkouts: Vec<CheckoutRow>,
    pub maintenance: Vec<maintenance::Model>,
    pub transfers: Vec<TransferRow>,
}

pub fn list(ctx: &PageCtx, page: &Page<asset::Model>, query: &AssetListQuery) -> Markup {
    let location = query.location.as_deref().unwrap_or_default();
    let status = query.status.as_deref().unwrap_or_default();
    let no_errors = FieldErrors::new();
    layout(
        ctx,
        "Assets",
        html! {
            form method="get" action="/assets" {
                (select_field("location", "Location", choices(ASSET_LOCATIONS.iter().copied()), location, "All locations", &no_errors))
                (select_field("status", "Status", AssetStatus::ALL.map(|s| (s.to_string(), s.to_string())), status, "All statuses", &no_errors))
                button type="submit" { "Filter" }
                " " a href="/assets" { "Clear" }
            }
            @if ctx.user.can_modify() {
                p { a href="/assets/add" { "Add asset" } }
            }
            @if page.items.is_empty() {
                p class="muted" { "No assets match." }
            } @else {
                table {
                    thead { tr { th { "Name" } th { "Serial" } th { "Type" } th { "Location" } th { "Status" } } }
                    tbody {
                        @for asset in &page.items {
                            tr {
                                td { a href={ "/assets/" (asset.id) } { (asset.name) } }
                                td { (asset.serial_number) }
                                td { (asset.asset_type) }
                                td { (asset.location) }
                                td { (status_badge(asset.status)) }
                            }
                        }
                    }
                }
            }
            (pagination("/assets", page, &query.query_string()))
        },
    )
}

pub fn details(ctx: &PageCtx, d: &AssetDetails) -> Markup {
    let asset = &d.asset;
    let id = asset.id;
    layout(
        ctx,
        &asset.name,
        html! {
            table {
                tbody {
                    tr { th { "Serial" } td { (asset.serial_number) } }
                    tr { th { "Type" } td { (asset.asset_type) } }
                    tr { th { "Location" } td { (asset.location) } }
                    tr { th { "Status" } td { (status_badge(asset.status)) } }
                    tr { th { "Condition" } td { (asset.condition.as_deref().unwrap_or_default()) } }
                    tr { th { "Purchased" } td { (fmt_date(asset.purchase_date.as_ref())) } }
                    tr { th { "Cost" } td { (fmt_cost(asset.purchase_cost)) } }
                    tr { th { "Notes" } td { (asset.notes.as_deref().unwrap_or_default()) } }
                    tr { th { "Last updated" } td { (fmt_datetime(&asset.last_updated)) } }
                    @if let Some(parent) = &d.parent {
                        tr { th { "Part of" } td { a href={ "/assets/" (parent.id) } { (parent.name) } } }
                    }
                }
            }

            @if ctx.user.can_modify() {
                p {
                    a href={ "/assets/edit/" (id) } { "Edit" } " | "
                    @if let Some(open) = &d.open_checkout {
                        a href={ "/checkout/checkin/" (open.id) } { "Check in" } " | "
                    } @else if asset.status == AssetStatus::Available {
                        a href={ "/checkout/checkout/" (id) } { "Check out" } " | "
                    }
                    @if asset.status != AssetStatus::InUse {
                        a href={ "/maintenance/add/" (id) } { "Schedule maintenance" } " | "
                        a href={ "/transfers/new/" (id) } { "Transfer" }
                    }
                }
            }
            @if ctx.user.is_admin() {
                p {
                    @if asset.status == AssetStatus::Available {
                        (post_button(&format!("/assets/retire/{}", id), "Take out of service", None)) " "
                    }
                    @if asset.status == AssetStatus::OutOfService {
                        (post_button(&format!("/assets/reinstate/{}", id), "Return to service", None)) " "
                    }
                    (post_button(
                        &format!("/assets/delete/{}", id),
                        "Delete",
                        Some("Delete this asset, its components and all of their history?"),
                    ))
                }
            }

            @if asset.qr_code.is_some() {
                h2 { "Label" }
                pre { (asset.qr_code.as_deref().unwrap_or_default()) }
            }

            @if !d.components.is_empty() {
                h2 { "Components" }
                table {
                    thead { tr { th { "Name" } th { "Type" } th { "Serial" } th { "Status" } } }
                    tbody {
                        @for component in &d.components {
                            tr {
                                td { a href={ "/assets/" (component.id) } { (component.name) } }
                                td { (component.asset_type) }
                                td { (component.serial_number) }
                                td { (status_badge(component.status)) }
                            }
                        }
                    }
                }
            }

            h2 { "Checkouts" }
            @if d.checkouts.is_empty() {
                p class="muted" { "Never checked out." }
            } @else {
                table {
                    thead { tr { th { "User" } th { "Out" } th { "Due" } th { "Returned" } th { "Condition" } } }
                    tbody {
                        @for row in &d.checkouts {
                            tr {
                                td { (row.username) }
                                td { (fmt_datetime(&row.checkout.checkout_date)) }
                                td { (fmt_opt_datetime(row.checkout.expected_return.as_ref(), "")) }
                                td { (fmt_opt_datetime(row.checkout.actual_return.as_ref(), "Not returned")) }
                                td { (row.checkout.condition_out) @if let Some(c) = &row.checkout.condition_in { " / " (c) } }
                            }
                        }
                    }
                }
            }

            h2 { "Maintenance" }
            @if d.maintenance.is_empty() {
                p class="muted" { "No maintenance recorded." }
            } @else {
                table {
                    thead { tr { th { "Started" } th { "Ended" } th { "Description" } th { "Technician" } th { "Cost" } th { "Status" } } }
                    tbody {
                        @for record in &d.maintenance {
                            tr {
                                td { (fmt_datetime(&record.start_date)) }
                                td { (fmt_opt_datetime(record.end_date.as_ref(), "Ongoing")) }
                                td { (record.description) }
                                td { (record.technician) }
                                td { (fmt_cost(record.cost)) }
                                td {
                                    @if record.status.is_open() && ctx.user.can_modify() {
                                        a href={ "/maintenance/update/" (record.id) } { (maintenance_badge(record.status)) }
                                    } @else {
                                        (maintenance_badge(record.status))
                                    }
                                }
                            }
                        }
                    }
                }
            }

            h2 { "Transfers" }
            @if d.transfers.is_empty() {
                p class="muted" { "Never moved." }
            } @else {
                table {
                    thead { tr { th { "When" } th { "From" } th { "To" } th { "By" } th { "Notes" } } }
                    tbody {
                        @for row in &d.transfers {
                            tr {
                                td { (fmt_datetime(&row.transfer.transferred_at)) }
                                td { (row.transfer.from_location) }
                                td { (row.transfer.to_location) }
                                td { (row.transferred_by.as_deref().unwrap_or_default()) }
                                td { (row.transfer.notes.as_deref().unwrap_or_default()) }
                            }
                        }
                    }
                }
            }
        },
    )
}

/// Add form when `existing` is `None`, edit form otherwise
pub fn form(
    ctx: &PageCtx,
    existing: Option<&asset::Model>,
    form: &AssetForm,
    errors: &FieldErrors,
) -> Markup {
    let (title, action) = match existing {
        Some(asset) => (format!("Edit {}", asset.name), format!("/assets/edit/{}", asset.id)),
        None => ("Add asset".to_string(), "/assets/add".to_string()),
    };
    let initial_statuses = [AssetStatus::Available, AssetStatus::OutOfService]
        .map(|s| (s.to_string(), s.to_string()));
    layout(
        ctx,
        &title,
        html! {
            form method="post" action=(action) {
                (input_field("name", "Name", "text", &form.name, errors))
                (input_field("serial_number", "Serial number", "text", &form.serial_number, errors))
                (select_field("asset_type", "Type", choices(ASSET_TYPES.iter().copied()), &form.asset_type, "Choose a type", errors))
                (select_field("location", "Location", choices(ASSET_LOCATIONS.iter().copied()), &form.location, "Choose a location", errors))
                @if existing.is_none() {
                    (select_field("status", "Initial status", initial_statuses, &form.status, "", errors))
                }
                (input_field("purchase_date", "Purchase date", "date", &form.purchase_date, errors))
                (input_field("purchase_cost", "Purchase cost", "text", &form.purchase_cost, errors))
                (input_field("condition", "Condition", "text", &form.condition, errors))
                (textarea_field("notes", "Notes", &form.notes, errors))
                @if existing.is_none() {
                    fieldset {
                        legend { (COMPOSITE_TYPE) " components (optional)" }
                        @for component_type in COMPONENT_TYPES {
                            (input_field(
                                &format!("{}_serial", component_type.to_lowercase()),
                                &format!("{} serial", component_type),
                                "text",
                                form.component_serial(component_type),
                                errors,
                            ))
                        }
                    }
                }
                button type="submit" { "Save" }
            }
        },
    )
}
