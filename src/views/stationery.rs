use maud::{html, Markup};

use super::{choices, input_field, layout, post_button, select_field};
use crate::catalog::{STATIONERY_ITEM_TYPES, STATIONERY_UNITS};
use crate::entities::stationery;
use crate::handlers::common::{FieldErrors, PageCtx};
use crate::handlers::stationery::{AdjustForm, StationeryForm, StationeryQuery};

pub fn list(
    ctx: &PageCtx,
    items: &[stationery::Model],
    locations: &[String],
    query: &StationeryQuery,
) -> Markup {
    let no_errors = FieldErrors::new();
    let low = items.iter().filter(|item| item.is_low_stock()).count();
    layout(
        ctx,
        "Stationery",
        html! {
            @if ctx.user.can_modify() {
                p { a href="/stationery/add" { "Add stationery" } }
            }
            form method="get" action="/stationery" {
                (select_field(
                    "item_type",
                    "Item type",
                    choices(STATIONERY_ITEM_TYPES.iter().copied()),
                    query.item_type.as_deref().unwrap_or_default(),
                    "All types",
                    &no_errors,
                ))
                (select_field(
                    "location",
                    "Location",
                    choices(locations.iter().map(String::as_str)),
                    query.location.as_deref().unwrap_or_default(),
                    "All locations",
                    &no_errors,
                ))
                button type="submit" { "Filter" }
            }
            @if low > 0 {
                p class="flash flash-warning" { (low) " item(s) below reorder threshold." }
            }
            @if items.is_empty() {
                p class="muted" { "No stationery found." }
            } @else {
                table {
                    thead { tr { th { "Item" } th { "Quantity" } th { "Threshold" } th { "Location" } th { "Updated" } th {} } }
                    tbody {
                        @for item in items {
                            tr {
                                td {
                                    (item.item_type)
                                    @if item.is_low_stock() { " " span class="badge badge-out-of-service" { "Low" } }
                                }
                                td { (item.quantity) " " (item.unit) }
                                td { (item.threshold) }
                                td { (item.location) }
                                td { (super::fmt_datetime(&item.last_updated)) }
                                td {
                                    @if ctx.user.can_modify() {
                                        a href={ "/stationery/update/" (item.id) } { "Adjust" } " "
                                    }
                                    @if ctx.user.is_admin() {
                                        (post_button(
                                            &format!("/stationery/delete/{}", item.id),
                                            "Delete",
                                            Some("Delete this stationery item?"),
                                        ))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn add_form(ctx: &PageCtx, form: &StationeryForm, errors: &FieldErrors) -> Markup {
    layout(
        ctx,
        "Add stationery",
        html! {
            form method="post" action="/stationery/add" {
                (select_field("item_type", "Item type", choices(STATIONERY_ITEM_TYPES.iter().copied()), &form.item_type, "Choose a type", errors))
                (input_field("quantity", "Quantity", "number", &form.quantity, errors))
                (select_field("unit", "Unit", choices(STATIONERY_UNITS.iter().copied()), &form.unit, "Choose a unit", errors))
                (input_field("threshold", "Reorder threshold (blank for the default)", "number", &form.threshold, errors))
                (input_field("location", "Location (blank for Main Office)", "text", &form.location, errors))
                button type="submit" { "Add" }
            }
        },
    )
}

pub fn adjust_form(
    ctx: &PageCtx,
    item: &stationery::Model,
    form: &AdjustForm,
    errors: &FieldErrors,
) -> Markup {
    let actions = vec![
        ("add".to_string(), "Add stock".to_string()),
        ("subtract".to_string(), "Remove stock".to_string()),
    ];
    layout(
        ctx,
        &format!("Adjust {}", item.item_type),
        html! {
            p { "Currently " strong { (item.quantity) " " (item.unit) } " at " (item.location) "." }
            form method="post" action={ "/stationery/update/" (item.id) } {
                (select_field("action", "Action", actions, &form.action, "", errors))
                (input_field("amount", "Amount", "number", &form.amount, errors))
                (input_field("threshold", "Reorder threshold", "number", &form.threshold, errors))
                (input_field("location", "Location", "text", &form.location, errors))
                button type="submit" { "Update stock" }
            }
        },
    )
}
