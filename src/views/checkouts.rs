use chrono::Utc;
use maud::{html, Markup};

use super::{fmt_datetime, fmt_opt_datetime, input_field, layout, pagination, select_field, textarea_field};
use crate::entities::{asset, user};
use crate::handlers::checkouts::{CheckInForm, CheckoutForm};
use crate::handlers::common::{FieldErrors, PageCtx};
use crate::services::checkouts::CheckoutRow;
use crate::services::Page;

pub fn active(ctx: &PageCtx, rows: &[CheckoutRow]) -> Markup {
    let now = Utc::now();
    layout(
        ctx,
        "Active checkouts",
        html! {
            p { a href="/checkout/history" { "Returned checkouts" } }
            @if rows.is_empty() {
                p class="muted" { "Nothing is checked out." }
            } @else {
                table {
                    thead { tr { th { "Asset" } th { "User" } th { "Out since" } th { "Due" } th {} } }
                    tbody {
                        @for row in rows {
                            tr {
                                td { a href={ "/assets/" (row.checkout.asset_id) } { (row.asset_name) } }
                                td { (row.username) }
                                td { (fmt_datetime(&row.checkout.checkout_date)) }
                                td {
                                    (fmt_opt_datetime(row.checkout.expected_return.as_ref(), ""))
                                    @if row.checkout.is_overdue(now) { " " strong { "overdue" } }
                                }
                                td {
                                    @if ctx.user.can_modify() {
                                        a href={ "/checkout/checkin/" (row.checkout.id) } { "Check in" }
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

pub fn history(ctx: &PageCtx, page: &Page<CheckoutRow>) -> Markup {
    layout(
        ctx,
        "Checkout history",
        html! {
            p { a href="/checkout/active" { "Active checkouts" } }
            @if page.items.is_empty() {
                p class="muted" { "No returned checkouts yet." }
            } @else {
                table {
                    thead { tr { th { "Asset" } th { "User" } th { "Out" } th { "Returned" } th { "Condition" } th { "Notes" } } }
                    tbody {
                        @for row in &page.items {
                            tr {
                                td { a href={ "/assets/" (row.checkout.asset_id) } { (row.asset_name) } }
                                td { (row.username) }
                                td { (fmt_datetime(&row.checkout.checkout_date)) }
                                td { (fmt_opt_datetime(row.checkout.actual_return.as_ref(), "Not returned")) }
                                td { (row.checkout.condition_out) " / " (row.checkout.condition_in.as_deref().unwrap_or_default()) }
                                td { (row.checkout.notes.as_deref().unwrap_or_default()) }
                            }
                        }
                    }
                }
            }
            (pagination("/checkout/history", page, ""))
        },
    )
}

pub fn checkout_form(
    ctx: &PageCtx,
    asset: &asset::Model,
    users: &[user::Model],
    form: &CheckoutForm,
    errors: &FieldErrors,
) -> Markup {
    let options = users
        .iter()
        .map(|u| (u.id.to_string(), format!("{} ({})", u.username, u.email)));
    layout(
        ctx,
        &format!("Check out {}", asset.name),
        html! {
            form method="post" action={ "/checkout/checkout/" (asset.id) } {
                (select_field("user_id", "Borrower", options, &form.user_id, "Choose a user", errors))
                (input_field("expected_return", "Expected return (defaults to one week)", "datetime-local", &form.expected_return, errors))
                (input_field("condition", "Condition", "text", &form.condition, errors))
                (textarea_field("notes", "Notes", &form.notes, errors))
                button type="submit" { "Check out" }
            }
        },
    )
}

pub fn checkin_form(
    ctx: &PageCtx,
    row: &CheckoutRow,
    form: &CheckInForm,
    errors: &FieldErrors,
) -> Markup {
    layout(
        ctx,
        &format!("Check in {}", row.asset_name),
        html! {
            p {
                "Checked out to " strong { (row.username) } " on "
                (fmt_datetime(&row.checkout.checkout_date))
                " in " (row.checkout.condition_out) " condition."
            }
            form method="post" action={ "/checkout/checkin/" (row.checkout.id) } {
                (input_field("condition", "Condition on return", "text", &form.condition, errors))
                (textarea_field("notes", "Notes", &form.notes, errors))
                button type="submit" { "Check in" }
            }
        },
    )
}
