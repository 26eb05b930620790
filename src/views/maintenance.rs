use maud::{html, Markup};

use super::{
    fmt_cost, fmt_datetime, fmt_opt_datetime, input_field, layout, post_button, select_field,
    textarea_field,
};
use crate::entities::{asset, maintenance, MaintenanceStatus};
use crate::handlers::common::{FieldErrors, PageCtx};
use crate::handlers::maintenance::MaintenanceForm;
use crate::services::maintenance::MaintenanceRow;

pub fn list(ctx: &PageCtx, status: MaintenanceStatus, rows: &[MaintenanceRow]) -> Markup {
    layout(
        ctx,
        "Maintenance",
        html! {
            p {
                @for (i, option) in MaintenanceStatus::ALL.iter().enumerate() {
                    @if i > 0 { " | " }
                    @if *option == status {
                        strong { (option) }
                    } @else {
                        a href={ "/maintenance?status=" (option.to_string().replace(' ', "+")) } { (option) }
                    }
                }
            }
            @if rows.is_empty() {
                p class="muted" { "No " (status) " maintenance records." }
            } @else {
                table {
                    thead { tr { th { "Asset" } th { "Started" } th { "Ended" } th { "Description" } th { "Technician" } th { "Cost" } th {} } }
                    tbody {
                        @for row in rows {
                            tr {
                                td { a href={ "/assets/" (row.record.asset_id) } { (row.asset_name) } }
                                td { (fmt_datetime(&row.record.start_date)) }
                                td { (fmt_opt_datetime(row.record.end_date.as_ref(), "Ongoing")) }
                                td { (row.record.description) }
                                td { (row.record.technician) }
                                td { (fmt_cost(row.record.cost)) }
                                td {
                                    @if row.record.status.is_open() && ctx.user.can_modify() {
                                        a href={ "/maintenance/update/" (row.record.id) } { "Update" } " "
                                        (post_button(&format!("/maintenance/complete/{}", row.record.id), "Complete", None))
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

/// Opening form when `record` is `None`, update form otherwise
pub fn form(
    ctx: &PageCtx,
    asset: &asset::Model,
    record: Option<&maintenance::Model>,
    form: &MaintenanceForm,
    errors: &FieldErrors,
) -> Markup {
    let (title, action, statuses): (String, String, Vec<MaintenanceStatus>) = match record {
        Some(record) => (
            format!("Update maintenance for {}", asset.name),
            format!("/maintenance/update/{}", record.id),
            MaintenanceStatus::ALL.to_vec(),
        ),
        None => (
            format!("Schedule maintenance for {}", asset.name),
            format!("/maintenance/add/{}", asset.id),
            vec![MaintenanceStatus::Pending, MaintenanceStatus::InProgress],
        ),
    };
    let options = statuses
        .into_iter()
        .map(|s| (s.to_string(), s.to_string()));
    layout(
        ctx,
        &title,
        html! {
            form method="post" action=(action) {
                (textarea_field("description", "Description", &form.description, errors))
                (input_field("technician", "Technician", "text", &form.technician, errors))
                (input_field("cost", "Cost", "text", &form.cost, errors))
                (select_field("status", "Status", options, &form.status, "", errors))
                button type="submit" { "Save" }
            }
        },
    )
}
