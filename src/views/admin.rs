use maud::{html, Markup};

use super::{fmt_opt_datetime, input_field, layout, post_button, select_field};
use crate::entities::{user, UserRole};
use crate::handlers::admin::UserForm;
use crate::handlers::common::{FieldErrors, PageCtx};

pub fn users(ctx: &PageCtx, users: &[user::Model], recipients: &[String]) -> Markup {
    layout(
        ctx,
        "Users",
        html! {
            p { a href="/admin/users/add" { "Add user" } }
            table {
                thead { tr { th { "Username" } th { "Email" } th { "Role" } th { "Status" } th { "Last seen" } th {} } }
                tbody {
                    @for user in users {
                        tr {
                            td { (user.username) }
                            td { (user.email) }
                            td { (user.role) }
                            td {
                                @if user.is_active { "Active" } @else { span class="muted" { "Inactive" } }
                            }
                            td { (fmt_opt_datetime(user.last_seen.as_ref(), "Never")) }
                            td {
                                a href={ "/admin/users/edit/" (user.id) } { "Edit" } " "
                                @if user.id != ctx.user.id {
                                    @if user.is_active {
                                        (post_button(&format!("/admin/users/deactivate/{}", user.id), "Deactivate", None))
                                    } @else {
                                        (post_button(&format!("/admin/users/reactivate/{}", user.id), "Reactivate", None))
                                    }
                                    " "
                                    (post_button(
                                        &format!("/admin/users/delete/{}", user.id),
                                        "Delete",
                                        Some("Delete this user and their checkout history?"),
                                    ))
                                }
                            }
                        }
                    }
                }
            }
            h2 { "Dashboard report" }
            @if recipients.is_empty() {
                p class="muted" { "No admin email addresses are configured." }
            } @else {
                p { "Recipients: " (recipients.join(", ")) }
                (post_button("/admin/send-dashboard-email", "Send dashboard report", None))
            }
        },
    )
}

pub fn user_form(
    ctx: &PageCtx,
    existing: Option<&user::Model>,
    form: &UserForm,
    errors: &FieldErrors,
) -> Markup {
    let (title, action, password_label) = match existing {
        Some(user) => (
            format!("Edit {}", user.username),
            format!("/admin/users/edit/{}", user.id),
            "New password (leave blank to keep)",
        ),
        None => ("Add user".to_string(), "/admin/users/add".to_string(), "Password"),
    };
    let roles = [UserRole::Admin, UserRole::Staff, UserRole::Guest]
        .map(|role| (role.to_string(), role.to_string()));
    layout(
        ctx,
        &title,
        html! {
            form method="post" action=(action) {
                (input_field("username", "Username", "text", &form.username, errors))
                (input_field("email", "Email", "email", &form.email, errors))
                (select_field("role", "Role", roles, &form.role, "", errors))
                (input_field("password", password_label, "password", "", errors))
                (input_field("confirm_password", "Confirm password", "password", "", errors))
                button type="submit" { "Save" }
            }
        },
    )
}
