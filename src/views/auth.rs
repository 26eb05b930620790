use maud::{html, Markup};

use super::{input_field, public_layout, select_field};
use crate::entities::UserRole;
use crate::handlers::auth::{LoginForm, RegisterForm, ResetRequestForm};
use crate::handlers::common::{FieldErrors, Flash};

pub fn login(flashes: &[Flash], form: &LoginForm, errors: &FieldErrors) -> Markup {
    public_layout(
        "Log in",
        flashes,
        html! {
            form method="post" action="/auth/login" {
                @if let Some(next) = &form.next {
                    input type="hidden" name="next" value=(next);
                }
                (input_field("username", "Username", "text", &form.username, errors))
                (input_field("password", "Password", "password", "", errors))
                button type="submit" { "Log in" }
            }
            p { a href="/auth/reset_password_request" { "Forgot your password?" } }
        },
    )
}

pub fn register(
    flashes: &[Flash],
    form: &RegisterForm,
    errors: &FieldErrors,
    is_admin: bool,
) -> Markup {
    let roles = [UserRole::Staff, UserRole::Guest, UserRole::Admin]
        .map(|role| (role.to_string(), role.to_string()));
    let selected_role = if form.role.is_empty() { "staff" } else { form.role.as_str() };
    public_layout(
        "Register",
        flashes,
        html! {
            form method="post" action="/auth/register" {
                (input_field("username", "Username", "text", &form.username, errors))
                (input_field("email", "Email", "email", &form.email, errors))
                (input_field("password", "Password", "password", "", errors))
                (input_field("confirm_password", "Confirm password", "password", "", errors))
                @if is_admin {
                    (select_field("role", "Role", roles, selected_role, "", errors))
                } @else {
                    (input_field("registration_code", "Registration code", "password", "", errors))
                }
                button type="submit" { "Register" }
            }
        },
    )
}

pub fn reset_request(flashes: &[Flash], form: &ResetRequestForm, errors: &FieldErrors) -> Markup {
    public_layout(
        "Reset password",
        flashes,
        html! {
            p { "Enter the email address of your account and we will send you a reset link." }
            form method="post" action="/auth/reset_password_request" {
                (input_field("email", "Email", "email", &form.email, errors))
                button type="submit" { "Send reset link" }
            }
        },
    )
}

pub fn reset_password(
    flashes: &[Flash],
    token: &str,
    errors: &FieldErrors,
) -> Markup {
    let action = format!("/auth/reset_password/{}", token);
    public_layout(
        "Choose a new password",
        flashes,
        html! {
            form method="post" action=(action) {
                (input_field("password", "New password", "password", "", errors))
                (input_field("confirm_password", "Confirm password", "password", "", errors))
                button type="submit" { "Reset password" }
            }
        },
    )
}
