//! Server-rendered pages.
//!
//! Every page goes through [`layout`], which draws the navigation for the
//! signed-in user's role and any pending flash messages. Form helpers take a
//! [`FieldErrors`] so a rejected submission re-renders with inline messages.

use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::entities::{AssetStatus, MaintenanceStatus};
use crate::handlers::common::{FieldErrors, Flash, PageCtx};
use crate::services::Page;

pub mod admin;
pub mod assets;
pub mod auth;
pub mod checkouts;
pub mod dashboard;
pub mod maintenance;
pub mod reports;
pub mod stationery;
pub mod transfers;

const APP_NAME: &str = "Inventory Desk";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #1f2933; background: #f5f7fa; }
nav { background: #243b53; padding: .6rem 1.2rem; display: flex; gap: 1rem; align-items: center; }
nav a { color: #f0f4f8; text-decoration: none; }
nav .spacer { flex: 1; }
main { max-width: 1100px; margin: 1.5rem auto; padding: 0 1rem; }
table { width: 100%; border-collapse: collapse; background: #fff; margin-bottom: 1.5rem; }
th, td { padding: .45rem .6rem; border-bottom: 1px solid #d9e2ec; text-align: left; }
.flash { padding: .6rem 1rem; margin-bottom: .8rem; border-radius: 4px; }
.flash-success { background: #e3f9e5; } .flash-info { background: #e6f6ff; }
.flash-warning { background: #fffbea; } .flash-danger { background: #ffe3e3; }
.field { margin-bottom: .8rem; } .field label { display: block; font-weight: 600; }
.field-error { color: #cf1124; font-size: .9rem; }
.badge { padding: .1rem .5rem; border-radius: 10px; font-size: .85rem; background: #d9e2ec; }
.badge-available { background: #c6f7e2; } .badge-in-use { background: #bae3ff; }
.badge-maintenance { background: #fff3c4; } .badge-out-of-service { background: #ffd0d0; }
.inline { display: inline; } .muted { color: #829ab1; }
.cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: .8rem; margin-bottom: 1.5rem; }
.card { background: #fff; padding: .8rem; border-radius: 4px; }
.card strong { display: block; font-size: 1.6rem; }
"#;

fn document(title: &str, nav: Markup, flashes: &[Flash], body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | " (APP_NAME) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                (nav)
                main {
                    @for flash in flashes {
                        div class={ "flash " (flash.kind.css_class()) } { (flash.message) }
                    }
                    h1 { (title) }
                    (body)
                }
            }
        }
    }
}

/// Page chrome for signed-in users
pub fn layout(ctx: &PageCtx, title: &str, body: Markup) -> Markup {
    let user = &ctx.user;
    let nav = html! {
        nav {
            a href="/dashboard" { strong { (APP_NAME) } }
            a href="/assets" { "Assets" }
            a href="/checkout/active" { "Checkouts" }
            a href="/maintenance" { "Maintenance" }
            a href="/stationery" { "Stationery" }
            a href="/transfers" { "Transfers" }
            a href="/reports" { "Reports" }
            @if user.is_admin() {
                a href="/admin/users" { "Users" }
            }
            span class="spacer" {}
            span class="muted" { (user.username) " (" (user.role) ")" }
            a href="/auth/logout" { "Log out" }
        }
    };
    document(title, nav, &ctx.flashes, body)
}

/// Chrome for the login and password pages
pub fn public_layout(title: &str, flashes: &[Flash], body: Markup) -> Markup {
    let nav = html! {
        nav { a href="/auth/login" { strong { (APP_NAME) } } }
    };
    document(title, nav, flashes, body)
}

pub fn error_page(status: StatusCode, message: &str) -> Markup {
    let title = status.canonical_reason().unwrap_or("Error");
    public_layout(
        title,
        &[],
        html! {
            p { (message) }
            p { a href="/dashboard" { "Back to the dashboard" } }
        },
    )
}

pub fn field_error(errors: &FieldErrors, name: &str) -> Markup {
    html! {
        @if let Some(message) = errors.get(name) {
            div class="field-error" { (message) }
        }
    }
}

pub fn input_field(
    name: &str,
    label: &str,
    kind: &str,
    value: &str,
    errors: &FieldErrors,
) -> Markup {
    html! {
        div class="field" {
            label for=(name) { (label) }
            input type=(kind) id=(name) name=(name) value=(value);
            (field_error(errors, name))
        }
    }
}

pub fn textarea_field(name: &str, label: &str, value: &str, errors: &FieldErrors) -> Markup {
    html! {
        div class="field" {
            label for=(name) { (label) }
            textarea id=(name) name=(name) rows="3" { (value) }
            (field_error(errors, name))
        }
    }
}

/// `options` are `(value, label)` pairs; an empty `placeholder` omits the blank option
pub fn select_field(
    name: &str,
    label: &str,
    options: impl IntoIterator<Item = (String, String)>,
    selected: &str,
    placeholder: &str,
    errors: &FieldErrors,
) -> Markup {
    html! {
        div class="field" {
            label for=(name) { (label) }
            select id=(name) name=(name) {
                @if !placeholder.is_empty() {
                    option value="" { (placeholder) }
                }
                @for (value, text) in options {
                    option value=(value) selected[value == selected] { (text) }
                }
            }
            (field_error(errors, name))
        }
    }
}

/// Choices where the stored value is also the label
pub fn choices<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<(String, String)> {
    values
        .into_iter()
        .map(|v| (v.to_string(), v.to_string()))
        .collect()
}

/// A one-button POST form
pub fn post_button(action: &str, label: &str, confirm: Option<&str>) -> Markup {
    let onsubmit = confirm.map(|msg| format!("return confirm('{}');", msg.replace('\'', "\\'")));
    html! {
        form class="inline" method="post" action=(action) onsubmit=[onsubmit] {
            button type="submit" { (label) }
        }
    }
}

pub fn status_badge(status: AssetStatus) -> Markup {
    let class = format!(
        "badge badge-{}",
        status.to_string().to_lowercase().replace(' ', "-")
    );
    html! { span class=(class) { (status) } }
}

pub fn maintenance_badge(status: MaintenanceStatus) -> Markup {
    html! { span class="badge" { (status) } }
}

pub fn fmt_datetime(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

pub fn fmt_opt_datetime(value: Option<&DateTime<Utc>>, missing: &str) -> String {
    value.map(fmt_datetime).unwrap_or_else(|| missing.to_string())
}

pub fn fmt_date(value: Option<&NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

pub fn fmt_cost(value: Option<f64>) -> String {
    value.map(|c| format!("{:.2}", c)).unwrap_or_default()
}

/// Previous/next links; `query` is appended to each link and may be empty
pub fn pagination<T>(base: &str, page: &Page<T>, query: &str) -> Markup {
    let link = |n: u64| {
        if query.is_empty() {
            format!("{}?page={}", base, n)
        } else {
            format!("{}?page={}&{}", base, n, query)
        }
    };
    html! {
        @if page.total_pages() > 1 {
            p {
                @if page.has_prev() {
                    a href=(link(page.page - 1)) { "Previous" } " "
                }
                "Page " (page.page) " of " (page.total_pages())
                @if page.has_next() {
                    " " a href=(link(page.page + 1)) { "Next" }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_class_follows_status() {
        let markup = status_badge(AssetStatus::OutOfService).into_string();
        assert!(markup.contains("badge-out-of-service"));
        assert!(markup.contains("Out of Service"));
    }

    #[test]
    fn field_errors_render_inline() {
        let mut errors = FieldErrors::new();
        errors.insert("name", "Name is required.");
        let markup = input_field("name", "Name", "text", "", &errors).into_string();
        assert!(markup.contains("Name is required."));
    }

    #[test]
    fn pagination_keeps_filters() {
        let page = Page::<u8> {
            items: vec![],
            page: 2,
            per_page: 10,
            total: 35,
        };
        let markup = pagination("/assets", &page, "status=Available").into_string();
        assert!(markup.contains("/assets?page=1&amp;status=Available"));
        assert!(markup.contains("/assets?page=3&amp;status=Available"));
        assert!(markup.contains("Page 2 of 4"));
    }

    #[test]
    fn single_page_has_no_links() {
        let page = Page::<u8> {
            items: vec![],
            page: 1,
            per_page: 10,
            total: 3,
        };
        assert!(pagination("/transfers", &page, "").into_string().is_empty());
    }
}
