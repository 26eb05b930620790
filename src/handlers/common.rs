use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tower_cookies::{Cookie, Cookies};
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::auth::{AuthRejection, CurrentUser, HOME_PATH};
use crate::errors::ServiceError;
use crate::views;
use crate::AppState;

pub const FLASH_COOKIE: &str = "inventory_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Info,
    Warning,
    Danger,
}

impl FlashKind {
    pub fn css_class(self) -> &'static str {
        match self {
            FlashKind::Success => "flash-success",
            FlashKind::Info => "flash-info",
            FlashKind::Warning => "flash-warning",
            FlashKind::Danger => "flash-danger",
        }
    }
}

/// One-shot message shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

fn encode_flash(flash: &Flash) -> Option<String> {
    serde_json::to_vec(&[flash])
        .ok()
        .map(|json| URL_SAFE_NO_PAD.encode(json))
}

fn decode_flashes(value: &str) -> Vec<Flash> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Redirect carrying a flash message; [`persist_flash`] stores it in the cookie jar
pub fn flash_redirect(to: &str, kind: FlashKind, message: impl Into<String>) -> Response {
    let flash = Flash {
        kind,
        message: message.into(),
    };
    let mut response = Redirect::to(to).into_response();
    response.extensions_mut().insert(flash);
    response
}

/// Moves a flash attached to the response into the cookie jar.
/// Runs inside the cookie manager so it overrides a flash consumed by the same request.
pub async fn persist_flash(request: Request, next: Next) -> Response {
    let cookies = request.extensions().get::<Cookies>().cloned();
    let response = next.run(request).await;
    if let (Some(cookies), Some(flash)) = (cookies, response.extensions().get::<Flash>()) {
        if let Some(value) = encode_flash(flash) {
            cookies.add(
                Cookie::build((FLASH_COOKIE, value))
                    .path("/")
                    .http_only(true)
                    .build(),
            );
        }
    }
    response
}

/// Reads and clears pending flash messages
pub fn take_flashes(cookies: &Cookies) -> Vec<Flash> {
    match cookies.get(FLASH_COOKIE) {
        Some(cookie) => {
            let flashes = decode_flashes(cookie.value());
            cookies.remove(Cookie::build((FLASH_COOKIE, "")).path("/").build());
            flashes
        }
        None => Vec::new(),
    }
}

/// Everything the layout needs: the signed-in user and pending flashes
#[derive(Debug, Clone)]
pub struct PageCtx {
    pub user: CurrentUser,
    pub flashes: Vec<Flash>,
}

impl PageCtx {
    pub fn require_staff(&self) -> Result<(), PageError> {
        self.user.require_staff().map_err(PageError::from)
    }

    pub fn require_admin(&self, action: &str) -> Result<(), PageError> {
        self.user.require_admin(action).map_err(PageError::from)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for PageCtx {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AuthRejection::Internal(ServiceError::InternalError(msg.into())))?;
        Ok(PageCtx {
            user,
            flashes: take_flashes(&cookies),
        })
    }
}

/// How a page handler gives up
#[derive(Debug)]
pub enum PageError {
    NotFound(String),
    /// Business rule or permission refusal: flash and go elsewhere
    Redirect { to: String, message: String },
    Internal(ServiceError),
}

impl PageError {
    pub fn redirect(to: impl Into<String>, message: impl Into<String>) -> Self {
        PageError::Redirect {
            to: to.into(),
            message: message.into(),
        }
    }
}

impl From<ServiceError> for PageError {
    fn from(err: ServiceError) -> Self {
        classify(err, HOME_PATH)
    }
}

fn classify(err: ServiceError, to: &str) -> PageError {
    match err {
        ServiceError::NotFound(msg) => PageError::NotFound(msg),
        err if err.is_user_facing() => PageError::Redirect {
            to: to.to_string(),
            message: err.response_message(),
        },
        err => PageError::Internal(err),
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            PageError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, views::error_page(StatusCode::NOT_FOUND, &msg)).into_response()
            }
            PageError::Redirect { to, message } => {
                warn!(%to, %message, "request refused");
                flash_redirect(&to, FlashKind::Danger, message)
            }
            PageError::Internal(err) => {
                error!(error = %err, "page request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    views::error_page(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Something went wrong. Please try again.",
                    ),
                )
                    .into_response()
            }
        }
    }
}

pub trait ResultExt<T> {
    /// Business-rule failures flash and redirect to `to`
    fn or_redirect(self, to: &str) -> Result<T, PageError>;
}

impl<T> ResultExt<T> for Result<T, ServiceError> {
    fn or_redirect(self, to: &str) -> Result<T, PageError> {
        self.map_err(|err| classify(err, to))
    }
}

/// File download with an attachment disposition
pub fn download(bytes: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Inline form errors keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_validation(errors: &ValidationErrors) -> Self {
        let mut out = Self::new();
        for (field, errs) in errors.field_errors() {
            if let Some(first) = errs.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}.", field.replace('_', " ")));
                out.insert(field.to_string(), message);
            }
        }
        out
    }

    /// A field error from a service call, or the error itself when it is not one
    pub fn from_service(err: ServiceError) -> Result<Self, ServiceError> {
        match err {
            ServiceError::FieldInvalid { field, message } => {
                let mut out = Self::new();
                out.insert(field, message);
                Ok(out)
            }
            other => Err(other),
        }
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Empty form inputs arrive as `""`; treat them as absent
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn parse_opt_i32(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
    message: &str,
) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<i32>() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.insert(field, message);
            None
        }
    }
}

pub fn parse_opt_f64(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
    message: &str,
) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Some(n),
        _ => {
            errors.insert(field, message);
            None
        }
    }
}

/// `YYYY-MM-DD` as sent by date inputs
pub fn parse_opt_date(errors: &mut FieldErrors, field: &str, value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.insert(field, "Enter a date as YYYY-MM-DD.");
            None
        }
    }
}

/// `datetime-local` inputs, or a bare date meaning end of that day
pub fn parse_opt_datetime(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let parsed = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(23, 59, 0))
        });
    match parsed {
        Some(naive) => Some(naive.and_utc()),
        None => {
            errors.insert(field, "Enter a date and time.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn flash_cookie_round_trips() {
        let flash = Flash {
            kind: FlashKind::Success,
            message: "Asset added successfully!".into(),
        };
        let encoded = encode_flash(&flash).unwrap();
        assert_eq!(decode_flashes(&encoded), vec![flash]);
        assert!(decode_flashes("not base64 !!").is_empty());
    }

    #[test]
    fn flash_redirect_attaches_flash() {
        let response = flash_redirect("/assets", FlashKind::Danger, "nope");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/assets");
        let flash = response.extensions().get::<Flash>().unwrap();
        assert_eq!(flash.kind, FlashKind::Danger);
        assert_eq!(flash.message, "nope");
    }

    #[test]
    fn service_errors_classify() {
        assert_matches!(
            PageError::from(ServiceError::not_found("Asset", 3)),
            PageError::NotFound(_)
        );
        assert_matches!(
            Err::<(), _>(ServiceError::InvalidOperation("busy".into())).or_redirect("/assets/3"),
            Err(PageError::Redirect { to, message }) if to == "/assets/3" && message == "busy"
        );
        assert_matches!(
            PageError::from(ServiceError::InternalError("boom".into())),
            PageError::Internal(_)
        );
    }

    #[test]
    fn download_names_attachment() {
        let response = download(b"a,b\n".to_vec(), "text/csv", "dashboard_report.csv");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=dashboard_report.csv"
        );
    }

    #[test]
    fn field_errors_keep_first_message() {
        let mut errors = FieldErrors::new();
        errors.insert("name", "Name is required.");
        errors.insert("name", "second");
        assert_eq!(errors.get("name"), Some("Name is required."));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn numeric_parsers_record_errors() {
        let mut errors = FieldErrors::new();
        assert_eq!(parse_opt_i32(&mut errors, "quantity", " 12 ", "bad"), Some(12));
        assert_eq!(parse_opt_i32(&mut errors, "quantity", "", "bad"), None);
        assert!(errors.is_empty());
        assert_eq!(parse_opt_f64(&mut errors, "cost", "-3", "Enter a cost."), None);
        assert_eq!(errors.get("cost"), Some("Enter a cost."));
    }

    #[test]
    fn dates_parse_from_inputs() {
        let mut errors = FieldErrors::new();
        let due = parse_opt_datetime(&mut errors, "expected_return", "2024-05-01T14:30").unwrap();
        assert_eq!(due.to_rfc3339(), "2024-05-01T14:30:00+00:00");
        assert!(parse_opt_date(&mut errors, "purchase_date", "01/05/2024").is_none());
        assert!(errors.get("purchase_date").is_some());
    }
}
