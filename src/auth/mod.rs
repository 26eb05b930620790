/*!
 * # Authentication and Authorization
 *
 * Browser sessions are HS256 JWTs held in an http-only cookie. Every gated
 * handler takes a [`CurrentUser`], which resolves the cookie to an active
 * user row or redirects to the login page. Role checks are explicit calls on
 * the extracted user:
 *
 * - guests may browse
 * - staff and admins may record checkouts, maintenance, transfers and stock
 * - admins alone delete records and manage users
 */

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use tracing::{debug, error};

use crate::entities::{user, UserRole};
use crate::errors::ServiceError;
use crate::AppState;

pub mod password;
pub mod tokens;

pub use password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
pub use tokens::TokenService;

pub const SESSION_COOKIE: &str = "inventory_session";
pub const LOGIN_PATH: &str = "/auth/login";
pub const HOME_PATH: &str = "/dashboard";

/// The signed-in user, loaded fresh from the database on every request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&user::Model> for CurrentUser {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username.clone(),
            email: model.email.clone(),
            role: model.role,
        }
    }
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn can_modify(&self) -> bool {
        self.role.can_modify()
    }

    pub fn require_staff(&self) -> Result<(), ServiceError> {
        if self.can_modify() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "You do not have permission to modify inventory records.".into(),
            ))
        }
    }

    pub fn require_admin(&self, action: &str) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "You do not have permission to {}.",
                action
            )))
        }
    }
}

/// Why a gated request could not be served
#[derive(Debug)]
pub enum AuthRejection {
    Login { next: Option<String> },
    Internal(ServiceError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Login { next } => Redirect::to(&login_url(next.as_deref())).into_response(),
            AuthRejection::Internal(err) => {
                error!(error = %err, "failed to resolve session");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

fn login_url(next: Option<&str>) -> String {
    match next.filter(|n| is_plain_path(n)) {
        Some(path) if path != "/" => format!("{}?next={}", LOGIN_PATH, path),
        _ => LOGIN_PATH.to_string(),
    }
}

fn is_plain_path(path: &str) -> bool {
    path.starts_with('/')
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
}

/// Local redirect target from a `next` parameter; anything else goes home
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains("://")
                && !path.contains('\\') =>
        {
            path.to_string()
        }
        _ => HOME_PATH.to_string(),
    }
}

pub fn start_session(cookies: &Cookies, token: String, secure: bool) {
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build();
    cookies.add(cookie);
}

pub fn end_session(cookies: &Cookies) {
    cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let next = Some(parts.uri.path().to_string());
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AuthRejection::Internal(ServiceError::InternalError(msg.into())))?;

        let token = cookies
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| AuthRejection::Login { next: next.clone() })?;

        let claims = match state.tokens.verify_session(&token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!("rejecting session cookie: {}", err);
                end_session(&cookies);
                return Err(AuthRejection::Login { next });
            }
        };

        let user_id = claims
            .user_id()
            .ok_or_else(|| AuthRejection::Login { next: next.clone() })?;

        let user = state
            .services
            .users
            .find_by_id(user_id)
            .await
            .map_err(AuthRejection::Internal)?;

        match user {
            Some(model) if model.is_active => {
                let current = CurrentUser::from(&model);
                parts.extensions.insert(current.clone());
                Ok(current)
            }
            _ => {
                end_session(&cookies);
                Err(AuthRejection::Login { next })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_next_only_allows_local_paths() {
        assert_eq!(safe_next(Some("/assets/3")), "/assets/3");
        assert_eq!(safe_next(Some("//evil.example")), HOME_PATH);
        assert_eq!(safe_next(Some("https://evil.example/")), HOME_PATH);
        assert_eq!(safe_next(Some("assets")), HOME_PATH);
        assert_eq!(safe_next(None), HOME_PATH);
    }

    #[test]
    fn login_url_keeps_plain_paths() {
        assert_eq!(login_url(Some("/assets/3")), "/auth/login?next=/assets/3");
        assert_eq!(login_url(Some("/")), "/auth/login");
        assert_eq!(login_url(Some("/a?b=<c>")), "/auth/login");
    }

    #[test]
    fn role_checks() {
        let mut user = CurrentUser {
            id: 1,
            username: "guest".into(),
            email: "g@lab.test".into(),
            role: UserRole::Guest,
        };
        assert!(user.require_staff().is_err());
        user.role = UserRole::Staff;
        assert!(user.require_staff().is_ok());
        assert!(user.require_admin("delete assets").is_err());
        user.role = UserRole::Admin;
        assert!(user.require_admin("delete assets").is_ok());
    }
}
