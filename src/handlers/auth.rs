use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};
use maud::Markup;
use serde::Deserialize;
use std::str::FromStr;
use tower_cookies::Cookies;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    auth::{end_session, safe_next, start_session, CurrentUser, LOGIN_PATH},
    entities::UserRole,
    errors::ServiceError,
    handlers::common::{flash_redirect, take_flashes, FieldErrors, FlashKind, PageError},
    services::users::NewUser,
    views, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Username is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters."))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub registration_code: String,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct ResetRequestForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct ResetPasswordForm {
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", get(logout))
        .route("/auth/register", get(register_page).post(register))
        .route(
            "/auth/reset_password_request",
            get(reset_request_page).post(reset_request),
        )
        .route(
            "/auth/reset_password/:token",
            get(reset_password_page).post(reset_password),
        )
}

async fn login_page(cookies: Cookies, Query(query): Query<NextQuery>) -> Markup {
    let form = LoginForm {
        next: query.next,
        ..Default::default()
    };
    views::auth::login(&take_flashes(&cookies), &form, &FieldErrors::new())
}

async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    if let Err(errors) = form.validate() {
        let errors = FieldErrors::from_validation(&errors);
        return Ok(views::auth::login(&take_flashes(&cookies), &form, &errors).into_response());
    }

    match state
        .services
        .users
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => {
            let token = state.tokens.issue_session(&user)?;
            start_session(&cookies, token, !state.config.is_development());
            info!(user_id = user.id, "user logged in");
            Ok(flash_redirect(
                &safe_next(form.next.as_deref()),
                FlashKind::Success,
                "Logged in successfully.",
            ))
        }
        Err(err @ (ServiceError::Unauthorized(_) | ServiceError::Forbidden(_))) => {
            let target = match form.next.as_deref() {
                Some(next) => format!("{}?next={}", LOGIN_PATH, safe_next(Some(next))),
                None => LOGIN_PATH.to_string(),
            };
            Ok(flash_redirect(&target, FlashKind::Danger, err.response_message()))
        }
        Err(err) => Err(err.into()),
    }
}

async fn logout(cookies: Cookies) -> Response {
    end_session(&cookies);
    flash_redirect(LOGIN_PATH, FlashKind::Info, "You have been logged out.")
}

/// Admins may always register users; others need the configured code
fn registration_allowed(state: &AppState, user: Option<&CurrentUser>) -> bool {
    user.map(CurrentUser::is_admin).unwrap_or(false) || state.config.registration_code.is_some()
}

async fn register_page(
    State(state): State<AppState>,
    cookies: Cookies,
    user: Option<CurrentUser>,
) -> Response {
    if !registration_allowed(&state, user.as_ref()) {
        return flash_redirect(
            LOGIN_PATH,
            FlashKind::Warning,
            "Registration is closed. Ask an administrator for an account.",
        );
    }
    let is_admin = user.as_ref().map(CurrentUser::is_admin).unwrap_or(false);
    views::auth::register(
        &take_flashes(&cookies),
        &RegisterForm::default(),
        &FieldErrors::new(),
        is_admin,
    )
    .into_response()
}

async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    user: Option<CurrentUser>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    if !registration_allowed(&state, user.as_ref()) {
        return Ok(flash_redirect(
            LOGIN_PATH,
            FlashKind::Warning,
            "Registration is closed. Ask an administrator for an account.",
        ));
    }
    let is_admin = user.as_ref().map(CurrentUser::is_admin).unwrap_or(false);

    let mut errors = match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(errors) => FieldErrors::from_validation(&errors),
    };
    if form.password != form.confirm_password {
        errors.insert("confirm_password", "Passwords must match.");
    }
    let role = if is_admin {
        match UserRole::from_str(form.role.trim()) {
            Ok(role) => role,
            Err(_) => {
                errors.insert("role", "Choose a role.");
                UserRole::Staff
            }
        }
    } else {
        let code = state.config.registration_code.as_deref().unwrap_or_default();
        if form.registration_code.trim() != code {
            warn!("registration attempted with a wrong code");
            errors.insert("registration_code", "Invalid registration code.");
        }
        UserRole::Staff
    };

    if errors.is_empty() {
        let created = state
            .services
            .users
            .create(NewUser {
                username: form.username.clone(),
                email: form.email.clone(),
                password: form.password.clone(),
                role,
            })
            .await;
        match created {
            Ok(created) if is_admin => {
                return Ok(flash_redirect(
                    "/admin/users",
                    FlashKind::Success,
                    format!("User {} created.", created.username),
                ))
            }
            Ok(_) => {
                return Ok(flash_redirect(
                    LOGIN_PATH,
                    FlashKind::Success,
                    "Registration successful. Please log in.",
                ))
            }
            Err(err) => errors = FieldErrors::from_service(err)?,
        }
    }

    Ok(views::auth::register(&take_flashes(&cookies), &form, &errors, is_admin).into_response())
}

async fn reset_request_page(cookies: Cookies) -> Markup {
    views::auth::reset_request(
        &take_flashes(&cookies),
        &ResetRequestForm::default(),
        &FieldErrors::new(),
    )
}

async fn reset_request(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<ResetRequestForm>,
) -> Result<Response, PageError> {
    if let Err(errors) = form.validate() {
        let errors = FieldErrors::from_validation(&errors);
        return Ok(
            views::auth::reset_request(&take_flashes(&cookies), &form, &errors).into_response(),
        );
    }

    match state.services.users.find_by_email(&form.email).await? {
        Some(user) if user.is_active => {
            let token = state.tokens.issue_reset_token(user.id)?;
            state.notifier.send_password_reset(&user, &token);
            info!(user_id = user.id, "password reset requested");
        }
        _ => info!("password reset requested for an unknown address"),
    }

    Ok(flash_redirect(
        LOGIN_PATH,
        FlashKind::Info,
        "If that email is registered, a reset link has been sent.",
    ))
}

fn invalid_reset_link() -> Response {
    flash_redirect(
        LOGIN_PATH,
        FlashKind::Danger,
        "The reset link is invalid or has expired.",
    )
}

async fn reset_password_page(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(token): Path<String>,
) -> Response {
    if state.tokens.verify_reset_token(&token).is_err() {
        return invalid_reset_link();
    }
    views::auth::reset_password(
        &take_flashes(&cookies),
        &token,
        &FieldErrors::new(),
    )
    .into_response()
}

async fn reset_password(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, PageError> {
    let user_id = match state.tokens.verify_reset_token(&token) {
        Ok(id) => id,
        Err(_) => return Ok(invalid_reset_link()),
    };

    let mut errors = match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(errors) => FieldErrors::from_validation(&errors),
    };
    if form.password != form.confirm_password {
        errors.insert("confirm_password", "Passwords must match.");
    }
    if errors.is_empty() {
        match state.services.users.set_password(user_id, &form.password).await {
            Ok(()) => {
                return Ok(flash_redirect(
                    LOGIN_PATH,
                    FlashKind::Success,
                    "Your password has been reset. Please log in.",
                ))
            }
            Err(ServiceError::NotFound(_)) => return Ok(invalid_reset_link()),
            Err(err) => errors = FieldErrors::from_service(err)?,
        }
    }

    Ok(
        views::auth::reset_password(&take_flashes(&cookies), &token, &errors)
            .into_response(),
    )
}

