use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use maud::Markup;
use serde::Deserialize;
use std::str::FromStr;
use tracing::info;
use validator::Validate;

use crate::{
    entities::{user, UserRole},
    handlers::common::{flash_redirect, FieldErrors, FlashKind, PageCtx, PageError, ResultExt},
    services::users::{NewUser, UserUpdate},
    views, AppState,
};

const USERS_PATH: &str = "/admin/users";

/// Shared by the add and edit pages; a blank password on edit keeps the old one
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct UserForm {
    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters."))]
    #[serde(default)]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub role: String,
}

impl UserForm {
    pub fn from_model(user: &user::Model) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            password: String::new(),
            confirm_password: String::new(),
            role: user.role.to_string(),
        }
    }

    fn checked(&self, password_required: bool) -> Result<UserRole, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => FieldErrors::from_validation(&errors),
        };
        if password_required && self.password.is_empty() {
            errors.insert("password", "Password is required.");
        }
        if self.password != self.confirm_password {
            errors.insert("confirm_password", "Passwords must match.");
        }
        let role = UserRole::from_str(self.role.trim()).unwrap_or_else(|_| {
            errors.insert("role", "Choose a role.");
            UserRole::Guest
        });
        errors.into_result()?;
        Ok(role)
    }

    fn new_user(&self) -> Result<NewUser, FieldErrors> {
        let role = self.checked(true)?;
        Ok(NewUser {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            role,
        })
    }

    fn update(&self) -> Result<UserUpdate, FieldErrors> {
        let role = self.checked(false)?;
        Ok(UserUpdate {
            username: self.username.clone(),
            email: self.email.clone(),
            password: Some(self.password.clone()).filter(|p| !p.is_empty()),
            role,
        })
    }
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/add", get(add_user_page).post(add_user))
        .route("/admin/users/edit/:id", get(edit_user_page).post(edit_user))
        .route("/admin/users/deactivate/:id", post(deactivate_user))
        .route("/admin/users/reactivate/:id", post(reactivate_user))
        .route("/admin/users/delete/:id", post(delete_user))
        .route("/admin/send-dashboard-email", post(send_dashboard_email))
}

async fn list_users(State(state): State<AppState>, ctx: PageCtx) -> Result<Markup, PageError> {
    ctx.user.require_admin("manage users").or_redirect("/dashboard")?;
    let users = state.services.users.list().await?;
    Ok(views::admin::users(&ctx, &users, &state.config.admin_recipients()))
}

async fn add_user_page(ctx: PageCtx) -> Result<Markup, PageError> {
    ctx.user.require_admin("manage users").or_redirect("/dashboard")?;
    let form = UserForm {
        role: UserRole::Staff.to_string(),
        ..Default::default()
    };
    Ok(views::admin::user_form(&ctx, None, &form, &FieldErrors::new()))
}

async fn add_user(
    State(state): State<AppState>,
    ctx: PageCtx,
    Form(form): Form<UserForm>,
) -> Result<Response, PageError> {
    ctx.user.require_admin("manage users").or_redirect("/dashboard")?;
    let errors = match form.new_user() {
        Ok(new) => match state.services.users.create(new).await {
            Ok(created) => {
                return Ok(flash_redirect(
                    USERS_PATH,
                    FlashKind::Success,
                    format!("User {} created.", created.username),
                ))
            }
            Err(err) => FieldErrors::from_service(err).or_redirect(USERS_PATH)?,
        },
        Err(errors) => errors,
    };
    Ok(views::admin::user_form(&ctx, None, &form, &errors).into_response())
}

async fn edit_user_page(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Markup, PageError> {
    ctx.user.require_admin("manage users").or_redirect("/dashboard")?;
    let user = state.services.users.get(id).await?;
    Ok(views::admin::user_form(
        &ctx,
        Some(&user),
        &UserForm::from_model(&user),
        &FieldErrors::new(),
    ))
}

async fn edit_user(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
    Form(form): Form<UserForm>,
) -> Result<Response, PageError> {
    ctx.user.require_admin("manage users").or_redirect("/dashboard")?;
    let user = state.services.users.get(id).await?;
    let errors = match form.update() {
        Ok(update) => match state.services.users.update(id, update).await {
            Ok(updated) => {
                return Ok(flash_redirect(
                    USERS_PATH,
                    FlashKind::Success,
                    format!("User {} updated.", updated.username),
                ))
            }
            Err(err) => FieldErrors::from_service(err).or_redirect(USERS_PATH)?,
        },
        Err(errors) => errors,
    };
    Ok(views::admin::user_form(&ctx, Some(&user), &form, &errors).into_response())
}

async fn deactivate_user(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Response, PageError> {
    ctx.user.require_admin("manage users").or_redirect("/dashboard")?;
    let user = state
        .services
        .users
        .deactivate(ctx.user.id, id)
        .await
        .or_redirect(USERS_PATH)?;
    Ok(flash_redirect(
        USERS_PATH,
        FlashKind::Success,
        format!("{} has been deactivated.", user.username),
    ))
}

async fn reactivate_user(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Response, PageError> {
    ctx.user.require_admin("manage users").or_redirect("/dashboard")?;
    let user = state
        .services
        .users
        .reactivate(id)
        .await
        .or_redirect(USERS_PATH)?;
    Ok(flash_redirect(
        USERS_PATH,
        FlashKind::Success,
        format!("{} has been reactivated.", user.username),
    ))
}

async fn delete_user(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Response, PageError> {
    ctx.user.require_admin("manage users").or_redirect("/dashboard")?;
    let user = state
        .services
        .users
        .delete(ctx.user.id, id)
        .await
        .or_redirect(USERS_PATH)?;
    Ok(flash_redirect(
        USERS_PATH,
        FlashKind::Success,
        format!("User {} deleted.", user.username),
    ))
}

async fn send_dashboard_email(
    State(state): State<AppState>,
    ctx: PageCtx,
) -> Result<Response, PageError> {
    ctx.user
        .require_admin("send the dashboard report")
        .or_redirect("/dashboard")?;
    let recipients = state.config.admin_recipients();
    if recipients.is_empty() {
        return Ok(flash_redirect(
            USERS_PATH,
            FlashKind::Warning,
            "No admin email addresses are configured.",
        ));
    }
    let summary = state.services.reports.dashboard().await?;
    let count = recipients.len();
    state.notifier.send_dashboard_report(recipients, &summary);
    info!(recipients = count, "dashboard report queued");
    Ok(flash_redirect(
        USERS_PATH,
        FlashKind::Success,
        format!("Dashboard report sent to {} recipient(s).", count),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn form(password: &str, confirm: &str) -> UserForm {
        UserForm {
            username: "fatima".into(),
            email: "fatima@example.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
            role: "guest".into(),
        }
    }

    #[test]
    fn edit_keeps_password_when_blank() {
        let update = form("", "").update().unwrap();
        assert_eq!(update.password, None);
        assert_eq!(update.role, UserRole::Guest);
    }

    #[test]
    fn add_requires_matching_password() {
        assert_matches!(form("", "").new_user(), Err(e) if e.get("password").is_some());
        assert_matches!(
            form("longenough1", "different1").new_user(),
            Err(e) if e.get("confirm_password") == Some("Passwords must match.")
        );
    }

    #[test]
    fn role_must_be_known() {
        let mut bad = form("longenough1", "longenough1");
        bad.role = "owner".into();
        assert_matches!(bad.new_user(), Err(e) if e.get("role") == Some("Choose a role."));
    }
}
