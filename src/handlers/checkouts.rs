use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};
use maud::Markup;
use serde::Deserialize;
use validator::Validate;

use crate::{
    entities::AssetStatus,
    handlers::common::{
        empty_string_as_none, flash_redirect, parse_opt_datetime, parse_opt_i32, FieldErrors,
        FlashKind, PageCtx, PageError, ResultExt,
    },
    lifecycle::TransitionError,
    services::{
        checkouts::{CheckIn, NewCheckout},
        normalize_page,
    },
    views, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct CheckoutForm {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub expected_return: String,
    #[validate(length(min = 1, message = "Condition is required."))]
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub notes: String,
}

impl CheckoutForm {
    fn parse(&self, asset_id: i32) -> Result<NewCheckout, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => FieldErrors::from_validation(&errors),
        };
        let user_id = parse_opt_i32(&mut errors, "user_id", &self.user_id, "Choose a user.");
        if self.user_id.trim().is_empty() {
            errors.insert("user_id", "Choose a user.");
        }
        let expected_return = parse_opt_datetime(&mut errors, "expected_return", &self.expected_return);
        errors.into_result()?;
        Ok(NewCheckout {
            asset_id,
            user_id: user_id.unwrap_or_default(),
            expected_return,
            condition_out: self.condition.clone(),
            notes: Some(self.notes.clone()),
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct CheckInForm {
    #[validate(length(min = 1, message = "Condition is required."))]
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub notes: String,
}

pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/active", get(active_checkouts))
        .route("/checkout/history", get(checkout_history))
        .route(
            "/checkout/checkout/:asset_id",
            get(checkout_page).post(checkout_asset),
        )
        .route(
            "/checkout/checkin/:checkout_id",
            get(checkin_page).post(checkin_asset),
        )
}

async fn active_checkouts(State(state): State<AppState>, ctx: PageCtx) -> Result<Markup, PageError> {
    let rows = state.services.checkouts.active().await?;
    Ok(views::checkouts::active(&ctx, &rows))
}

async fn checkout_history(
    State(state): State<AppState>,
    ctx: PageCtx,
    Query(query): Query<PageQuery>,
) -> Result<Markup, PageError> {
    let page = state
        .services
        .checkouts
        .history(normalize_page(query.page), state.config.items_per_page)
        .await?;
    Ok(views::checkouts::history(&ctx, &page))
}

async fn checkout_page(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(asset_id): Path<i32>,
) -> Result<Markup, PageError> {
    let back = format!("/assets/{}", asset_id);
    ctx.user.require_staff().or_redirect(&back)?;
    let asset = state.services.assets.get(asset_id).await?;
    if asset.status != AssetStatus::Available {
        return Err(PageError::redirect(
            back,
            TransitionError::AssetUnavailable(asset.status).to_string(),
        ));
    }
    let users = state.services.users.list_active().await?;
    if users.is_empty() {
        return Err(PageError::redirect(
            back,
            "No users available. Add users before checking out assets.",
        ));
    }
    Ok(views::checkouts::checkout_form(
        &ctx,
        &asset,
        &users,
        &CheckoutForm::default(),
        &FieldErrors::new(),
    ))
}

async fn checkout_asset(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(asset_id): Path<i32>,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, PageError> {
    let back = format!("/assets/{}", asset_id);
    ctx.user.require_staff().or_redirect(&back)?;
    let asset = state.services.assets.get(asset_id).await?;

    let errors = match form.parse(asset_id) {
        Ok(new) => match state.services.checkouts.check_out(new).await {
            Ok(_) => {
                return Ok(flash_redirect(
                    "/checkout/active",
                    FlashKind::Success,
                    format!("{} checked out successfully!", asset.name),
                ))
            }
            Err(err) => FieldErrors::from_service(err).or_redirect(&back)?,
        },
        Err(errors) => errors,
    };
    let users = state.services.users.list_active().await?;
    Ok(views::checkouts::checkout_form(&ctx, &asset, &users, &form, &errors).into_response())
}

async fn checkin_page(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(checkout_id): Path<i32>,
) -> Result<Markup, PageError> {
    ctx.user.require_staff().or_redirect("/checkout/active")?;
    let row = state.services.checkouts.row(checkout_id).await?;
    if !row.checkout.is_open() {
        return Err(PageError::redirect(
            format!("/assets/{}", row.checkout.asset_id),
            TransitionError::AlreadyCheckedIn.to_string(),
        ));
    }
    Ok(views::checkouts::checkin_form(
        &ctx,
        &row,
        &CheckInForm::default(),
        &FieldErrors::new(),
    ))
}

async fn checkin_asset(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(checkout_id): Path<i32>,
    Form(form): Form<CheckInForm>,
) -> Result<Response, PageError> {
    ctx.user.require_staff().or_redirect("/checkout/active")?;
    let row = state.services.checkouts.row(checkout_id).await?;
    let back = format!("/assets/{}", row.checkout.asset_id);

    let errors = match form.validate() {
        Ok(()) => {
            let check_in = CheckIn {
                condition_in: form.condition.clone(),
                notes: Some(form.notes.clone()),
            };
            match state.services.checkouts.check_in(checkout_id, check_in).await {
                Ok(_) => {
                    return Ok(flash_redirect(
                        &back,
                        FlashKind::Success,
                        format!("{} checked in successfully!", row.asset_name),
                    ))
                }
                Err(err) => FieldErrors::from_service(err).or_redirect(&back)?,
            }
        }
        Err(errors) => FieldErrors::from_validation(&errors),
    };
    Ok(views::checkouts::checkin_form(&ctx, &row, &form, &errors).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_form_requires_user_and_condition() {
        let errors = CheckoutForm::default().parse(3).unwrap_err();
        assert_eq!(errors.get("user_id"), Some("Choose a user."));
        assert_eq!(errors.get("condition"), Some("Condition is required."));
    }

    #[test]
    fn checkout_form_parses_due_date() {
        let form = CheckoutForm {
            user_id: "4".into(),
            expected_return: "2030-01-15T10:00".into(),
            condition: "Good".into(),
            notes: String::new(),
        };
        let new = form.parse(9).unwrap();
        assert_eq!(new.asset_id, 9);
        assert_eq!(new.user_id, 4);
        assert_eq!(
            new.expected_return.map(|d| d.to_rfc3339()),
            Some("2030-01-15T10:00:00+00:00".to_string())
        );
    }
}
