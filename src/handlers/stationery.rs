use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use maud::Markup;
use serde::Deserialize;
use validator::Validate;

use crate::{
    entities::stationery,
    handlers::common::{
        empty_string_as_none, flash_redirect, parse_opt_i32, FieldErrors, FlashKind, PageCtx,
        PageError, ResultExt,
    },
    lifecycle::StockAdjustment,
    services::stationery::{NewStationery, StationeryFilter, StockUpdate},
    views, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct StationeryQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub item_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub location: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct StationeryForm {
    #[validate(length(min = 1, message = "Choose an item type."))]
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub quantity: String,
    #[validate(length(min = 1, message = "Choose a unit."))]
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub threshold: String,
    #[serde(default)]
    pub location: String,
}

impl StationeryForm {
    fn parse(&self) -> Result<NewStationery, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => FieldErrors::from_validation(&errors),
        };
        let quantity = parse_opt_i32(&mut errors, "quantity", &self.quantity, "Enter a whole number.");
        if quantity.map(|q| q < 0).unwrap_or(false) {
            errors.insert("quantity", "Quantity cannot be negative.");
        }
        let threshold =
            parse_opt_i32(&mut errors, "threshold", &self.threshold, "Enter a whole number.");
        if threshold.map(|t| t < 0).unwrap_or(false) {
            errors.insert("threshold", "Threshold cannot be negative.");
        }
        errors.into_result()?;
        Ok(NewStationery {
            item_type: self.item_type.clone(),
            quantity: quantity.unwrap_or(0),
            unit: self.unit.clone(),
            threshold,
            location: Some(self.location.clone()),
        })
    }
}

/// Stock adjustment form
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AdjustForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub threshold: String,
    #[serde(default)]
    pub location: String,
}

impl AdjustForm {
    pub fn from_model(item: &stationery::Model) -> Self {
        Self {
            action: "add".into(),
            amount: String::new(),
            threshold: item.threshold.to_string(),
            location: item.location.clone(),
        }
    }

    fn parse(&self) -> Result<StockUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        let amount = parse_opt_i32(&mut errors, "amount", &self.amount, "Enter a whole number of at least 1.");
        let adjustment = match amount {
            Some(n) if n >= 1 => StockAdjustment::parse(&self.action, n).or_else(|| {
                errors.insert("action", "Choose to add or subtract.");
                None
            }),
            _ => {
                errors.insert("amount", "Enter a whole number of at least 1.");
                None
            }
        };
        let threshold =
            parse_opt_i32(&mut errors, "threshold", &self.threshold, "Enter a whole number.");
        if threshold.map(|t| t < 0).unwrap_or(false) {
            errors.insert("threshold", "Threshold cannot be negative.");
        }
        errors.into_result()?;
        adjustment
            .map(|adjustment| StockUpdate {
                adjustment,
                threshold,
                location: Some(self.location.clone()),
            })
            .ok_or_else(|| {
                let mut errors = FieldErrors::new();
                errors.insert("amount", "Enter a whole number of at least 1.");
                errors
            })
    }
}

pub fn stationery_routes() -> Router<AppState> {
    Router::new()
        .route("/stationery", get(list_stationery))
        .route("/stationery/add", get(add_item_page).post(add_item))
        .route("/stationery/update/:id", get(update_item_page).post(update_item))
        .route("/stationery/delete/:id", post(delete_item))
}

async fn list_stationery(
    State(state): State<AppState>,
    ctx: PageCtx,
    Query(query): Query<StationeryQuery>,
) -> Result<Markup, PageError> {
    let filter = StationeryFilter {
        item_type: query.item_type.clone(),
        location: query.location.clone(),
    };
    let items = state.services.stationery.list(filter).await?;
    let locations = state.services.stationery.locations().await?;
    Ok(views::stationery::list(&ctx, &items, &locations, &query))
}

async fn add_item_page(ctx: PageCtx) -> Result<Markup, PageError> {
    ctx.user.require_staff().or_redirect("/stationery")?;
    Ok(views::stationery::add_form(
        &ctx,
        &StationeryForm::default(),
        &FieldErrors::new(),
    ))
}

async fn add_item(
    State(state): State<AppState>,
    ctx: PageCtx,
    Form(form): Form<StationeryForm>,
) -> Result<Response, PageError> {
    ctx.user.require_staff().or_redirect("/stationery")?;
    let errors = match form.parse() {
        Ok(new) => match state.services.stationery.create(new).await {
            Ok(item) => {
                return Ok(flash_redirect(
                    "/stationery",
                    FlashKind::Success,
                    format!("{} added.", item.item_type),
                ))
            }
            Err(err) => FieldErrors::from_service(err).or_redirect("/stationery")?,
        },
        Err(errors) => errors,
    };
    Ok(views::stationery::add_form(&ctx, &form, &errors).into_response())
}

async fn update_item_page(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Markup, PageError> {
    ctx.user.require_staff().or_redirect("/stationery")?;
    let item = state.services.stationery.get(id).await?;
    Ok(views::stationery::adjust_form(
        &ctx,
        &item,
        &AdjustForm::from_model(&item),
        &FieldErrors::new(),
    ))
}

async fn update_item(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
    Form(form): Form<AdjustForm>,
) -> Result<Response, PageError> {
    ctx.user.require_staff().or_redirect("/stationery")?;
    let item = state.services.stationery.get(id).await?;
    let back = format!("/stationery/update/{}", id);

    let errors = match form.parse() {
        Ok(update) => match state.services.stationery.adjust(id, update).await {
            Ok(updated) if updated.is_low_stock() => {
                return Ok(flash_redirect(
                    "/stationery",
                    FlashKind::Warning,
                    format!(
                        "Stock updated. {} is below its reorder threshold ({} {} left).",
                        updated.item_type, updated.quantity, updated.unit
                    ),
                ))
            }
            Ok(_) => {
                return Ok(flash_redirect(
                    "/stationery",
                    FlashKind::Success,
                    "Stock updated successfully!",
                ))
            }
            Err(err) => FieldErrors::from_service(err).or_redirect(&back)?,
        },
        Err(errors) => errors,
    };
    Ok(views::stationery::adjust_form(&ctx, &item, &form, &errors).into_response())
}

async fn delete_item(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Response, PageError> {
    ctx.user
        .require_admin("delete stationery")
        .or_redirect("/stationery")?;
    let item = state
        .services
        .stationery
        .delete(id)
        .await
        .or_redirect("/stationery")?;
    Ok(flash_redirect(
        "/stationery",
        FlashKind::Success,
        format!("{} at {} deleted.", item.item_type, item.location),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn adjust(action: &str, amount: &str) -> AdjustForm {
        AdjustForm {
            action: action.into(),
            amount: amount.into(),
            threshold: String::new(),
            location: String::new(),
        }
    }

    #[test]
    fn adjustment_parses_action_and_amount() {
        let update = adjust("subtract", "5").parse().unwrap();
        assert_eq!(update.adjustment, StockAdjustment::Subtract(5));
        assert_eq!(update.threshold, None);
    }

    #[test]
    fn zero_or_garbage_amounts_are_rejected() {
        assert_matches!(adjust("add", "0").parse(), Err(e) if e.get("amount").is_some());
        assert_matches!(adjust("add", "lots").parse(), Err(e) if e.get("amount").is_some());
        assert_matches!(adjust("burn", "3").parse(), Err(e) if e.get("action").is_some());
    }

    #[test]
    fn new_item_rejects_negative_quantity() {
        let form = StationeryForm {
            item_type: "A4".into(),
            quantity: "-2".into(),
            unit: "reams".into(),
            threshold: String::new(),
            location: String::new(),
        };
        assert_matches!(form.parse(), Err(e) if e.get("quantity") == Some("Quantity cannot be negative."));
    }
}
