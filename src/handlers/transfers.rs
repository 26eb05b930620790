use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};
use maud::Markup;
use serde::Deserialize;

use crate::{
    entities::AssetStatus,
    handlers::{
        checkouts::PageQuery,
        common::{flash_redirect, FieldErrors, FlashKind, PageCtx, PageError, ResultExt},
    },
    services::{normalize_page, transfers::NewTransfer},
    views, AppState,
};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TransferForm {
    #[serde(default)]
    pub to_location: String,
    #[serde(default)]
    pub notes: String,
}

impl TransferForm {
    fn parse(&self, asset_id: i32, transferred_by: i32) -> Result<NewTransfer, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.to_location.trim().is_empty() {
            errors.insert("to_location", "Choose a destination.");
        }
        errors.into_result()?;
        Ok(NewTransfer {
            asset_id,
            to_location: self.to_location.clone(),
            notes: Some(self.notes.clone()),
            transferred_by,
        })
    }
}

pub fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/transfers", get(list_transfers))
        .route(
            "/transfers/new/:asset_id",
            get(transfer_page).post(transfer_asset),
        )
}

async fn list_transfers(
    State(state): State<AppState>,
    ctx: PageCtx,
    Query(query): Query<PageQuery>,
) -> Result<Markup, PageError> {
    let page = state
        .services
        .transfers
        .list(normalize_page(query.page), state.config.items_per_page)
        .await?;
    Ok(views::transfers::list(&ctx, &page))
}

async fn transfer_page(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(asset_id): Path<i32>,
) -> Result<Markup, PageError> {
    let back = format!("/assets/{}", asset_id);
    ctx.user.require_staff().or_redirect(&back)?;
    let asset = state.services.assets.get(asset_id).await?;
    if asset.status == AssetStatus::InUse {
        return Err(PageError::redirect(
            back,
            format!("{} is checked out; check it in before transferring.", asset.name),
        ));
    }
    Ok(views::transfers::form(
        &ctx,
        &asset,
        &TransferForm::default(),
        &FieldErrors::new(),
    ))
}

async fn transfer_asset(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(asset_id): Path<i32>,
    Form(form): Form<TransferForm>,
) -> Result<Response, PageError> {
    let back = format!("/assets/{}", asset_id);
    ctx.user.require_staff().or_redirect(&back)?;
    let asset = state.services.assets.get(asset_id).await?;

    let errors = match form.parse(asset_id, ctx.user.id) {
        Ok(new) => match state.services.transfers.transfer(new).await {
            Ok(rows) => {
                let message = match rows.len() {
                    0 | 1 => format!("{} moved to {}.", asset.name, form.to_location.trim()),
                    n => format!(
                        "{} and {} component(s) moved to {}.",
                        asset.name,
                        n - 1,
                        form.to_location.trim()
                    ),
                };
                return Ok(flash_redirect(&back, FlashKind::Success, message));
            }
            Err(err) => FieldErrors::from_service(err).or_redirect(&back)?,
        },
        Err(errors) => errors,
    };
    Ok(views::transfers::form(&ctx, &asset, &form, &errors).into_response())
}
