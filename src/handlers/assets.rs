use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use maud::Markup;
use serde::Deserialize;
use std::str::FromStr;
use validator::Validate;

use crate::{
    catalog::COMPONENT_TYPES,
    entities::{asset, AssetStatus},
    handlers::common::{
        empty_string_as_none, flash_redirect, parse_opt_date, parse_opt_f64, FieldErrors,
        FlashKind, PageCtx, PageError, ResultExt,
    },
    services::{
        assets::{AssetFilter, AssetInput, ComponentSerial, NewAsset},
        normalize_page,
    },
    views, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct AssetListQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u64>,
}

impl AssetListQuery {
    /// Filter values echoed into pagination links
    pub fn query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(location) = &self.location {
            parts.push(format!("location={}", location.replace(' ', "+")));
        }
        if let Some(status) = &self.status {
            parts.push(format!("status={}", status.replace(' ', "+")));
        }
        parts.join("&")
    }
}

/// Add and edit form; component serials are only read on add
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct AssetForm {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(length(min = 1, message = "Serial number is required."))]
    pub serial_number: String,
    #[validate(length(min = 1, message = "Choose an asset type."))]
    pub asset_type: String,
    #[serde(default)]
    pub purchase_date: String,
    #[serde(default)]
    pub purchase_cost: String,
    #[validate(length(min = 1, message = "Choose a location."))]
    pub location: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub monitor_serial: String,
    #[serde(default)]
    pub keyboard_serial: String,
    #[serde(default)]
    pub mouse_serial: String,
    #[serde(default)]
    pub cpu_serial: String,
}

impl AssetForm {
    pub fn from_model(asset: &asset::Model) -> Self {
        Self {
            name: asset.name.clone(),
            serial_number: asset.serial_number.clone(),
            asset_type: asset.asset_type.clone(),
            purchase_date: asset
                .purchase_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            purchase_cost: asset.purchase_cost.map(|c| c.to_string()).unwrap_or_default(),
            location: asset.location.clone(),
            condition: asset.condition.clone().unwrap_or_default(),
            notes: asset.notes.clone().unwrap_or_default(),
            status: asset.status.to_string(),
            ..Default::default()
        }
    }

    pub fn component_serial(&self, component_type: &str) -> &str {
        match component_type {
            "Monitor" => &self.monitor_serial,
            "Keyboard" => &self.keyboard_serial,
            "Mouse" => &self.mouse_serial,
            "CPU" => &self.cpu_serial,
            _ => "",
        }
    }

    fn details(&self, errors: &mut FieldErrors) -> AssetInput {
        AssetInput {
            name: self.name.clone(),
            serial_number: self.serial_number.clone(),
            asset_type: self.asset_type.clone(),
            purchase_date: parse_opt_date(errors, "purchase_date", &self.purchase_date),
            purchase_cost: parse_opt_f64(
                errors,
                "purchase_cost",
                &self.purchase_cost,
                "Enter a cost of zero or more.",
            ),
            location: self.location.clone(),
            condition: Some(self.condition.clone()),
            notes: Some(self.notes.clone()),
        }
    }

    fn new_asset(&self) -> Result<NewAsset, FieldErrors> {
        let mut errors = validation_errors(self);
        let details = self.details(&mut errors);
        let initial_status = match self.status.trim() {
            "" => AssetStatus::Available,
            raw => match AssetStatus::from_str(raw) {
                Ok(status @ (AssetStatus::Available | AssetStatus::OutOfService)) => status,
                _ => {
                    errors.insert("status", "New assets start as Available or Out of Service.");
                    AssetStatus::Available
                }
            },
        };
        let components = COMPONENT_TYPES
            .iter()
            .filter_map(|component_type| {
                let serial = self.component_serial(component_type).trim();
                (!serial.is_empty()).then(|| ComponentSerial {
                    asset_type: *component_type,
                    serial_number: serial.to_string(),
                })
            })
            .collect();
        errors.into_result()?;
        Ok(NewAsset {
            details,
            initial_status,
            components,
        })
    }

    fn update(&self) -> Result<AssetInput, FieldErrors> {
        let mut errors = validation_errors(self);
        let details = self.details(&mut errors);
        errors.into_result()?;
        Ok(details)
    }
}

fn validation_errors(form: &impl Validate) -> FieldErrors {
    match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(errors) => FieldErrors::from_validation(&errors),
    }
}

pub fn asset_routes() -> Router<AppState> {
    Router::new()
        .route("/assets", get(list_assets))
        .route("/assets/add", get(add_asset_page).post(add_asset))
        .route("/assets/:id", get(asset_details))
        .route("/assets/edit/:id", get(edit_asset_page).post(edit_asset))
        .route("/assets/delete/:id", post(delete_asset))
        .route("/assets/retire/:id", post(retire_asset))
        .route("/assets/reinstate/:id", post(reinstate_asset))
}

async fn list_assets(
    State(state): State<AppState>,
    ctx: PageCtx,
    Query(query): Query<AssetListQuery>,
) -> Result<Markup, PageError> {
    let filter = AssetFilter {
        location: query.location.clone(),
        status: query
            .status
            .as_deref()
            .and_then(|s| AssetStatus::from_str(s).ok()),
    };
    let page = state
        .services
        .assets
        .list(filter, normalize_page(query.page), state.config.items_per_page)
        .await?;
    Ok(views::assets::list(&ctx, &page, &query))
}

async fn asset_details(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Markup, PageError> {
    let services = &state.services;
    let asset = services.assets.get(id).await?;
    let parent = match asset.parent_id {
        Some(parent_id) => services.assets.find(parent_id).await?,
        None => None,
    };
    let details = views::assets::AssetDetails {
        components: services.assets.components(id).await?,
        open_checkout: services.checkouts.open_for_asset(id).await?,
        checkouts: services.checkouts.for_asset(id).await?,
        maintenance: services.maintenance.for_asset(id).await?,
        transfers: services.transfers.for_asset(id).await?,
        parent,
        asset,
    };
    Ok(views::assets::details(&ctx, &details))
}

async fn add_asset_page(ctx: PageCtx) -> Result<Markup, PageError> {
    ctx.user.require_staff().or_redirect("/assets")?;
    Ok(views::assets::form(&ctx, None, &AssetForm::default(), &FieldErrors::new()))
}

async fn add_asset(
    State(state): State<AppState>,
    ctx: PageCtx,
    Form(form): Form<AssetForm>,
) -> Result<Response, PageError> {
    ctx.user.require_staff().or_redirect("/assets")?;
    let errors = match form.new_asset() {
        Ok(new) => match state.services.assets.create(new).await {
            Ok(created) => {
                return Ok(flash_redirect(
                    &format!("/assets/{}", created.id),
                    FlashKind::Success,
                    "Asset added successfully!",
                ))
            }
            Err(err) => FieldErrors::from_service(err).or_redirect("/assets")?,
        },
        Err(errors) => errors,
    };
    Ok(views::assets::form(&ctx, None, &form, &errors).into_response())
}

async fn edit_asset_page(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Markup, PageError> {
    ctx.user.require_staff().or_redirect(&format!("/assets/{}", id))?;
    let asset = state.services.assets.get(id).await?;
    Ok(views::assets::form(
        &ctx,
        Some(&asset),
        &AssetForm::from_model(&asset),
        &FieldErrors::new(),
    ))
}

async fn edit_asset(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
    Form(form): Form<AssetForm>,
) -> Result<Response, PageError> {
    let back = format!("/assets/{}", id);
    ctx.user.require_staff().or_redirect(&back)?;
    let asset = state.services.assets.get(id).await?;
    let errors = match form.update() {
        Ok(input) => match state.services.assets.update(id, input, ctx.user.id).await {
            Ok(_) => {
                return Ok(flash_redirect(
                    &back,
                    FlashKind::Success,
                    "Asset updated successfully!",
                ))
            }
            Err(err) => FieldErrors::from_service(err).or_redirect(&back)?,
        },
        Err(errors) => errors,
    };
    Ok(views::assets::form(&ctx, Some(&asset), &form, &errors).into_response())
}

async fn delete_asset(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Response, PageError> {
    let back = format!("/assets/{}", id);
    ctx.user.require_admin("delete assets").or_redirect(&back)?;
    let asset = state.services.assets.get(id).await?;
    let removed = state.services.assets.delete(id).await.or_redirect(&back)?;
    let message = match removed.len().saturating_sub(1) {
        0 => format!("{} deleted.", asset.name),
        n => format!("{} and {} component(s) deleted.", asset.name, n),
    };
    Ok(flash_redirect("/assets", FlashKind::Success, message))
}

async fn retire_asset(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Response, PageError> {
    let back = format!("/assets/{}", id);
    ctx.user.require_admin("retire assets").or_redirect(&back)?;
    let asset = state.services.assets.retire(id).await.or_redirect(&back)?;
    Ok(flash_redirect(
        &back,
        FlashKind::Success,
        format!("{} is now out of service.", asset.name),
    ))
}

async fn reinstate_asset(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Response, PageError> {
    let back = format!("/assets/{}", id);
    ctx.user.require_admin("reinstate assets").or_redirect(&back)?;
    let asset = state.services.assets.reinstate(id).await.or_redirect(&back)?;
    Ok(flash_redirect(
        &back,
        FlashKind::Success,
        format!("{} is available again.", asset.name),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn form() -> AssetForm {
        AssetForm {
            name: "Lab PC 7".into(),
            serial_number: "SN-7".into(),
            asset_type: "Desktop".into(),
            location: "Masakin".into(),
            ..Default::default()
        }
    }

    #[test]
    fn blank_component_serials_are_skipped() {
        let mut form = form();
        form.monitor_serial = "MON-7".into();
        form.cpu_serial = "  ".into();
        let new = form.new_asset().unwrap();
        assert_eq!(new.initial_status, AssetStatus::Available);
        assert_eq!(
            new.components,
            vec![ComponentSerial {
                asset_type: "Monitor",
                serial_number: "MON-7".into()
            }]
        );
    }

    #[test]
    fn in_use_is_not_an_initial_status() {
        let mut form = form();
        form.status = "In-use".into();
        assert_matches!(form.new_asset(), Err(errors) if errors.get("status").is_some());
    }

    #[test]
    fn missing_fields_and_bad_numbers_are_reported_together() {
        let form = AssetForm {
            purchase_cost: "ten".into(),
            purchase_date: "2024-02-30".into(),
            ..Default::default()
        };
        let errors = form.update().unwrap_err();
        assert_eq!(errors.get("name"), Some("Name is required."));
        assert!(errors.get("purchase_cost").is_some());
        assert!(errors.get("purchase_date").is_some());
        assert!(errors.get("location").is_some());
    }

    #[test]
    fn list_query_echoes_filters() {
        let query = AssetListQuery {
            location: Some("Mamal Boys Lab".into()),
            status: Some("Out of Service".into()),
            page: Some(2),
        };
        assert_eq!(
            query.query_string(),
            "location=Mamal+Boys+Lab&status=Out+of+Service"
        );
    }
}
