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
    entities::{maintenance, MaintenanceStatus},
    handlers::common::{
        empty_string_as_none, flash_redirect, parse_opt_f64, FieldErrors, FlashKind, PageCtx,
        PageError, ResultExt,
    },
    lifecycle::TransitionError,
    services::maintenance::MaintenanceDetails,
    views, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub status: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct MaintenanceForm {
    #[validate(length(min = 1, message = "Description is required."))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "Technician is required."))]
    #[serde(default)]
    pub technician: String,
    #[serde(default)]
    pub cost: String,
    #[serde(default)]
    pub status: String,
}

impl MaintenanceForm {
    pub fn from_model(record: &maintenance::Model) -> Self {
        Self {
            description: record.description.clone(),
            technician: record.technician.clone(),
            cost: record.cost.map(|c| c.to_string()).unwrap_or_default(),
            status: record.status.to_string(),
        }
    }

    fn parse(&self) -> Result<MaintenanceDetails, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => FieldErrors::from_validation(&errors),
        };
        let cost = parse_opt_f64(&mut errors, "cost", &self.cost, "Enter a cost of zero or more.");
        let status = match self.status.trim() {
            "" => MaintenanceStatus::Pending,
            raw => MaintenanceStatus::from_str(raw).unwrap_or_else(|_| {
                errors.insert("status", "Choose a status.");
                MaintenanceStatus::Pending
            }),
        };
        errors.into_result()?;
        Ok(MaintenanceDetails {
            description: self.description.clone(),
            technician: self.technician.clone(),
            cost,
            status,
        })
    }
}

pub fn maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/maintenance", get(list_maintenance))
        .route(
            "/maintenance/add/:asset_id",
            get(add_maintenance_page).post(add_maintenance),
        )
        .route(
            "/maintenance/update/:id",
            get(update_maintenance_page).post(update_maintenance),
        )
        .route("/maintenance/complete/:id", post(complete_maintenance))
}

async fn list_maintenance(
    State(state): State<AppState>,
    ctx: PageCtx,
    Query(query): Query<MaintenanceQuery>,
) -> Result<Markup, PageError> {
    let status = query
        .status
        .as_deref()
        .and_then(|s| MaintenanceStatus::from_str(s).ok())
        .unwrap_or(MaintenanceStatus::Pending);
    let rows = state.services.maintenance.list(status).await?;
    Ok(views::maintenance::list(&ctx, status, &rows))
}

async fn add_maintenance_page(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(asset_id): Path<i32>,
) -> Result<Markup, PageError> {
    let back = format!("/assets/{}", asset_id);
    ctx.user.require_staff().or_redirect(&back)?;
    let asset = state.services.assets.get(asset_id).await?;
    if let Err(refused) = asset.status.begin_maintenance() {
        return Err(PageError::redirect(back, refused.to_string()));
    }
    Ok(views::maintenance::form(
        &ctx,
        &asset,
        None,
        &MaintenanceForm::default(),
        &FieldErrors::new(),
    ))
}

async fn add_maintenance(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(asset_id): Path<i32>,
    Form(form): Form<MaintenanceForm>,
) -> Result<Response, PageError> {
    let back = format!("/assets/{}", asset_id);
    ctx.user.require_staff().or_redirect(&back)?;
    let asset = state.services.assets.get(asset_id).await?;

    let errors = match form.parse() {
        Ok(details) => match state.services.maintenance.create(asset_id, details).await {
            Ok(_) => {
                return Ok(flash_redirect(
                    "/maintenance",
                    FlashKind::Success,
                    format!("Maintenance scheduled for {}.", asset.name),
                ))
            }
            Err(err) => FieldErrors::from_service(err).or_redirect(&back)?,
        },
        Err(errors) => errors,
    };
    Ok(views::maintenance::form(&ctx, &asset, None, &form, &errors).into_response())
}

async fn update_maintenance_page(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Markup, PageError> {
    ctx.user.require_staff().or_redirect("/maintenance")?;
    let record = state.services.maintenance.get(id).await?;
    if !record.status.is_open() {
        return Err(PageError::redirect(
            "/maintenance?status=Completed",
            TransitionError::MaintenanceCompleted.to_string(),
        ));
    }
    let asset = state.services.assets.get(record.asset_id).await?;
    Ok(views::maintenance::form(
        &ctx,
        &asset,
        Some(&record),
        &MaintenanceForm::from_model(&record),
        &FieldErrors::new(),
    ))
}

async fn update_maintenance(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
    Form(form): Form<MaintenanceForm>,
) -> Result<Response, PageError> {
    ctx.user.require_staff().or_redirect("/maintenance")?;
    let record = state.services.maintenance.get(id).await?;
    let asset = state.services.assets.get(record.asset_id).await?;

    let errors = match form.parse() {
        Ok(details) => match state.services.maintenance.update(id, details).await {
            Ok(updated) => {
                return Ok(flash_redirect(
                    &format!(
                        "/maintenance?status={}",
                        updated.status.to_string().replace(' ', "+")
                    ),
                    FlashKind::Success,
                    "Maintenance record updated.",
                ))
            }
            Err(err) => FieldErrors::from_service(err).or_redirect("/maintenance")?,
        },
        Err(errors) => errors,
    };
    Ok(views::maintenance::form(&ctx, &asset, Some(&record), &form, &errors).into_response())
}

async fn complete_maintenance(
    State(state): State<AppState>,
    ctx: PageCtx,
    Path(id): Path<i32>,
) -> Result<Response, PageError> {
    ctx.user.require_staff().or_redirect("/maintenance")?;
    let record = state
        .services
        .maintenance
        .complete(id)
        .await
        .or_redirect("/maintenance")?;
    Ok(flash_redirect(
        &format!("/assets/{}", record.asset_id),
        FlashKind::Success,
        "Maintenance completed; the asset is available again.",
    ))
}
