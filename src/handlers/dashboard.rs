use axum::{
    extract::State,
    response::{Redirect, Response},
    routing::get,
    Router,
};
use maud::Markup;
use tracing::error;

use crate::{
    auth::{CurrentUser, HOME_PATH},
    export::{self, ExportFormat},
    handlers::common::{download, PageCtx, PageError},
    services::reports::dashboard_table,
    views, AppState,
};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/dashboard", get(dashboard))
        .route("/export-dashboard", get(export_dashboard))
}

async fn index(_user: CurrentUser) -> Redirect {
    Redirect::to(HOME_PATH)
}

async fn dashboard(State(state): State<AppState>, ctx: PageCtx) -> Result<Markup, PageError> {
    let summary = state.services.reports.dashboard().await?;
    Ok(views::dashboard::dashboard(&ctx, &summary))
}

async fn export_dashboard(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Response, PageError> {
    let summary = state.services.reports.dashboard().await?;
    let bytes = export::render(&dashboard_table(&summary), ExportFormat::Csv).map_err(|err| {
        error!(error = %err, "dashboard export failed");
        PageError::Internal(err)
    })?;
    Ok(download(
        bytes,
        ExportFormat::Csv.content_type(),
        "dashboard_report.csv",
    ))
}
