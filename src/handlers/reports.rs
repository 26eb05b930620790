use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use maud::Markup;
use serde::Deserialize;
use std::str::FromStr;
use tracing::error;

use crate::{
    export::{self, ExportFormat},
    handlers::common::{download, empty_string_as_none, PageCtx, PageError},
    services::reports::{ReportKind, ReportPeriod},
    views, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub period: Option<String>,
}

impl PeriodQuery {
    /// Unknown periods fall back to the last week
    pub fn period(&self) -> ReportPeriod {
        self.period
            .as_deref()
            .and_then(|p| ReportPeriod::from_str(p).ok())
            .unwrap_or_default()
    }
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(reports_index))
        .route("/reports/assets", get(asset_report))
        .route("/reports/stationery", get(stationery_report))
        .route("/reports/checkouts", get(checkout_report))
        .route("/reports/maintenance", get(maintenance_report))
        .route("/reports/export/:report/:format", get(export_report))
}

async fn reports_index(ctx: PageCtx) -> Markup {
    views::reports::index(&ctx)
}

async fn asset_report(State(state): State<AppState>, ctx: PageCtx) -> Result<Markup, PageError> {
    let report = state.services.reports.asset_report().await?;
    Ok(views::reports::assets(&ctx, &report))
}

async fn stationery_report(
    State(state): State<AppState>,
    ctx: PageCtx,
) -> Result<Markup, PageError> {
    let report = state.services.reports.stationery_report().await?;
    Ok(views::reports::stationery(&ctx, &report))
}

async fn checkout_report(
    State(state): State<AppState>,
    ctx: PageCtx,
    Query(query): Query<PeriodQuery>,
) -> Result<Markup, PageError> {
    let report = state.services.reports.checkout_report(query.period()).await?;
    Ok(views::reports::checkouts(&ctx, &report))
}

async fn maintenance_report(
    State(state): State<AppState>,
    ctx: PageCtx,
) -> Result<Markup, PageError> {
    let report = state.services.reports.maintenance_report().await?;
    Ok(views::reports::maintenance(&ctx, &report))
}

async fn export_report(
    State(state): State<AppState>,
    _ctx: PageCtx,
    Path((report, format)): Path<(String, String)>,
) -> Result<Response, PageError> {
    let kind = ReportKind::parse(&report)?;
    let format = ExportFormat::from_str(&format)?;

    let rendered = match state.services.reports.table(kind).await {
        Ok(table) => export::render(&table, format),
        Err(err) => Err(err),
    };
    match rendered {
        Ok(bytes) => Ok(download(
            bytes,
            format.content_type(),
            &format!("{}_report.{}", kind, format.extension()),
        )),
        Err(err) => {
            error!(report = %kind, %format, error = %err, "report export failed");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error generating {} report: {}", format, err.response_message()),
            )
                .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_defaults_to_week() {
        assert_eq!(PeriodQuery::default().period(), ReportPeriod::Week);
        let query = PeriodQuery {
            period: Some("Month".into()),
        };
        assert_eq!(query.period(), ReportPeriod::Month);
        let query = PeriodQuery {
            period: Some("decade".into()),
        };
        assert_eq!(query.period(), ReportPeriod::Week);
    }
}
