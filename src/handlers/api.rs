//! JSON endpoints used by the dashboard's scanner and report widgets.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use validator::Validate;

use crate::{
    auth::CurrentUser,
    entities::{asset, AssetStatus},
    services::qr::asset_id_from_qr,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub qr_data: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub id: i32,
    pub name: String,
    pub serial_number: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub location: String,
    pub status: AssetStatus,
    pub qr_code: Option<String>,
    pub checkout_url: String,
    pub maintenance_url: String,
    pub details_url: String,
}

impl From<asset::Model> for ScanResponse {
    fn from(asset: asset::Model) -> Self {
        Self {
            checkout_url: format!("/checkout/checkout/{}", asset.id),
            maintenance_url: format!("/maintenance/add/{}", asset.id),
            details_url: format!("/assets/{}", asset.id),
            id: asset.id,
            name: asset.name,
            serial_number: asset.serial_number,
            asset_type: asset.asset_type,
            location: asset.location,
            status: asset.status,
            qr_code: asset.qr_code,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReportEmailRequest {
    #[serde(default)]
    #[validate(email)]
    pub email: String,
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/scan_qr", post(scan_qr))
        .route("/send-dashboard-email", post(send_dashboard_email))
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Resolves a scanned label to its asset
async fn scan_qr(
    State(state): State<AppState>,
    _user: CurrentUser,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Response {
    let asset_id = body
        .ok()
        .and_then(|Json(req)| req.qr_data)
        .as_deref()
        .and_then(asset_id_from_qr);
    let Some(asset_id) = asset_id else {
        return json_error(StatusCode::BAD_REQUEST, "Invalid QR data");
    };

    match state.services.assets.find(asset_id).await {
        Ok(Some(asset)) => {
            info!(asset_id, "qr code resolved");
            Json(ScanResponse::from(asset)).into_response()
        }
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Asset not found"),
        Err(err) => {
            error!(error = %err, asset_id, "qr lookup failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error during QR scan")
        }
    }
}

/// Mails the current dashboard figures to one address
async fn send_dashboard_email(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<ReportEmailRequest>, JsonRejection>,
) -> Response {
    let email = match body {
        Ok(Json(req)) if !req.email.trim().is_empty() && req.validate().is_ok() => {
            req.email.trim().to_string()
        }
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": "Email is required" })),
            )
                .into_response()
        }
    };

    match state.services.reports.dashboard().await {
        Ok(summary) => {
            state.notifier.send_dashboard_report(vec![email], &summary);
            info!(user_id = user.id, "dashboard report queued");
            Json(json!({ "success": true })).into_response()
        }
        Err(err) => {
            error!(error = %err, "dashboard report could not be built");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Failed to send report" })),
            )
                .into_response()
        }
    }
}
