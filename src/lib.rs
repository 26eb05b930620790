//! Inventory Desk
//!
//! Server-rendered inventory tracking for school labs: equipment with its
//! components, stationery stock, checkouts, maintenance and location transfers.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod lifecycle;
pub mod migrator;
pub mod notifications;
pub mod scheduler;
pub mod services;
pub mod tracing;
pub mod views;

use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::compression::CompressionLayer;

use crate::{
    auth::TokenService, config::AppConfig, db::DbPool, notifications::Mailer,
    notifications::Notifier, services::AppServices,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub services: AppServices,
    pub tokens: Arc<TokenService>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let db = Arc::new(db);
        let config = Arc::new(config);
        Self {
            services: AppServices::new(db.clone(), config.clone()),
            tokens: Arc::new(TokenService::from_config(&config)),
            notifier: Notifier::new(mailer, config.clone()),
            db,
            config,
        }
    }
}

/// The full application with its middleware stack
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(handlers::routes())
        .fallback(not_found)
        // innermost: writes flash cookies through the cookie manager below
        .layer(from_fn(handlers::common::persist_flash))
        .layer(CookieManagerLayer::new())
        .layer(CompressionLayer::new())
        .layer(crate::tracing::http_trace_layer())
        .layer(from_fn(crate::tracing::tag_request))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match db::check_connection(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "connected" })),
        ),
        Err(err) => {
            ::tracing::error!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "unreachable" })),
            )
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        views::error_page(StatusCode::NOT_FOUND, "That page does not exist."),
    )
}
