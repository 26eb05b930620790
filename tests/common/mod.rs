#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use inventory_desk::{
    app_router,
    config::AppConfig,
    db,
    entities::{asset, stationery, user, AssetStatus, UserRole},
    notifications::RecordingMailer,
    services::{
        assets::{AssetInput, ComponentSerial, NewAsset},
        stationery::NewStationery,
        users::NewUser,
    },
    AppState,
};
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse";

/// Application state on a fresh in-memory SQLite database with a recording mailer
pub struct TestApp {
    pub state: AppState,
    pub mailer: RecordingMailer,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "test".to_string(),
        );
        cfg.low_stock_alert_enabled = false;
        cfg.admin_emails = "admin@example.com".to_string();
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let mailer = RecordingMailer::new();
        let state = AppState::new(pool, cfg, Arc::new(mailer.clone()));
        Self { state, mailer }
    }

    pub fn router(&self) -> Router {
        app_router(self.state.clone())
    }

    pub async fn user(&self, username: &str, role: UserRole) -> user::Model {
        self.state
            .services
            .users
            .create(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: PASSWORD.to_string(),
                role,
            })
            .await
            .expect("create user")
    }

    pub async fn asset(&self, name: &str, serial: &str, asset_type: &str) -> asset::Model {
        self.asset_with_components(name, serial, asset_type, vec![])
            .await
    }

    pub async fn asset_with_components(
        &self,
        name: &str,
        serial: &str,
        asset_type: &str,
        components: Vec<(&'static str, &str)>,
    ) -> asset::Model {
        self.state
            .services
            .assets
            .create(NewAsset {
                details: asset_input(name, serial, asset_type, "Rabwat"),
                initial_status: AssetStatus::Available,
                components: components
                    .into_iter()
                    .map(|(asset_type, serial)| ComponentSerial {
                        asset_type,
                        serial_number: serial.to_string(),
                    })
                    .collect(),
            })
            .await
            .expect("create asset")
    }

    pub async fn stationery(&self, item_type: &str, quantity: i32, threshold: i32) -> stationery::Model {
        self.state
            .services
            .stationery
            .create(NewStationery {
                item_type: item_type.to_string(),
                quantity,
                unit: "sheets".to_string(),
                threshold: Some(threshold),
                location: None,
            })
            .await
            .expect("create stationery")
    }

    /// Session cookie header value for `user`
    pub fn session_for(&self, user: &user::Model) -> String {
        let token = self
            .state
            .tokens
            .issue_session(user)
            .expect("issue session token");
        format!("inventory_session={}", token)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send(Method::GET, uri, cookie, None).await
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, form: &str) -> Response {
        self.send(Method::POST, uri, cookie, Some(("application/x-www-form-urlencoded", form.to_string())))
            .await
    }

    pub async fn post_json(&self, uri: &str, cookie: Option<&str>, json: serde_json::Value) -> Response {
        self.send(Method::POST, uri, cookie, Some(("application/json", json.to_string())))
            .await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<(&str, String)>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some((content_type, body)) => builder
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");
        self.router().oneshot(request).await.expect("router response")
    }
}

pub fn asset_input(name: &str, serial: &str, asset_type: &str, location: &str) -> AssetInput {
    AssetInput {
        name: name.to_string(),
        serial_number: serial.to_string(),
        asset_type: asset_type.to_string(),
        purchase_date: None,
        purchase_cost: None,
        location: location.to_string(),
        condition: Some("Good".to_string()),
        notes: None,
    }
}

pub async fn body_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// The `name=value` pairs a response sets, ready to send back as a Cookie header
pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::to_string)
        .collect()
}

/// Mail is sent on detached tasks; polls until `count` messages arrive
pub async fn wait_for_mail(mailer: &RecordingMailer, count: usize) -> Vec<inventory_desk::notifications::OutgoingEmail> {
    for _ in 0..50 {
        let sent = mailer.sent();
        if sent.len() >= count {
            return sent;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    mailer.sent()
}
