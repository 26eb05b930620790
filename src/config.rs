use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_DATABASE_URL: &str = "sqlite://inventory.db?mode=rwc";
const DEFAULT_ITEMS_PER_PAGE: u64 = 20;
const DEFAULT_LOW_STOCK_THRESHOLDS: &str = "A4=100,A3=50,A5=50,Photo Paper=20";
const DEFAULT_ALERT_HOUR: u32 = 9;
const DEV_DEFAULT_SECRET_KEY: &str = "development-secret-key-change-me-before-deploying";
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Application configuration
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Signs session cookies and password reset tokens
    #[validate(length(min = 1, message = "secret_key must not be empty"))]
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    #[validate(length(min = 1))]
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Run embedded migrations on startup
    #[serde(default = "default_true_bool")]
    pub auto_migrate: bool,

    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    // ========== Mail ==========
    #[serde(default = "default_mail_server")]
    pub mail_server: String,

    #[serde(default = "default_mail_port")]
    pub mail_port: u16,

    #[serde(default = "default_true_bool")]
    pub mail_use_tls: bool,

    #[serde(default)]
    pub mail_use_ssl: bool,

    #[serde(default)]
    pub mail_username: Option<String>,

    #[serde(default)]
    pub mail_password: Option<String>,

    /// From address; falls back to `mail_username`
    #[serde(default)]
    pub mail_sender: Option<String>,

    /// Comma separated recipients for scheduled and admin reports
    #[serde(default)]
    pub admin_emails: String,

    // ========== Inventory ==========
    #[validate(range(min = 1, max = 500))]
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u64,

    /// `Item Type=threshold` pairs, comma separated
    #[serde(default = "default_low_stock_thresholds")]
    pub low_stock_thresholds: String,

    /// Local hour of the daily low-stock email
    #[validate(range(max = 23))]
    #[serde(default = "default_alert_hour")]
    pub low_stock_alert_hour: u32,

    #[serde(default = "default_true_bool")]
    pub low_stock_alert_enabled: bool,

    // ========== Auth ==========
    #[validate(range(min = 60))]
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[validate(range(min = 60))]
    #[serde(default = "default_reset_token_ttl_secs")]
    pub reset_token_ttl_secs: u64,

    /// Required by `/auth/register`; registration is closed when unset
    #[serde(default)]
    pub registration_code: Option<String>,

    /// Absolute base for links placed in outgoing mail
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_secret_key() -> String {
    DEV_DEFAULT_SECRET_KEY.to_string()
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true_bool() -> bool {
    true
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_mail_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_mail_port() -> u16 {
    587
}

fn default_items_per_page() -> u64 {
    DEFAULT_ITEMS_PER_PAGE
}

fn default_low_stock_thresholds() -> String {
    DEFAULT_LOW_STOCK_THRESHOLDS.to_string()
}

fn default_alert_hour() -> u32 {
    DEFAULT_ALERT_HOUR
}

fn default_session_ttl_secs() -> u64 {
    86_400
}

fn default_reset_token_ttl_secs() -> u64 {
    600
}

fn default_public_base_url() -> String {
    format!("http://localhost:{}", DEFAULT_PORT)
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials
    pub fn new(database_url: String, secret_key: String, environment: String) -> Self {
        Self {
            secret_key,
            database_url,
            host: default_host(),
            port: default_port(),
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            mail_server: default_mail_server(),
            mail_port: default_mail_port(),
            mail_use_tls: true,
            mail_use_ssl: false,
            mail_username: None,
            mail_password: None,
            mail_sender: None,
            admin_emails: String::new(),
            items_per_page: default_items_per_page(),
            low_stock_thresholds: default_low_stock_thresholds(),
            low_stock_alert_hour: default_alert_hour(),
            low_stock_alert_enabled: true,
            session_ttl_secs: default_session_ttl_secs(),
            reset_token_ttl_secs: default_reset_token_ttl_secs(),
            registration_code: None,
            public_base_url: default_public_base_url(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("test")
    }

    /// Database URL with the legacy `postgres://` scheme rewritten
    pub fn database_url(&self) -> String {
        match self.database_url.strip_prefix("postgres://") {
            Some(rest) => format!("postgresql://{}", rest),
            None => self.database_url.clone(),
        }
    }

    /// Admin recipients, blanks dropped
    pub fn admin_recipients(&self) -> Vec<String> {
        self.admin_emails
            .split(',')
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Parses the configured per-type thresholds
    pub fn low_stock_threshold_map(&self) -> Result<BTreeMap<String, i32>, String> {
        parse_thresholds(&self.low_stock_thresholds)
    }

    /// Default reorder threshold for a stationery item type, matched case-insensitively
    pub fn default_threshold_for(&self, item_type: &str) -> Option<i32> {
        let map = self.low_stock_threshold_map().ok()?;
        let wanted = normalize_item_key(item_type);
        map.into_iter()
            .find(|(key, _)| normalize_item_key(key) == wanted)
            .map(|(_, threshold)| threshold)
    }

    pub fn mail_configured(&self) -> bool {
        self.mail_username
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false)
            && !self.mail_server.trim().is_empty()
    }

    pub fn mail_from(&self) -> Option<String> {
        self.mail_sender
            .clone()
            .or_else(|| self.mail_username.clone())
            .filter(|s| !s.trim().is_empty())
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() {
            if self.secret_key.trim() == DEV_DEFAULT_SECRET_KEY {
                let mut err = ValidationError::new("secret_key_default_dev");
                err.message = Some(
                    "The bundled development secret must not be used outside development. Set APP__SECRET_KEY."
                        .into(),
                );
                errors.add("secret_key", err);
            } else if self.secret_key.len() < MIN_PRODUCTION_SECRET_LEN {
                let mut err = ValidationError::new("secret_key_too_short");
                err.message = Some(
                    format!(
                        "secret_key must be at least {} characters outside development",
                        MIN_PRODUCTION_SECRET_LEN
                    )
                    .into(),
                );
                errors.add("secret_key", err);
            }
        }

        if let Err(msg) = self.low_stock_threshold_map() {
            let mut err = ValidationError::new("low_stock_thresholds_malformed");
            err.message = Some(msg.into());
            errors.add("low_stock_thresholds", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_pool_bounds");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn normalize_item_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', " ")
}

fn parse_thresholds(raw: &str) -> Result<BTreeMap<String, i32>, String> {
    let mut map = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected `Item=threshold`, got `{}`", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("missing item type in `{}`", pair));
        }
        let threshold: i32 = value
            .trim()
            .parse()
            .map_err(|_| format!("threshold for `{}` is not an integer", key))?;
        if threshold < 0 {
            return Err(format!("threshold for `{}` must not be negative", key));
        }
        map.insert(key.to_string(), threshold);
    }
    Ok(map)
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(ValidationErrors),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("inventory_desk={},tower_http=info", level);
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(default_directive));

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. `.env` in the working directory (via dotenvy)
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            warn!("Ignoring unreadable .env file: {}", err);
        }
    }

    let run_env = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
