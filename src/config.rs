use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 5000;
const CONFIG_DIR: &str = "config";
const DEFAULT_JWT_EXPIRATION_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_JWT_ISSUER: &str = "uniform-store-api";
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
const DEFAULT_FREE_SHIPPING_THRESHOLD: i64 = 2999;
const DEFAULT_FLAT_SHIPPING_CHARGE: i64 = 99;
const DEV_DEFAULT_JWT_SECRET: &str = "development_only_jwt_secret_replace_before_deploying_0123456789";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// HS256 signing secret for admin bearer tokens
    #[validate(custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Bearer token lifetime in seconds (5min - 30d)
    #[serde(default = "default_jwt_expiration_secs")]
    #[validate(range(min = 300, max = 2592000))]
    pub jwt_expiration_secs: u64,

    /// Issuer and audience claim of issued tokens
    #[serde(default = "default_jwt_issuer")]
    #[validate(length(min = 1))]
    pub jwt_issuer: String,

    /// Argon2 memory cost in KiB
    #[serde(default = "default_password_hash_memory_kib")]
    #[validate(range(min = 8, max = 1048576))]
    pub password_hash_memory_kib: u32,

    /// Argon2 iteration count
    #[serde(default = "default_password_hash_iterations")]
    #[validate(range(min = 1, max = 16))]
    pub password_hash_iterations: u32,

    /// Stock lines at or below this non-zero quantity raise the low-stock alert
    #[serde(default = "default_low_stock_threshold")]
    #[validate(range(min = 0))]
    pub low_stock_threshold: i32,

    /// Subtotals strictly above this amount ship free
    #[serde(default = "default_free_shipping_threshold")]
    #[validate(custom = "validate_non_negative_amount")]
    pub free_shipping_threshold: Decimal,

    /// Shipping charge applied below the free-shipping threshold
    #[serde(default = "default_flat_shipping_charge")]
    #[validate(custom = "validate_non_negative_amount")]
    pub flat_shipping_charge: Decimal,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB connect timeout in seconds
    #[serde(default = "default_db_connect_timeout_secs")]
    #[validate(range(min = 1))]
    pub db_connect_timeout_secs: u64,

    /// DB acquire timeout in seconds
    #[serde(default = "default_db_acquire_timeout_secs")]
    #[validate(range(min = 1))]
    pub db_acquire_timeout_secs: u64,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Super-admin created on startup when no admin exists yet
    #[serde(default)]
    pub bootstrap_admin_email: Option<String>,

    #[serde(default)]
    pub bootstrap_admin_password: Option<String>,

    #[serde(default)]
    pub bootstrap_admin_name: Option<String>,
}

/// Catalog settings injected into the catalog and order services
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogConfig {
    pub low_stock_threshold: i32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

/// Shipping rule applied when an order is priced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricingPolicy {
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_charge: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::from(DEFAULT_FREE_SHIPPING_THRESHOLD),
            flat_shipping_charge: Decimal::from(DEFAULT_FLAT_SHIPPING_CHARGE),
        }
    }
}

impl PricingPolicy {
    /// Free strictly above the threshold, flat charge otherwise.
    pub fn shipping_charge(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.flat_shipping_charge
        }
    }
}

impl AppConfig {
    /// Builds a configuration with defaults for everything but the essentials.
    pub fn new(
        database_url: String,
        jwt_secret: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            jwt_secret,
            jwt_expiration_secs: default_jwt_expiration_secs(),
            jwt_issuer: default_jwt_issuer(),
            password_hash_memory_kib: default_password_hash_memory_kib(),
            password_hash_iterations: default_password_hash_iterations(),
            low_stock_threshold: default_low_stock_threshold(),
            free_shipping_threshold: default_free_shipping_threshold(),
            flat_shipping_charge: default_flat_shipping_charge(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            auto_migrate: false,
            cors_allowed_origins: None,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
            bootstrap_admin_name: None,
        }
    }

    /// Checks if running in production
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn catalog(&self) -> CatalogConfig {
        CatalogConfig {
            low_stock_threshold: self.low_stock_threshold,
        }
    }

    pub fn pricing(&self) -> PricingPolicy {
        PricingPolicy {
            free_shipping_threshold: self.free_shipping_threshold,
            flat_shipping_charge: self.flat_shipping_charge,
        }
    }

    /// Parsed CORS origins, empty when none are configured
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if self.bootstrap_admin_email.is_some() != self.bootstrap_admin_password.is_some() {
            let mut err = ValidationError::new("bootstrap_admin");
            err.message = Some(
                "bootstrap_admin_email and bootstrap_admin_password must be set together".into(),
            );
            errors.add("bootstrap_admin_email", err);
        }

        if self
            .bootstrap_admin_password
            .as_deref()
            .is_some_and(|pw| pw.chars().count() < crate::auth::MIN_PASSWORD_LENGTH)
        {
            let mut err = ValidationError::new("bootstrap_admin_password");
            err.message = Some("bootstrap_admin_password must be at least 6 characters".into());
            errors.add("bootstrap_admin_password", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_jwt_expiration_secs() -> u64 {
    DEFAULT_JWT_EXPIRATION_SECS
}

fn default_jwt_issuer() -> String {
    DEFAULT_JWT_ISSUER.to_string()
}

fn default_password_hash_memory_kib() -> u32 {
    19_456
}

fn default_password_hash_iterations() -> u32 {
    2
}

fn default_low_stock_threshold() -> i32 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

fn default_free_shipping_threshold() -> Decimal {
    Decimal::from(DEFAULT_FREE_SHIPPING_THRESHOLD)
}

fn default_flat_shipping_charge() -> Decimal {
    Decimal::from(DEFAULT_FLAT_SHIPPING_CHARGE)
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    5
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 32 {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be at least 32 characters".into());
        return Err(err);
    }

    const DISALLOWED: [&str; 4] = [
        "CHANGE_THIS_SECRET_IN_PRODUCTION",
        "your_jwt_secret_key_change_this_in_production",
        "your-secret-key",
        "default-secret-key",
    ];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be overridden with a secure random value".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    Ok(())
}

fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() {
        let mut err = ValidationError::new("amount");
        err.message = Some("must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("uniform_store_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Loads configuration from an explicit directory and profile.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let dir = config_dir.display();
    let config = Config::builder()
        .set_default("database_url", "sqlite://uniform_store.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", dir)).required(false))
        .add_source(File::with_name(&format!("{}/{}", dir, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to a random string of at least 32 characters.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::TempDir;

    const SECRET: &str = "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8";

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            SECRET.into(),
            "127.0.0.1".into(),
            5000,
            "production".into(),
        )
    }

    fn write_config(content: &str, profile: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(format!("{profile}.toml"))).unwrap();
        writeln!(file, "{}", content).unwrap();
        dir
    }

    #[test]
    fn base_config_is_valid() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn defaults_match_storefront_rules() {
        let cfg = base_config();
        assert_eq!(cfg.catalog().low_stock_threshold, 5);
        assert_eq!(cfg.pricing().free_shipping_threshold, dec!(2999));
        assert_eq!(cfg.pricing().flat_shipping_charge, dec!(99));
        assert_eq!(cfg.jwt_expiration(), Duration::from_secs(604_800));
        assert_eq!(cfg.db_connect_timeout_secs, 5);
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.jwt_secret = "short".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("jwt_secret"));
    }

    #[test]
    fn placeholder_jwt_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.jwt_secret = "your_jwt_secret_key_change_this_in_production".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn dev_secret_rejected_outside_development() {
        let mut cfg = base_config();
        cfg.jwt_secret = DEV_DEFAULT_JWT_SECRET.into();
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn token_expiry_is_bounded() {
        let mut cfg = base_config();
        cfg.jwt_expiration_secs = 60;
        assert!(cfg.validate().is_err());
        cfg.jwt_expiration_secs = 31 * 24 * 60 * 60;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bootstrap_credentials_come_in_pairs() {
        let mut cfg = base_config();
        cfg.bootstrap_admin_email = Some("owner@example.com".into());
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.bootstrap_admin_password = Some("secret1".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some(" https://a.example , ,https://b.example".into());
        assert_eq!(
            cfg.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn loads_profile_file() {
        let dir = write_config(
            &format!(
                r#"
                database_url = "sqlite::memory:"
                jwt_secret = "{SECRET}"
                low_stock_threshold = 3
                free_shipping_threshold = 1500
                "#
            ),
            "staging",
        );

        let cfg = load_config_from(dir.path(), "staging").unwrap();
        assert_eq!(cfg.environment, "staging");
        assert_eq!(cfg.low_stock_threshold, 3);
        assert_eq!(cfg.free_shipping_threshold, dec!(1500));
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn invalid_profile_fails_validation() {
        let dir = write_config(
            &format!(
                r#"
                jwt_secret = "{SECRET}"
                log_level = "loud"
                "#
            ),
            "broken",
        );

        let result = load_config_from(dir.path(), "broken");
        assert!(matches!(result, Err(AppConfigError::Validation(_))));
    }
}
