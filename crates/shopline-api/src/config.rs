//! Server configuration.
//!
//! Loaded from a TOML file, then overridden by `SHOPLINE_*` environment
//! variables. Every section has defaults, so an absent file is fine; the
//! JWT secret is the one value that must be supplied.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use shopline_auth::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS};
use shopline_commerce::checkout::ShippingPolicy;
use shopline_commerce::Currency;

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "shopline.toml";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Currency and shipping.
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub payment: PaymentConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Accounts ensured at startup.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl Config {
    /// Load config from a file, falling back to defaults if it doesn't exist.
    ///
    /// Environment overrides are applied and the result validated.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Apply `SHOPLINE_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("SHOPLINE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SHOPLINE_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid SHOPLINE_PORT value: {}", port))?;
        }
        if let Some(url) = lookup("SHOPLINE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(secret) = lookup("SHOPLINE_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(format) = lookup("SHOPLINE_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "human" => LogFormat::Human,
                other => bail!("Invalid SHOPLINE_LOG_FORMAT value: {}", other),
            };
        }
        Ok(())
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            bail!("auth.jwt_secret must be set (or SHOPLINE_JWT_SECRET)");
        }
        if self.auth.access_ttl_secs <= 0 || self.auth.refresh_ttl_secs <= 0 {
            bail!("token lifetimes must be positive");
        }
        self.currency()?;
        if self.store.shipping_fee_cents < 0 || self.store.free_shipping_threshold_cents < 0 {
            bail!("shipping amounts cannot be negative");
        }
        if let (Some(_), None) | (None, Some(_)) = (
            &self.bootstrap.admin_email,
            &self.bootstrap.admin_password,
        ) {
            bail!("bootstrap.admin_email and bootstrap.admin_password go together");
        }
        Ok(())
    }

    /// Store currency.
    pub fn currency(&self) -> Result<Currency> {
        Currency::from_code(&self.store.currency)
            .with_context(|| format!("Unsupported currency: {}", self.store.currency))
    }

    pub fn shipping_policy(&self) -> Result<ShippingPolicy> {
        Ok(ShippingPolicy::new(
            self.currency()?,
            self.store.shipping_fee_cents,
            self.store.free_shipping_threshold_cents,
        ))
    }

    /// Socket address to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL (e.g. `sqlite://shopline.db`).
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://shopline.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens.
    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,

    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,

    /// `iss` claim.
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
            issuer: default_issuer(),
        }
    }
}

fn default_access_ttl() -> i64 {
    DEFAULT_ACCESS_TTL_SECS
}

fn default_refresh_ttl() -> i64 {
    DEFAULT_REFRESH_TTL_SECS
}

fn default_issuer() -> String {
    "shopline".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// ISO currency code all prices are in.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Flat shipping fee per order.
    #[serde(default = "default_shipping_fee")]
    pub shipping_fee_cents: i64,

    /// Subtotal from which shipping is free. Zero disables free shipping.
    #[serde(default)]
    pub free_shipping_threshold_cents: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            shipping_fee_cents: default_shipping_fee(),
            free_shipping_threshold_cents: 0,
        }
    }
}

fn default_currency() -> String {
    "BDT".to_string()
}

fn default_shipping_fee() -> i64 {
    6000
}

/// Which payment gateway to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    #[default]
    Sandbox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub gateway: GatewayKind,

    /// Base of the hosted payment page URLs handed to customers.
    #[serde(default = "default_redirect_base_url")]
    pub redirect_base_url: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayKind::default(),
            redirect_base_url: default_redirect_base_url(),
        }
    }
}

fn default_redirect_base_url() -> String {
    "http://localhost:8080/sandbox/pay".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
}
