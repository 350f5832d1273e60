//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TAMARIND_API_BASE_URL` - Base URL of the commerce REST API
//! - `TAMARIND_GATEWAY_BASE_URL` - Base URL of the card-payment gateway
//! - `TAMARIND_GATEWAY_PUBLISHABLE_KEY` - Gateway publishable key
//!
//! ## Optional
//! - `TAMARIND_CURRENCY` - ISO 4217 currency code (default: usd)
//! - `TAMARIND_STORAGE_PATH` - Path for the device-local JSON store
//! - `TAMARIND_AUDIT_WEBHOOK_URL` - Endpoint for transaction notifications
//! - `TAMARIND_AUDIT_TOKEN` - Bearer token for the audit endpoint

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use tamarind_core::CurrencyCode;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the commerce REST API.
    pub api_base_url: Url,
    /// Payment gateway configuration.
    pub gateway: GatewayConfig,
    /// Currency the storefront charges in.
    pub currency: CurrencyCode,
    /// Path for the device-local JSON store. `None` keeps state in memory.
    pub storage_path: Option<PathBuf>,
    /// Audit webhook configuration, absent when auditing is disabled.
    pub audit: Option<AuditConfig>,
}

/// Card-payment gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway API.
    pub base_url: Url,
    /// Publishable key identifying this storefront to the gateway.
    pub publishable_key: String,
}

/// Transaction audit webhook configuration.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Endpoint the transaction notices are POSTed to.
    pub webhook_url: Url,
    /// Optional bearer token for the endpoint.
    pub token: Option<SecretString>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_url("TAMARIND_API_BASE_URL")?;
        let gateway = GatewayConfig {
            base_url: get_url("TAMARIND_GATEWAY_BASE_URL")?,
            publishable_key: get_required_env("TAMARIND_GATEWAY_PUBLISHABLE_KEY")?,
        };
        let currency = parse_currency(&get_env_or_default("TAMARIND_CURRENCY", "usd"))?;
        let storage_path = get_optional_env("TAMARIND_STORAGE_PATH").map(PathBuf::from);

        let audit = match get_optional_env("TAMARIND_AUDIT_WEBHOOK_URL") {
            Some(raw) => Some(AuditConfig {
                webhook_url: parse_url("TAMARIND_AUDIT_WEBHOOK_URL", &raw)?,
                token: get_optional_env("TAMARIND_AUDIT_TOKEN").map(SecretString::from),
            }),
            None => None,
        };

        Ok(Self {
            api_base_url,
            gateway,
            currency,
            storage_path,
            audit,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a required environment variable parsed as a URL.
fn get_url(key: &str) -> Result<Url, ConfigError> {
    let raw = get_required_env(key)?;
    parse_url(key, &raw)
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_currency(raw: &str) -> Result<CurrencyCode, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "usd" => Ok(CurrencyCode::USD),
        "eur" => Ok(CurrencyCode::EUR),
        "gbp" => Ok(CurrencyCode::GBP),
        "cad" => Ok(CurrencyCode::CAD),
        "aud" => Ok(CurrencyCode::AUD),
        other => Err(ConfigError::InvalidEnvVar(
            "TAMARIND_CURRENCY".to_string(),
            format!("unsupported currency: {other}"),
        )),
    }
}
