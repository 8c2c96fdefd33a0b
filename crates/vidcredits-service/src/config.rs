//! Service configuration.

use serde::Deserialize;
use std::path::Path;
use vidcredits_core::PricingConfig;

use crate::crypto::{
    DEFAULT_PASSWORD_ITERATIONS, MAX_PASSWORD_ITERATIONS, MIN_PASSWORD_ITERATIONS,
};

/// Default Stripe API base.
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Default generation provider model.
pub const DEFAULT_GENERATION_MODEL: &str = "replicate/google/veo-3";

/// Longest accepted session lifetime (one year).
pub const MAX_JWT_TTL_HOURS: i64 = 24 * 365;

/// Which store backend to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Durable `RocksDB` store under `data_dir`.
    Rocks,
    /// Process-local store; data is lost on restart.
    Memory,
}

impl StorageBackend {
    /// Name reported by the health endpoint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rocks => "rocksdb",
            Self::Memory => "memory",
        }
    }

    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Self::Memory,
            "rocksdb" | "rocks" => Self::Rocks,
            other => {
                tracing::warn!(value = %other, "Unknown STORAGE_BACKEND, using rocksdb");
                Self::Rocks
            }
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Store backend (default: rocksdb).
    pub storage_backend: StorageBackend,

    /// Path to `RocksDB` data directory (default: "/data/vidcredits").
    pub data_dir: String,

    /// HS256 signing secret for session tokens.
    pub jwt_secret: String,

    /// Session token lifetime in hours (default: 720).
    pub jwt_ttl_hours: i64,

    /// Server-side secret mixed into every password hash.
    pub password_pepper: String,

    /// PBKDF2 rounds for new password hashes (default: 100000).
    pub password_hash_iterations: u32,

    /// Stripe API key (optional).
    pub stripe_api_key: Option<String>,

    /// Stripe webhook secret (optional).
    pub stripe_webhook_secret: Option<String>,

    /// Stripe API base URL.
    pub stripe_api_base: String,

    /// Frontend URL for checkout redirects.
    pub frontend_url: String,

    /// Generation provider base URL (optional).
    pub generation_api_url: Option<String>,

    /// Generation provider API key (optional).
    pub generation_api_key: Option<String>,

    /// Model requested from the generation provider.
    pub generation_model: String,

    /// Value for the provider's `CustomerId` header (optional).
    pub generation_customer_id: Option<String>,

    /// Upper bound on one generation call, in seconds.
    pub generation_timeout_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Pricing configuration.
    pub pricing: PricingConfig,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    api_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        // Try to load Stripe secrets from file first, then fall back to env vars
        let (stripe_api_key, stripe_webhook_secret) = load_stripe_secrets();

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set - using an insecure development secret");
            defaults.jwt_secret.clone()
        });

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            storage_backend: std::env::var("STORAGE_BACKEND")
                .map_or(defaults.storage_backend, |v| StorageBackend::parse(&v)),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            jwt_secret,
            jwt_ttl_hours: env_parse::<i64>("JWT_TTL_HOURS")
                .map_or(defaults.jwt_ttl_hours, |h| h.clamp(1, MAX_JWT_TTL_HOURS)),
            password_pepper: std::env::var("PASSWORD_PEPPER").unwrap_or(defaults.password_pepper),
            password_hash_iterations: env_parse::<u32>("PASSWORD_HASH_ITERATIONS").map_or(
                defaults.password_hash_iterations,
                |n| n.clamp(MIN_PASSWORD_ITERATIONS, MAX_PASSWORD_ITERATIONS),
            ),
            stripe_api_key,
            stripe_webhook_secret,
            stripe_api_base: std::env::var("STRIPE_API_BASE").unwrap_or(defaults.stripe_api_base),
            frontend_url: std::env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            generation_api_url: std::env::var("GENERATION_API_URL").ok(),
            generation_api_key: std::env::var("GENERATION_API_KEY").ok(),
            generation_model: std::env::var("GENERATION_MODEL")
                .unwrap_or(defaults.generation_model),
            generation_customer_id: std::env::var("GENERATION_CUSTOMER_ID").ok(),
            generation_timeout_seconds: env_parse("GENERATION_TIMEOUT_SECONDS")
                .unwrap_or(defaults.generation_timeout_seconds),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            pricing: PricingConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Load Stripe secrets from file or environment.
fn load_stripe_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/stripe.json",
        "vidcredits/.secrets/stripe.json",
        "../.secrets/stripe.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(path) {
            tracing::info!(path = %path, "Loaded Stripe secrets from file");
            return (Some(secrets.api_key), secrets.webhook_secret);
        }
    }

    // Fall back to environment variables
    tracing::debug!("Stripe secrets file not found, using environment variables");
    (
        std::env::var("STRIPE_API_KEY").ok(),
        std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            storage_backend: StorageBackend::Rocks,
            data_dir: "/data/vidcredits".into(),
            jwt_secret: "vidcredits-dev-secret".into(),
            jwt_ttl_hours: 24 * 30,
            password_pepper: String::new(),
            password_hash_iterations: DEFAULT_PASSWORD_ITERATIONS,
            stripe_api_key: None,
            stripe_webhook_secret: None,
            stripe_api_base: DEFAULT_STRIPE_API_BASE.into(),
            frontend_url: "http://localhost:3000".into(),
            generation_api_url: None,
            generation_api_key: None,
            generation_model: DEFAULT_GENERATION_MODEL.into(),
            generation_customer_id: None,
            generation_timeout_seconds: 300,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 330,
            pricing: PricingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parsing() {
        assert_eq!(StorageBackend::parse("memory"), StorageBackend::Memory);
        assert_eq!(StorageBackend::parse(" RocksDB "), StorageBackend::Rocks);
        assert_eq!(StorageBackend::parse("postgres"), StorageBackend::Rocks);
    }

    #[test]
    fn request_timeout_outlives_generation_timeout() {
        let config = ServiceConfig::default();
        assert!(config.request_timeout_seconds > config.generation_timeout_seconds);
        assert_eq!(config.jwt_ttl_hours, 720);
    }

    #[test]
    fn out_of_range_env_values_are_clamped() {
        std::env::set_var("JWT_TTL_HOURS", i64::MAX.to_string());
        std::env::set_var("PASSWORD_HASH_ITERATIONS", "1");
        let config = ServiceConfig::from_env();
        std::env::remove_var("JWT_TTL_HOURS");
        std::env::remove_var("PASSWORD_HASH_ITERATIONS");

        assert_eq!(config.jwt_ttl_hours, MAX_JWT_TTL_HOURS);
        assert_eq!(config.password_hash_iterations, MIN_PASSWORD_ITERATIONS);
    }

    #[test]
    fn storage_backend_names() {
        assert_eq!(StorageBackend::Rocks.as_str(), "rocksdb");
        assert_eq!(StorageBackend::Memory.as_str(), "memory");
    }
}
