use secrecy::Secret;
use service_core::config::{self as core_config, get_env, Environment};
use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub mongodb: MongoConfig,
    pub jwt: JwtConfig,
    pub checkout: CheckoutConfig,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// ISO currency code stamped on sessions and bookings.
    pub currency: String,
}

impl MarketplaceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let environment = Environment::current();

        let log_level = get_env("LOG_LEVEL", Some(&common.log_level), environment)?;
        let otlp_endpoint = std::env::var("OTLP_ENDPOINT")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| common.otlp_endpoint.clone());

        let currency = get_env("CHECKOUT_CURRENCY", Some("INR"), environment)?;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "CHECKOUT_CURRENCY must be a three-letter code, got '{}'",
                currency
            )));
        }

        Ok(Self {
            common,
            environment,
            service_name: get_env("SERVICE_NAME", Some("marketplace-service"), environment)?,
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level,
            otlp_endpoint,
            mongodb: MongoConfig {
                uri: Secret::new(get_env(
                    "MONGODB_URI",
                    Some("mongodb://localhost:27017"),
                    environment,
                )?),
                database: get_env("MONGODB_DATABASE", Some("marketplace_db"), environment)?,
            },
            jwt: JwtConfig {
                secret: Secret::new(get_env("JWT_SECRET", None, environment)?),
            },
            checkout: CheckoutConfig { currency },
            allowed_origins: get_env(
                "ALLOWED_ORIGINS",
                Some("http://localhost:3000"),
                environment,
            )?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        })
    }
}
