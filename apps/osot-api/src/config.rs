//! Runtime configuration read from the environment
//!
//! Unset values fall back to development defaults with a warning

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::infrastructure::dataverse::ClientCredentials;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("{name} is required when {because} is set")]
    Missing {
        name: &'static str,
        because: &'static str,
    },
}

const DEV_JWT_SECRET: &str = "dev-secret-key";

/// Settings for the OSOT API process
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    /// Platform Web API root, e.g. `https://org.crm3.dynamics.com/api/data/v9.2`.
    /// `None` runs against the in-memory platform.
    pub dataverse_url: Option<String>,
    pub dataverse_credentials: Option<ClientCredentials>,
    pub cache_ttl: Duration,
    pub registration_ttl: Duration,
    pub registration_max_attempts: u32,
    pub login_max_attempts: u32,
    pub login_lockout: Duration,
    pub admin_email: String,
    /// Base URL of the member-facing site, used in e-mail links
    pub public_url: String,
    pub mail_webhook_url: Option<String>,
    /// Allowed browser origins; empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiry_hours: 8,
            dataverse_url: None,
            dataverse_credentials: None,
            cache_ttl: Duration::from_secs(300),
            registration_ttl: Duration::from_secs(72 * 3600),
            registration_max_attempts: 3,
            login_max_attempts: 5,
            login_lockout: Duration::from_secs(900),
            admin_email: "admin@osot.local".to_string(),
            public_url: "http://localhost:5173".to_string(),
            mail_webhook_url: None,
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Reads configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which returns a variable's value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, using development secret");
            DEV_JWT_SECRET.to_string()
        });

        let dataverse_url = get("DATAVERSE_URL").map(|url| url.trim_end_matches('/').to_string());
        if dataverse_url.is_none() {
            tracing::warn!("DATAVERSE_URL not set, using in-memory data platform");
        }

        let dataverse_credentials = match get("DATAVERSE_CLIENT_ID") {
            Some(client_id) => Some(ClientCredentials {
                token_url: get("DATAVERSE_TOKEN_URL").ok_or(ConfigError::Missing {
                    name: "DATAVERSE_TOKEN_URL",
                    because: "DATAVERSE_CLIENT_ID",
                })?,
                client_id,
                client_secret: get("DATAVERSE_CLIENT_SECRET").ok_or(ConfigError::Missing {
                    name: "DATAVERSE_CLIENT_SECRET",
                    because: "DATAVERSE_CLIENT_ID",
                })?,
                scope: get("DATAVERSE_SCOPE")
                    .or_else(|| dataverse_url.as_ref().map(|url| default_scope(url)))
                    .unwrap_or_default(),
            }),
            None => None,
        };

        let cors_origins = get("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr: parse_or(&get, "BIND_ADDR", defaults.bind_addr)?,
            jwt_secret,
            jwt_expiry_hours: parse_or(&get, "JWT_EXPIRY_HOURS", defaults.jwt_expiry_hours)?,
            dataverse_url,
            dataverse_credentials,
            cache_ttl: secs_or(&get, "CACHE_TTL_SECS", defaults.cache_ttl)?,
            registration_ttl: secs_or(&get, "REGISTRATION_TTL_SECS", defaults.registration_ttl)?,
            registration_max_attempts: parse_or(
                &get,
                "REGISTRATION_MAX_ATTEMPTS",
                defaults.registration_max_attempts,
            )?,
            login_max_attempts: parse_or(&get, "LOGIN_MAX_ATTEMPTS", defaults.login_max_attempts)?,
            login_lockout: secs_or(&get, "LOGIN_LOCKOUT_SECS", defaults.login_lockout)?,
            admin_email: get("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            public_url: get("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_url),
            mail_webhook_url: get("MAIL_WEBHOOK_URL"),
            cors_origins,
        })
    }
}

/// `https://org.crm3.dynamics.com/api/data/v9.2` -> `https://org.crm3.dynamics.com/.default`
fn default_scope(url: &str) -> String {
    let origin = url.split("/api/").next().unwrap_or(url);
    format!("{}/.default", origin)
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

fn secs_or<G>(get: &G, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, name, default.as_secs()).map(Duration::from_secs)
}
