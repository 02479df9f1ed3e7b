//! Process configuration, read once at startup.
//!
//! Values come from environment variables (after loading `.env` if present).
//! [`AppConfig::from_lookup`] takes any key lookup so tests never touch the
//! process environment.

use core::str::FromStr;
use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use sprintspace_auth::StaticCredentials;
use sprintspace_observability::LogFormat;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3008";
pub const DEFAULT_JWT_SECRET: &str = "dev-secret";

/// Where the auth guard looks for the token.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum AuthTransport {
    /// HTTP-only `token` cookie, set by `/jwt` and `/login`.
    #[default]
    Cookie,
    /// `Authorization` header (`Bearer <token>` or the bare token).
    Header,
}

impl FromStr for AuthTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "header" | "bearer" => Ok(Self::Header),
            other => Err(format!("expected \"cookie\" or \"header\", got {other:?}")),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub auth_transport: AuthTransport,
    pub cookie_secure: bool,
    pub events_page_size: u32,
    pub running_events_limit: u32,
    pub login: Option<StaticCredentials>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut bind_addr: SocketAddr = parse_or(&get, "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        if let Some(port) = get("PORT") {
            let port = port
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("PORT", e.to_string()))?;
            bind_addr.set_port(port);
        }

        let production = get("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));

        let login = match (get("LOGIN_EMAIL"), get("LOGIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(StaticCredentials::new(email, password)),
            (None, None) => None,
            _ => {
                return Err(ConfigError::invalid(
                    "LOGIN_EMAIL",
                    "LOGIN_EMAIL and LOGIN_PASSWORD must be set together",
                ));
            }
        };

        let token_ttl_hours: i64 = parse_or(&get, "TOKEN_TTL_HOURS", Some(5))?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::invalid("TOKEN_TTL_HOURS", "must be positive"));
        }

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            database_max_connections: positive(&get, "DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret: get("JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
            token_ttl: Duration::hours(token_ttl_hours),
            auth_transport: parse_or(&get, "AUTH_TRANSPORT", Some(AuthTransport::Cookie))?,
            cookie_secure: parse_or(&get, "COOKIE_SECURE", Some(production))?,
            events_page_size: positive(&get, "EVENTS_PAGE_SIZE", 9)?,
            running_events_limit: positive(&get, "RUNNING_EVENTS_LIMIT", 6)?,
            login,
            log_format: match get("LOG_FORMAT") {
                Some(raw) => raw
                    .parse()
                    .map_err(|e: sprintspace_observability::UnknownLogFormat| {
                        ConfigError::invalid("LOG_FORMAT", e.to_string())
                    })?,
                None => LogFormat::default(),
            },
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::invalid(key, e.to_string())),
        None => default.ok_or_else(|| ConfigError::invalid(key, "missing")),
    }
}

fn positive<G>(get: &G, key: &'static str, default: u32) -> Result<u32, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value: u32 = parse_or(get, key, Some(default))?;
    if value == 0 {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}
