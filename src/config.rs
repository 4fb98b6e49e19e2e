/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, CORS 許可、Auth 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::services::auth::verifier::ASYMMETRIC_ALGORITHMS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    /// `None` only in development: the in-memory store is used instead.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub database_timeout: Duration,
    pub database_reset_on_start: bool,

    pub cors_allowed_origins: Vec<String>,

    pub auth_issuer: String,
    pub auth_audience: String,
    pub auth_jwks_url: String,
    pub auth_algorithms: Vec<Algorithm>,
    pub auth_leeway_seconds: u64,
    pub auth_jwks_cache_ttl: Duration,
    pub auth_jwks_timeout: Duration,
    pub auth_jwks_refresh_interval: Duration,

    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(var("PORT"), 3000, "PORT")?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = var("APP_ENV")
            .map(|v| AppEnv::parse(&v))
            .unwrap_or(AppEnv::Development);

        let database_url = var("DATABASE_URL");
        if database_url.is_none() && app_env.is_production() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        let database_max_connections: u32 = parse_or(
            var("DATABASE_MAX_CONNECTIONS"),
            5,
            "DATABASE_MAX_CONNECTIONS",
        )?;
        if database_max_connections == 0 {
            return Err(ConfigError::Invalid("DATABASE_MAX_CONNECTIONS"));
        }
        let database_timeout = seconds(var("DATABASE_TIMEOUT_SECONDS"), 5, "DATABASE_TIMEOUT_SECONDS")?;
        let database_reset_on_start = match var("DATABASE_RESET_ON_START") {
            None => false,
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("DATABASE_RESET_ON_START"))?,
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let auth_issuer = var("AUTH_ISSUER").ok_or(ConfigError::Missing("AUTH_ISSUER"))?;
        let auth_audience = var("AUTH_AUDIENCE").ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

        let auth_jwks_url = var("AUTH_JWKS_URL").unwrap_or_else(|| {
            format!(
                "{}/.well-known/jwks.json",
                auth_issuer.trim_end_matches('/')
            )
        });

        let auth_algorithms = match var("AUTH_ALGORITHMS") {
            None => vec![Algorithm::RS256],
            Some(v) => parse_algorithms(&v)?,
        };

        let auth_leeway_seconds: u64 =
            parse_or(var("AUTH_LEEWAY_SECONDS"), 0, "AUTH_LEEWAY_SECONDS")?;
        let auth_jwks_cache_ttl = seconds(
            var("AUTH_JWKS_CACHE_TTL_SECONDS"),
            600,
            "AUTH_JWKS_CACHE_TTL_SECONDS",
        )?;
        let auth_jwks_timeout = seconds(
            var("AUTH_JWKS_TIMEOUT_SECONDS"),
            5,
            "AUTH_JWKS_TIMEOUT_SECONDS",
        )?;

        // 0 refetches on every unknown kid.
        let auth_jwks_refresh_interval = Duration::from_secs(parse_or(
            var("AUTH_JWKS_REFRESH_INTERVAL_SECONDS"),
            30,
            "AUTH_JWKS_REFRESH_INTERVAL_SECONDS",
        )?);

        let request_timeout = seconds(var("REQUEST_TIMEOUT_SECONDS"), 30, "REQUEST_TIMEOUT_SECONDS")?;

        Ok(Self {
            addr,
            app_env,
            database_url,
            database_max_connections,
            database_timeout,
            database_reset_on_start,
            cors_allowed_origins,
            auth_issuer,
            auth_audience,
            auth_jwks_url,
            auth_algorithms,
            auth_leeway_seconds,
            auth_jwks_cache_ttl,
            auth_jwks_timeout,
            auth_jwks_refresh_interval,
            request_timeout,
        })
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    default: T,
    key: &'static str,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
    }
}

// Zero would make every call time out (or the cache never hold).
fn seconds(value: Option<String>, default: u64, key: &'static str) -> Result<Duration, ConfigError> {
    match parse_or(value, default, key)? {
        0 => Err(ConfigError::Invalid(key)),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Comma-separated list; only asymmetric algorithms are accepted.
fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let algorithms = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Algorithm::from_str(s).map_err(|_| ConfigError::Invalid("AUTH_ALGORITHMS")))
        .collect::<Result<Vec<_>, _>>()?;

    if algorithms.is_empty() || !algorithms.iter().all(|a| ASYMMETRIC_ALGORITHMS.contains(a)) {
        return Err(ConfigError::Invalid("AUTH_ALGORITHMS"));
    }
    Ok(algorithms)
}
