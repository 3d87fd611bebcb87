use anyhow::Context;
use serde::Deserialize;

/// Token lifetimes are capped at one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://127.0.0.1:3000,http://localhost:3001,http://127.0.0.1:3001";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
}

/// Where the Postgres pool connects to: either a full URL or discrete parts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub enum DatabaseConfig {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        name: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests do not have to touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret = var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt = JwtConfig {
            secret,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "todolist-app".into()),
            ttl_minutes: parse_or(var("JWT_TTL_MINUTES"), "JWT_TTL_MINUTES", 60 * 24)?,
        };
        anyhow::ensure!(jwt.ttl_minutes > 0, "JWT_TTL_MINUTES must be positive");
        anyhow::ensure!(
            jwt.ttl_minutes <= MAX_TTL_MINUTES,
            "JWT_TTL_MINUTES must be at most {MAX_TTL_MINUTES}"
        );

        let database = match var("DATABASE_URL") {
            Some(url) => DatabaseConfig::Url(url),
            None => DatabaseConfig::Parts {
                host: var("DB_HOST").unwrap_or_else(|| "localhost".into()),
                port: parse_or(var("DB_PORT"), "DB_PORT", 5432)?,
                user: var("DB_USER").unwrap_or_else(|| "postgres".into()),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                name: var("DB_NAME").unwrap_or_else(|| "todolist".into()),
            },
        };

        let cors_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            database,
            db_max_connections: parse_or(var("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
            jwt,
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(var("APP_PORT").or_else(|| var("PORT")), "APP_PORT", 8080)?,
            cors_origins,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}={v}: {e}")),
        None => Ok(default),
    }
}
