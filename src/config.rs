use std::time::Duration;

use axum::http::HeaderValue;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("secret `{0}` was not found")]
    Missing(&'static str),

    #[error("secret `{key}` has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub expiry_mins: i64,
}

/// Runtime configuration, resolved once at startup from the secret store.
///
/// | Secret                | Default          |
/// |-----------------------|------------------|
/// | `STORAGE_BACKEND`     | `mongo`          |
/// | `MONGODB_URI`         | required (mongo) |
/// | `DATABASE_NAME`       | `cinema-booking` |
/// | `APP_URL`             | required         |
/// | `JWT_SECRET`          | required         |
/// | `JWT_EXPIRY_MINS`     | `60`             |
/// | `BOOKING_TTL_SECS`    | `900`            |
/// | `SWEEP_INTERVAL_SECS` | `60`             |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub mongodb_uri: Option<String>,
    pub database_name: String,
    pub cors_origin: HeaderValue,
    pub jwt: JwtSettings,
    /// How long a booking may stay IN_PROCESS before the sweeper expires it.
    pub booking_ttl: Duration,
    pub sweep_interval: Duration,
}

impl AppConfig {
    /// Builds the configuration from any key lookup (the shuttle `SecretStore`
    /// in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("mongo") => StorageBackend::Mongo,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let mongodb_uri = lookup("MONGODB_URI");
        if storage == StorageBackend::Mongo && mongodb_uri.is_none() {
            return Err(ConfigError::Missing("MONGODB_URI"));
        }

        let app_url = lookup("APP_URL").ok_or(ConfigError::Missing("APP_URL"))?;
        let cors_origin = app_url
            .parse::<HeaderValue>()
            .map_err(|_| ConfigError::Invalid {
                key: "APP_URL",
                value: app_url.clone(),
            })?;

        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let sweep_secs: u64 = parse_or(&lookup, "SWEEP_INTERVAL_SECS", 60)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "SWEEP_INTERVAL_SECS",
                value: "0".into(),
            });
        }

        Ok(Self {
            storage,
            mongodb_uri,
            database_name: lookup("DATABASE_NAME").unwrap_or_else(|| "cinema-booking".into()),
            cors_origin,
            jwt: JwtSettings {
                secret,
                expiry_mins: parse_or(&lookup, "JWT_EXPIRY_MINS", 60)?,
            },
            booking_ttl: Duration::from_secs(parse_or(&lookup, "BOOKING_TTL_SECS", 900)?),
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
