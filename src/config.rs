use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub ticketmaster: TicketmasterConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS (the web frontend).
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    /// bcrypt work factor. Read from `BCRYPT_COST`, clamped to the range bcrypt accepts.
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketmasterConfig {
    pub api_key: String,
    pub base_url: String,
    /// City searched when the client does not pass `?city=`.
    pub default_city: String,
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for /login and /register
    pub auth_per_second: u32,
    /// Burst size for auth endpoints
    pub auth_burst: u32,
    /// Prune idle per-IP limiter entries once every this many auth requests
    pub sweep_every: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human readable text. Read from `LOG_FORMAT=json`.
    pub json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        // The token secret falls back to the application secret when not set on its own.
        let app_secret = env::var("SECRET_KEY").ok().filter(|s| !s.is_empty());
        let jwt_secret = env::var("JWT_SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .or(app_secret)
            .ok_or_else(|| ConfigError::MissingEnv("JWT_SECRET_KEY".to_string()))?;

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/eventhive.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expiration_minutes: parse_expiration_minutes(
                    env::var("JWT_EXPIRATION_MINUTES").ok().as_deref(),
                )?,
            },
            password: PasswordConfig {
                bcrypt_cost: env::var("BCRYPT_COST")
                    .ok()
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(bcrypt::DEFAULT_COST)
                    .clamp(4, 31),
            },
            ticketmaster: TicketmasterConfig {
                api_key: env::var("TICKETMASTER_API_KEY")
                    .map_err(|_| ConfigError::MissingEnv("TICKETMASTER_API_KEY".to_string()))?,
                base_url: env::var("TICKETMASTER_BASE_URL").unwrap_or_else(|_| {
                    "https://app.ticketmaster.com/discovery/v2".to_string()
                }),
                default_city: env::var("EVENTS_DEFAULT_CITY")
                    .unwrap_or_else(|_| "New York".to_string()),
                page_size: env::var("EVENTS_PAGE_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .unwrap_or(20),
            },
            rate_limit: RateLimitConfig {
                auth_per_second: env::var("RATE_LIMIT_AUTH_PER_SECOND")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
                auth_burst: env::var("RATE_LIMIT_AUTH_BURST")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                sweep_every: env::var("RATE_LIMIT_SWEEP_EVERY")
                    .unwrap_or_else(|_| "256".to_string())
                    .parse()
                    .unwrap_or(256),
            },
            logging: LoggingConfig {
                json: matches!(
                    env::var("LOG_FORMAT").map(|v| v.to_lowercase()).as_deref(),
                    Ok("json")
                ),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Upper bound on access-token lifetime: one year.
const MAX_EXPIRATION_MINUTES: i64 = 365 * 24 * 60;

/// `JWT_EXPIRATION_MINUTES`, defaulting to 15. Must be within 1..=one year.
fn parse_expiration_minutes(raw: Option<&str>) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(15);
    };
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|m| (1..=MAX_EXPIRATION_MINUTES).contains(m))
        .ok_or_else(|| ConfigError::InvalidValue("JWT_EXPIRATION_MINUTES".to_string()))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                frontend_url: "http://localhost:5173".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/eventhive.db".to_string(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: String::new(),
                expiration_minutes: 15,
            },
            password: PasswordConfig {
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
            ticketmaster: TicketmasterConfig {
                api_key: String::new(),
                base_url: "https://app.ticketmaster.com/discovery/v2".to_string(),
                default_city: "New York".to_string(),
                page_size: 20,
            },
            rate_limit: RateLimitConfig {
                auth_per_second: 3,
                auth_burst: 10,
                sweep_every: 256,
            },
            logging: LoggingConfig { json: false },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiration_defaults_when_unset() {
        assert_eq!(parse_expiration_minutes(None).unwrap(), 15);
        assert_eq!(parse_expiration_minutes(Some(" 60 ")).unwrap(), 60);
    }

    #[test]
    fn expiration_out_of_range_is_rejected() {
        for raw in ["0", "-5", "abc", "9223372036854775807", "525601"] {
            assert!(
                matches!(
                    parse_expiration_minutes(Some(raw)),
                    Err(ConfigError::InvalidValue(_))
                ),
                "{:?} must be rejected",
                raw
            );
        }
        assert_eq!(
            parse_expiration_minutes(Some("525600")).unwrap(),
            MAX_EXPIRATION_MINUTES
        );
    }
}
