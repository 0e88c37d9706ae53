use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    pub fn from_env() -> Self {
        Self {
            host: env_or("DATABASE_HOST", "localhost"),
            port: env_parse("DATABASE_PORT", 5432),
            username: env_or("DATABASE_USERNAME", "postgres"),
            password: env_or("DATABASE_PASSWORD", "password"),
            database: env_or("DATABASE_NAME", "artisans"),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: u64,
    pub issuer: String,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env_or("JWT_SECRET", "dev-secret-key-change-in-production"),
            expiration_hours: env_parse("JWT_EXPIRATION_HOURS", 24),
            issuer: env_or("JWT_ISSUER", "workup"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Coin amounts charged to artisans. A fee of zero disables that charge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoinPolicy {
    pub first_message_fee: i32,
    pub deal_confirmation_fee: i32,
}

impl Default for CoinPolicy {
    fn default() -> Self {
        Self {
            first_message_fee: 25,
            deal_confirmation_fee: 25,
        }
    }
}

impl CoinPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            first_message_fee: env_parse("FIRST_MESSAGE_FEE", defaults.first_message_fee).max(0),
            deal_confirmation_fee: env_parse("DEAL_CONFIRMATION_FEE", defaults.deal_confirmation_fee).max(0),
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
