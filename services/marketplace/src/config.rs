use serde::{Deserialize, Serialize};
use workup_common::{env_or, env_parse, CoinPolicy, DatabaseConfig, JwtConfig, ServerConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub coins: CoinPolicy,
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Events buffered per connected user before slow readers start lagging.
    pub channel_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env_or("SERVER_HOST", "0.0.0.0"),
                port: env_parse("SERVER_PORT", 8080),
                cors_origins: env_or("CORS_ORIGINS", "http://localhost:5173")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            database: DatabaseConfig::from_env(),
            jwt: JwtConfig::from_env(),
            coins: CoinPolicy::from_env(),
            stream: StreamConfig {
                channel_capacity: env_parse("STREAM_CHANNEL_CAPACITY", 64usize).max(1),
            },
        }
    }
}
