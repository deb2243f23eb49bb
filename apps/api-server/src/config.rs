//! Application configuration loaded from environment variables.

use std::env;
use std::net::IpAddr;

use yatube_infra::DatabaseConfig;
#[cfg(feature = "redis")]
use yatube_infra::RedisConfig;

const DEFAULT_BLOCKED_USER_AGENTS: &str = "python-requests";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    pub block: BlockConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database: DatabaseConfig::from_env(),
            #[cfg(feature = "redis")]
            redis: env::var("REDIS_URL").ok().map(|_| RedisConfig::from_env()),
            block: BlockConfig::from_env(),
        }
    }
}

/// Who gets turned away before reaching any handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockConfig {
    /// Case-insensitive substrings of the `User-Agent` header.
    pub user_agents: Vec<String>,
    pub ips: Vec<IpAddr>,
}

impl BlockConfig {
    /// `BLOCKED_USER_AGENTS` and `BLOCKED_IPS`, both comma-separated.
    pub fn from_env() -> Self {
        let agents = env::var("BLOCKED_USER_AGENTS")
            .unwrap_or_else(|_| DEFAULT_BLOCKED_USER_AGENTS.to_string());
        let ips = env::var("BLOCKED_IPS").unwrap_or_default();
        Self::parse(&agents, &ips)
    }

    pub fn parse(user_agents: &str, ips: &str) -> Self {
        let user_agents = split_list(user_agents)
            .map(|agent| agent.to_lowercase())
            .collect();
        let ips = split_list(ips)
            .filter_map(|ip| match ip.parse() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    tracing::warn!(value = %ip, "Ignoring unparsable BLOCKED_IPS entry");
                    None
                }
            })
            .collect();

        Self { user_agents, ips }
    }

    pub fn is_empty(&self) -> bool {
        self.user_agents.is_empty() && self.ips.is_empty()
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}
