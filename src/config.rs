use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CONFIRMATION_TIMEOUT_SECS,
    DEFAULT_DAILY_REWARD_COOLDOWN_HOURS, DEFAULT_MAX_MULTI_ATTACK, DEFAULT_NETWORK,
    DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_PROVIDER_CACHE_TTL_SECS, DEFAULT_RECEIPT_POLL_INTERVAL_MS,
    KNOWN_NETWORKS, MAX_DAILY_REWARD_COOLDOWN_HOURS,
};
use crate::models::network::{is_placeholder_address, is_placeholder_credential};
use crate::models::{NetworkConfig, ProviderKind, ProviderSpec};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Blockchain
    pub network: String,
    pub alchemy_api_key: Option<String>,
    pub infura_api_key: Option<String>,
    pub public_rpc_url: Option<String>,
    pub contract_address: Option<String>,
    pub signer_private_key: Option<String>,

    // Timeouts
    pub probe_timeout_ms: u64,
    pub confirmation_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
    pub call_timeout_secs: u64,
    pub provider_cache_ttl_secs: u64,

    // Game rules
    pub max_multi_attack: u64,
    pub daily_reward_cooldown_hours: i64,

    // Persistence
    pub redis_url: Option<String>,

    // CORS
    pub cors_allowed_origins: String,
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            network: optional_env("NETWORK")
                .unwrap_or_else(|| DEFAULT_NETWORK.to_string())
                .to_ascii_lowercase(),
            alchemy_api_key: optional_env("ALCHEMY_API_KEY"),
            infura_api_key: optional_env("INFURA_API_KEY"),
            public_rpc_url: optional_env("PUBLIC_RPC_URL"),
            contract_address: optional_env("CONTRACT_ADDRESS"),
            signer_private_key: optional_env("GAME_SIGNER_PRIVATE_KEY"),

            probe_timeout_ms: env::var("PROBE_TIMEOUT_MS")
                .unwrap_or_else(|_| DEFAULT_PROBE_TIMEOUT_MS.to_string())
                .parse()?,
            confirmation_timeout_secs: env::var("CONFIRMATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_CONFIRMATION_TIMEOUT_SECS.to_string())
                .parse()?,
            receipt_poll_interval_ms: env::var("RECEIPT_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| DEFAULT_RECEIPT_POLL_INTERVAL_MS.to_string())
                .parse()?,
            call_timeout_secs: env::var("CALL_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_CALL_TIMEOUT_SECS.to_string())
                .parse()?,
            provider_cache_ttl_secs: env::var("PROVIDER_CACHE_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_PROVIDER_CACHE_TTL_SECS.to_string())
                .parse()?,

            max_multi_attack: env::var("MAX_MULTI_ATTACK")
                .unwrap_or_else(|_| DEFAULT_MAX_MULTI_ATTACK.to_string())
                .parse()?,
            daily_reward_cooldown_hours: env::var("DAILY_REWARD_COOLDOWN_HOURS")
                .unwrap_or_else(|_| DEFAULT_DAILY_REWARD_COOLDOWN_HOURS.to_string())
                .parse()?,

            redis_url: optional_env("REDIS_URL"),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    /// Missing credentials or contract address are not errors: they select simulation mode.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.probe_timeout_ms == 0 {
            anyhow::bail!("PROBE_TIMEOUT_MS must be greater than zero");
        }
        if self.confirmation_timeout_secs == 0 {
            anyhow::bail!("CONFIRMATION_TIMEOUT_SECS must be greater than zero");
        }
        if self.max_multi_attack == 0 {
            anyhow::bail!("MAX_MULTI_ATTACK must be greater than zero");
        }
        if self.daily_reward_cooldown_hours > MAX_DAILY_REWARD_COOLDOWN_HOURS {
            anyhow::bail!(
                "DAILY_REWARD_COOLDOWN_HOURS must be at most {}",
                MAX_DAILY_REWARD_COOLDOWN_HOURS
            );
        }

        if let Some(endpoint) = self.public_rpc_url.as_deref() {
            let parsed = url::Url::parse(endpoint)
                .map_err(|e| anyhow::anyhow!("PUBLIC_RPC_URL is not a valid URL: {}", e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("PUBLIC_RPC_URL must use http or https");
            }
        }

        if !KNOWN_NETWORKS.contains(&self.network.as_str()) {
            tracing::warn!(
                "Unknown network '{}'; only keyed providers or PUBLIC_RPC_URL can serve it",
                self.network
            );
        }
        if let Some(key) = self.alchemy_api_key.as_deref() {
            if is_placeholder_credential(key) {
                tracing::warn!("ALCHEMY_API_KEY looks like a placeholder; provider will be skipped");
            }
        }
        if let Some(key) = self.infura_api_key.as_deref() {
            if is_placeholder_credential(key) {
                tracing::warn!("INFURA_API_KEY looks like a placeholder; provider will be skipped");
            }
        }
        match self.contract_address.as_deref() {
            None => tracing::warn!("CONTRACT_ADDRESS not set; running in simulation mode"),
            Some(address) if is_placeholder_address(address) => {
                tracing::warn!("Using placeholder contract address; running in simulation mode")
            }
            Some(_) => {}
        }
        if self.signer_private_key.is_none() {
            tracing::warn!("GAME_SIGNER_PRIVATE_KEY not set; writes will be simulated");
        }
        if self.daily_reward_cooldown_hours <= 0 {
            tracing::warn!("DAILY_REWARD_COOLDOWN_HOURS should be > 0; local cooldown disabled");
        }
        if self.receipt_poll_interval_ms == 0 {
            tracing::warn!("RECEIPT_POLL_INTERVAL_MS is 0; receipts will be polled in a tight loop");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    /// Providers in fixed priority: Alchemy, Infura, public endpoint.
    pub fn network_config(&self) -> NetworkConfig {
        let probe = self.probe_timeout();
        NetworkConfig::new(
            self.network.clone(),
            vec![
                ProviderSpec::keyed(ProviderKind::Alchemy, self.alchemy_api_key.clone(), probe),
                ProviderSpec::keyed(ProviderKind::Infura, self.infura_api_key.clone(), probe),
                ProviderSpec::public(self.public_rpc_url.clone(), probe),
            ],
        )
    }

    /// Contract address when one is deployed, `None` when simulation mode is forced.
    pub fn live_contract_address(&self) -> Option<&str> {
        self.contract_address
            .as_deref()
            .filter(|address| !is_placeholder_address(address))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn provider_cache_ttl(&self) -> Option<Duration> {
        if self.provider_cache_ttl_secs == 0 {
            return None;
        }
        Some(Duration::from_secs(self.provider_cache_ttl_secs))
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            network: "sepolia".to_string(),
            alchemy_api_key: None,
            infura_api_key: None,
            public_rpc_url: None,
            contract_address: None,
            signer_private_key: None,
            probe_timeout_ms: 200,
            confirmation_timeout_secs: 1,
            receipt_poll_interval_ms: 10,
            call_timeout_secs: 1,
            provider_cache_ttl_secs: 0,
            max_multi_attack: DEFAULT_MAX_MULTI_ATTACK,
            daily_reward_cooldown_hours: DEFAULT_DAILY_REWARD_COOLDOWN_HOURS,
            redis_url: None,
            cors_allowed_origins: "*".to_string(),
        }
    }
}
