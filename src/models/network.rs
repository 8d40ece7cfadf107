use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::constants::{
    ALCHEMY_URL_TEMPLATE, INFURA_URL_TEMPLATE, PUBLIC_RPC_HOLESKY, PUBLIC_RPC_LOCALHOST,
    PUBLIC_RPC_MAINNET, PUBLIC_RPC_SEPOLIA,
};

/// Backend families, listed in fallback priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Alchemy,
    Infura,
    Public,
}

impl ProviderKind {
    pub fn requires_credential(self) -> bool {
        !matches!(self, ProviderKind::Public)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProviderKind::Alchemy => "alchemy",
            ProviderKind::Infura => "infura",
            ProviderKind::Public => "public",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub kind: ProviderKind,
    pub credential: Option<String>,
    /// Explicit endpoint; only used by the public backend.
    pub endpoint: Option<String>,
    pub probe_timeout: Duration,
}

impl ProviderSpec {
    pub fn keyed(kind: ProviderKind, credential: Option<String>, probe_timeout: Duration) -> Self {
        Self {
            kind,
            credential,
            endpoint: None,
            probe_timeout,
        }
    }

    pub fn public(endpoint: Option<String>, probe_timeout: Duration) -> Self {
        Self {
            kind: ProviderKind::Public,
            credential: None,
            endpoint,
            probe_timeout,
        }
    }

    /// Cheap precheck run before any network traffic.
    pub fn is_usable(&self) -> bool {
        if self.kind.requires_credential() {
            return self
                .credential
                .as_deref()
                .map(|value| !is_placeholder_credential(value))
                .unwrap_or(false);
        }
        true
    }

    pub fn resolve_url(&self, network: &str) -> Option<String> {
        match self.kind {
            ProviderKind::Alchemy => {
                let key = self.credential.as_deref()?.trim();
                Some(
                    ALCHEMY_URL_TEMPLATE
                        .replace("{network}", network)
                        .replace("{key}", key),
                )
            }
            ProviderKind::Infura => {
                let key = self.credential.as_deref()?.trim();
                Some(
                    INFURA_URL_TEMPLATE
                        .replace("{network}", network)
                        .replace("{key}", key),
                )
            }
            ProviderKind::Public => self
                .endpoint
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .or_else(|| default_public_endpoint(network).map(str::to_string)),
        }
    }
}

/// Network identifier plus providers in priority order. Built once at startup.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: String,
    pub providers: Vec<ProviderSpec>,
}

impl NetworkConfig {
    pub fn new(network: impl Into<String>, providers: Vec<ProviderSpec>) -> Self {
        Self {
            network: network.into(),
            providers,
        }
    }
}

pub fn default_public_endpoint(network: &str) -> Option<&'static str> {
    match network.trim().to_ascii_lowercase().as_str() {
        "mainnet" => Some(PUBLIC_RPC_MAINNET),
        "sepolia" => Some(PUBLIC_RPC_SEPOLIA),
        "holesky" => Some(PUBLIC_RPC_HOLESKY),
        "localhost" => Some(PUBLIC_RPC_LOCALHOST),
        _ => None,
    }
}

pub fn is_placeholder_credential(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    lower.is_empty()
        || lower.starts_with("your")
        || lower.contains("api_key_here")
        || lower.contains("changeme")
        || lower.contains("placeholder")
        || lower.contains("xxx")
        || lower == "demo"
}

pub fn is_placeholder_address(value: &str) -> bool {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    digits.is_empty() || digits.chars().all(|c| c == '0')
}
