use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::models::{NetworkConfig, ProviderKind, ProviderSpec};

use super::onchain::{ChainClient, ChainError, Connector};

/// A provider that passed its liveness probe.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub kind: ProviderKind,
    pub block_number: u64,
    pub client: Arc<dyn ChainClient>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("kind", &self.kind)
            .field("block_number", &self.block_number)
            .finish()
    }
}

struct CachedHandle {
    handle: ConnectionHandle,
    selected_at: Instant,
}

/// Tries providers strictly in configured order; first one to answer its probe wins.
pub struct ProviderSelector {
    network: Arc<NetworkConfig>,
    connector: Arc<dyn Connector>,
    cache_ttl: Option<Duration>,
    cached: Mutex<Option<CachedHandle>>,
}

impl ProviderSelector {
    pub fn new(network: Arc<NetworkConfig>, connector: Arc<dyn Connector>) -> Self {
        Self {
            network,
            connector,
            cache_ttl: None,
            cached: Mutex::new(None),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    fn cached_handle(&self) -> Option<ConnectionHandle> {
        let ttl = self.cache_ttl?;
        let guard = self.cached.lock().ok()?;
        guard
            .as_ref()
            .filter(|entry| entry.selected_at.elapsed() < ttl)
            .map(|entry| entry.handle.clone())
    }

    fn remember(&self, handle: &ConnectionHandle) {
        if self.cache_ttl.is_none() {
            return;
        }
        if let Ok(mut guard) = self.cached.lock() {
            *guard = Some(CachedHandle {
                handle: handle.clone(),
                selected_at: Instant::now(),
            });
        }
    }

    /// Drops any cached handle. Called after a live call fails.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = None;
        }
    }

    async fn probe(&self, spec: &ProviderSpec, url: &str) -> Result<ConnectionHandle, ChainError> {
        let attempt = async {
            let client = self.connector.connect(&self.network.network, spec, url).await?;
            let block_number = client.block_number().await?;
            Ok::<_, ChainError>(ConnectionHandle {
                kind: spec.kind,
                block_number,
                client,
            })
        };
        match tokio::time::timeout(spec.probe_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::Timeout(format!(
                "liveness probe exceeded {}ms",
                spec.probe_timeout.as_millis()
            ))),
        }
    }

    /// `None` means no live provider; callers fall back to simulation.
    pub async fn select(&self) -> Option<ConnectionHandle> {
        if let Some(handle) = self.cached_handle() {
            tracing::debug!("Reusing cached {} provider", handle.kind);
            return Some(handle);
        }

        for spec in &self.network.providers {
            if !spec.is_usable() {
                tracing::debug!("Skipping {} provider: credential missing or placeholder", spec.kind);
                continue;
            }
            let Some(url) = spec.resolve_url(&self.network.network) else {
                tracing::debug!(
                    "Skipping {} provider: no endpoint for network {}",
                    spec.kind,
                    self.network.network
                );
                continue;
            };

            match self.probe(spec, &url).await {
                Ok(handle) => {
                    tracing::debug!(
                        "Selected {} provider for {} at block {}",
                        handle.kind,
                        self.network.network,
                        handle.block_number
                    );
                    self.remember(&handle);
                    return Some(handle);
                }
                Err(err) => {
                    tracing::warn!("{} provider failed liveness probe: {}", spec.kind, err);
                }
            }
        }

        tracing::info!(
            "No live provider for network {}; falling back to simulation",
            self.network.network
        );
        None
    }
}
