use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    db::GameDataStore,
    error::{AppError, Result},
    models::{ActionEffect, ActionOutcome, GameAction, Payload, PlayerRecord, PlayerSnapshot},
    utils::normalize_address,
};

use super::dispatcher::GameActionDispatcher;

/// Keeps each connected wallet and its persisted progress record pointing at the same player.
/// Any number of wallets may be connected at once; each one only ever touches its own record.
pub struct SessionBridge {
    store: Arc<dyn GameDataStore>,
    dispatcher: Arc<GameActionDispatcher>,
    active: RwLock<HashSet<String>>,
}

fn parse_player(address: &str) -> Result<String> {
    normalize_address(address)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid wallet address '{}'", address)))
}

impl SessionBridge {
    pub fn new(store: Arc<dyn GameDataStore>, dispatcher: Arc<GameActionDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            active: RwLock::new(HashSet::new()),
        }
    }

    #[cfg(test)]
    pub async fn is_active(&self, address: &str) -> bool {
        match normalize_address(address) {
            Some(player) => self.active.read().await.contains(&player),
            None => false,
        }
    }

    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    pub async fn activate(&self, address: &str) -> Result<PlayerRecord> {
        let player = parse_player(address)?;
        let record = match self.store.load(&player).await? {
            Some(record) => record,
            None => {
                tracing::info!("Creating progress record for {}", player);
                let record = PlayerRecord::new(&player);
                self.store.save(&player, &record).await?;
                record
            }
        };
        if let Some(claimed_at) = record.last_daily_claim {
            self.dispatcher.record_claim(&player, claimed_at).await;
        }

        if self.active.write().await.insert(player.clone()) {
            tracing::info!("Session for {} opened", player);
        }
        Ok(record)
    }

    /// Closes one wallet's session; returns whether it was open.
    pub async fn deactivate(&self, address: &str) -> Result<bool> {
        let player = parse_player(address)?;
        let closed = self.active.write().await.remove(&player);
        if closed {
            tracing::info!("Session for {} closed", player);
        }
        Ok(closed)
    }

    async fn ensure_active(&self, player: &str) -> Result<()> {
        if self.active.read().await.contains(player) {
            return Ok(());
        }
        Err(AppError::NoActiveSession)
    }

    pub async fn load(&self, address: &str) -> Result<PlayerRecord> {
        let player = parse_player(address)?;
        self.store
            .load(&player)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No progress stored for {}", player)))
    }

    pub async fn save(&self, address: &str, mut record: PlayerRecord) -> Result<PlayerRecord> {
        let player = parse_player(address)?;
        self.ensure_active(&player).await?;
        let owner = normalize_address(&record.player).unwrap_or_default();
        if owner != player {
            return Err(AppError::IdentityMismatch(format!(
                "record belongs to '{}', not {}",
                record.player, player
            )));
        }
        record.player = player.clone();
        record.updated_at = Utc::now();
        self.store.save(&player, &record).await?;
        Ok(record)
    }

    /// Overwrites a connected player's stored stats with an on-chain snapshot.
    pub async fn sync_snapshot(
        &self,
        address: &str,
        snapshot: &PlayerSnapshot,
    ) -> Result<Option<PlayerRecord>> {
        let player = parse_player(address)?;
        if self.ensure_active(&player).await.is_err() {
            return Ok(None);
        }
        let mut record = self
            .store
            .load(&player)
            .await?
            .unwrap_or_else(|| PlayerRecord::new(&player));
        record.apply_snapshot(snapshot);
        self.store.save(&player, &record).await?;
        Ok(Some(record))
    }

    /// Folds a resolved action into a connected player's record. No-op for other players and failures.
    pub async fn apply_outcome(
        &self,
        address: &str,
        action: &GameAction,
        outcome: &ActionOutcome,
    ) -> Result<Option<PlayerRecord>> {
        let player = parse_player(address)?;
        if self.ensure_active(&player).await.is_err() {
            return Ok(None);
        }
        let Some(Payload::Write(result)) = outcome.payload() else {
            return Ok(None);
        };
        let mut record = self
            .store
            .load(&player)
            .await?
            .unwrap_or_else(|| PlayerRecord::new(&player));

        if matches!(action, GameAction::ClaimDailyReward) {
            record.last_daily_claim = Some(Utc::now());
        }
        match &result.effect {
            Some(ActionEffect::AreaChanged { area }) => record.current_area = area.clone(),
            Some(ActionEffect::ItemMinted { token_id, item_type }) => {
                record.inventory.push(format!("{}#{}", item_type, token_id));
            }
            Some(ActionEffect::RewardClaimed { coins: Some(coins) }) => {
                record.coins = record.coins.saturating_add(*coins);
            }
            Some(ActionEffect::Attacked {
                reward: Some(reward),
                ..
            }) => {
                record.coins = record.coins.saturating_add(*reward);
            }
            _ => {}
        }
        record.updated_at = Utc::now();

        self.store.save(&player, &record).await?;
        Ok(Some(record))
    }
}
