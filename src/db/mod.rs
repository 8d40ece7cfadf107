use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{
    constants::REDIS_PLAYER_KEY_PREFIX,
    error::Result,
    models::PlayerRecord,
};

/// Key/value store for game progress, keyed by normalized player address.
#[async_trait]
pub trait GameDataStore: Send + Sync {
    async fn load(&self, player: &str) -> Result<Option<PlayerRecord>>;
    async fn save(&self, player: &str, record: &PlayerRecord) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, PlayerRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameDataStore for MemoryStore {
    async fn load(&self, player: &str) -> Result<Option<PlayerRecord>> {
        Ok(self.records.read().await.get(player).cloned())
    }

    async fn save(&self, player: &str, record: &PlayerRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(player.to_string(), record.clone());
        Ok(())
    }
}

/// Records stored as JSON strings.
#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

pub fn player_key(player: &str) -> String {
    format!("{}{}", REDIS_PLAYER_KEY_PREFIX, player)
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl GameDataStore for RedisStore {
    async fn load(&self, player: &str) -> Result<Option<PlayerRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(player_key(player)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, player: &str, record: &PlayerRecord) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(record)?;
        let _: () = conn.set(player_key(player), json).await?;
        Ok(())
    }
}
