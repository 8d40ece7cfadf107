use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::STARTING_AREA;

use super::game::PlayerSnapshot;

/// Persisted game progress for one player key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player: String,
    pub level: u64,
    pub experience: u64,
    pub coins: u64,
    pub damage: u64,
    pub auto_damage: u64,
    pub current_area: String,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub last_daily_claim: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerRecord {
    pub fn new(player: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            level: 1,
            experience: 0,
            coins: 0,
            damage: 1,
            auto_damage: 0,
            current_area: STARTING_AREA.to_string(),
            inventory: Vec::new(),
            last_daily_claim: None,
            updated_at: Utc::now(),
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: &PlayerSnapshot) {
        self.level = snapshot.level;
        self.experience = self.experience.max(snapshot.experience);
        self.coins = snapshot.coins;
        self.damage = snapshot.damage;
        self.auto_damage = snapshot.auto_damage;
        self.current_area = snapshot.current_area.clone();
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
