use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha3::{Digest, Keccak256};

use crate::constants::{
    COINS_PER_LEVEL, EXPERIENCE_PER_LEVEL, KNOWN_AREAS, MONSTERS, SIM_DAILY_REWARD_MAX,
    SIM_DAILY_REWARD_MIN, SIM_DAMAGE_MAX, SIM_DAMAGE_MIN, SIM_DEFEAT_REWARD_MAX,
    SIM_DEFEAT_REWARD_MIN, SIM_MAX_LEVEL, SIM_TOKEN_ID_MAX, SIM_TOKEN_ID_MIN,
};
use crate::models::{ActionEffect, MonsterInfo, Payload, PlayerSnapshot, WriteResult};

use super::onchain::ContractCall;

const SIM_DEFEAT_CHANCE: f64 = 0.1;
const SIM_MAX_ROLLS: u64 = 1_000;

/// Stateless source of plausible game data. Total: every call yields a payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulationOracle;

fn player_seed(player: &str) -> u64 {
    let digest = Keccak256::digest(player.trim().to_ascii_lowercase().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn now_unix() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

impl SimulationOracle {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, call: &ContractCall) -> Payload {
        self.simulate(call)
    }

    pub fn write(&self, call: &ContractCall) -> Payload {
        self.simulate(call)
    }

    pub fn simulate(&self, call: &ContractCall) -> Payload {
        match call {
            ContractCall::GetPlayerData { player } => Payload::Player(self.player_snapshot(player)),
            ContractCall::GetMonster { monster_id } => Payload::Monster(self.monster(*monster_id)),
            ContractCall::RegisterPlayer => Payload::Write(WriteResult::settled(
                None,
                ActionEffect::Registered {
                    already_registered: false,
                },
            )),
            ContractCall::AttackMonster { monster_id } => {
                Payload::Write(WriteResult::settled(None, self.attack(*monster_id, 1)))
            }
            ContractCall::MultiAttack { monster_id, times } => {
                Payload::Write(WriteResult::settled(None, self.attack(*monster_id, *times)))
            }
            ContractCall::ChangeArea { area } => Payload::Write(WriteResult::settled(
                None,
                ActionEffect::AreaChanged { area: area.clone() },
            )),
            ContractCall::MintItem { item_type, .. } => {
                let token_id = rand::rng().random_range(SIM_TOKEN_ID_MIN..=SIM_TOKEN_ID_MAX);
                Payload::Write(WriteResult::settled(
                    None,
                    ActionEffect::ItemMinted {
                        token_id,
                        item_type: item_type.clone(),
                    },
                ))
            }
            ContractCall::ClaimDailyReward => {
                let coins = rand::rng().random_range(SIM_DAILY_REWARD_MIN..=SIM_DAILY_REWARD_MAX);
                Payload::Write(WriteResult::settled(
                    None,
                    ActionEffect::RewardClaimed { coins: Some(coins) },
                ))
            }
        }
    }

    /// Same player key yields the same progression; only the timestamp moves.
    pub fn player_snapshot(&self, player: &str) -> PlayerSnapshot {
        let mut rng = StdRng::seed_from_u64(player_seed(player));
        let level = rng.random_range(1..=SIM_MAX_LEVEL / 3);
        let experience = (level - 1) * EXPERIENCE_PER_LEVEL + rng.random_range(0..EXPERIENCE_PER_LEVEL);
        let coins = rng.random_range(0..=level * COINS_PER_LEVEL);
        let damage = level + rng.random_range(0..=2);
        let auto_damage = level / 3;
        let area_index = ((level - 1) / 2).min(KNOWN_AREAS.len() as u64 - 1) as usize;

        PlayerSnapshot {
            level,
            experience,
            coins,
            damage,
            auto_damage,
            current_area: KNOWN_AREAS[area_index].to_string(),
            last_updated: now_unix(),
        }
    }

    pub fn monster(&self, monster_id: u64) -> MonsterInfo {
        let (name, max_hp, level) = MONSTERS
            .iter()
            .find(|(id, ..)| *id == monster_id)
            .map(|(_, name, max_hp, level)| (name.to_string(), *max_hp, *level))
            .unwrap_or_else(|| {
                let level = monster_id.clamp(1, SIM_MAX_LEVEL);
                (format!("Wild Monster #{}", monster_id), level * 150, level)
            });
        let hp = rand::rng().random_range(1..=max_hp);
        MonsterInfo {
            id: monster_id,
            name,
            hp,
            max_hp,
            level,
        }
    }

    fn attack(&self, monster_id: u64, times: u64) -> ActionEffect {
        let mut rng = rand::rng();
        let rolls = times.clamp(1, SIM_MAX_ROLLS);
        let damage = (0..rolls).fold(0u64, |acc, _| {
            acc.saturating_add(rng.random_range(SIM_DAMAGE_MIN..=SIM_DAMAGE_MAX))
        });
        let defeated = rng.random_bool(SIM_DEFEAT_CHANCE);
        let reward =
            defeated.then(|| rng.random_range(SIM_DEFEAT_REWARD_MIN..=SIM_DEFEAT_REWARD_MAX));
        ActionEffect::Attacked {
            monster_id,
            damage,
            defeated,
            reward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER: &str = "0xAbC0000000000000000000000000000000000dEf";

    #[test]
    fn snapshot_is_within_game_bounds() {
        // Simulated stats stay inside game limits
        let oracle = SimulationOracle::new();
        for suffix in 0..50 {
            let player = format!("0x{:040x}", suffix);
            let snapshot = oracle.player_snapshot(&player);
            assert!(snapshot.level >= 1 && snapshot.level <= SIM_MAX_LEVEL);
            assert!(snapshot.experience >= (snapshot.level - 1) * EXPERIENCE_PER_LEVEL);
            assert!(snapshot.coins <= snapshot.level * COINS_PER_LEVEL);
            assert!(snapshot.damage >= 1);
            assert!(KNOWN_AREAS.contains(&snapshot.current_area.as_str()));
        }
    }

    #[test]
    fn snapshot_is_stable_per_player_and_case_insensitive() {
        // Same player always gets the same simulated stats
        let oracle = SimulationOracle::new();
        let a = oracle.player_snapshot(PLAYER);
        let b = oracle.player_snapshot(&PLAYER.to_ascii_lowercase());
        assert_eq!(a.level, b.level);
        assert_eq!(a.experience, b.experience);
        assert_eq!(a.coins, b.coins);
        assert_eq!(a.current_area, b.current_area);
    }

    #[test]
    fn known_monster_comes_from_table() {
        // Table monsters keep their name and max hp
        let monster = SimulationOracle::new().monster(7);
        assert_eq!(monster.name, "Sand Wyrm");
        assert_eq!(monster.max_hp, 1_200);
        assert!(monster.hp >= 1 && monster.hp <= monster.max_hp);
    }

    #[test]
    fn unknown_monster_is_still_plausible() {
        // Ids outside the table still produce a monster
        let monster = SimulationOracle::new().monster(999);
        assert_eq!(monster.id, 999);
        assert_eq!(monster.level, SIM_MAX_LEVEL);
        assert!(monster.hp <= monster.max_hp);
    }

    #[test]
    fn attack_damage_scales_with_times() {
        // Multi attack rolls one hit per time
        let oracle = SimulationOracle::new();
        for _ in 0..20 {
            let Payload::Write(result) = oracle.write(&ContractCall::MultiAttack {
                monster_id: 1,
                times: 10,
            }) else {
                panic!("write payload expected");
            };
            let Some(ActionEffect::Attacked {
                damage,
                defeated,
                reward,
                ..
            }) = result.effect
            else {
                panic!("attack effect expected");
            };
            assert!(damage >= 10 * SIM_DAMAGE_MIN && damage <= 10 * SIM_DAMAGE_MAX);
            assert_eq!(defeated, reward.is_some());
            if let Some(reward) = reward {
                assert!((SIM_DEFEAT_REWARD_MIN..=SIM_DEFEAT_REWARD_MAX).contains(&reward));
            }
            assert!(result.tx_hash.is_none());
            assert!(!result.pending);
        }
    }

    #[test]
    fn daily_reward_stays_in_range() {
        // Reward rolls stay inside the configured range
        let oracle = SimulationOracle::new();
        for _ in 0..50 {
            let Payload::Write(result) = oracle.write(&ContractCall::ClaimDailyReward) else {
                panic!("write payload expected");
            };
            let Some(ActionEffect::RewardClaimed { coins: Some(coins) }) = result.effect else {
                panic!("reward effect expected");
            };
            assert!((SIM_DAILY_REWARD_MIN..=SIM_DAILY_REWARD_MAX).contains(&coins));
        }
    }

    #[test]
    fn minted_token_ids_use_simulated_range() {
        // Simulated token ids cannot collide with live counters
        let Payload::Write(result) = SimulationOracle::new().write(&ContractCall::MintItem {
            recipient: PLAYER.into(),
            token_uri: "ipfs://sword".into(),
            item_type: "sword".into(),
        }) else {
            panic!("write payload expected");
        };
        let Some(ActionEffect::ItemMinted {
            token_id,
            item_type,
        }) = result.effect
        else {
            panic!("mint effect expected");
        };
        assert!((SIM_TOKEN_ID_MIN..=SIM_TOKEN_ID_MAX).contains(&token_id));
        assert_eq!(item_type, "sword");
    }
}
