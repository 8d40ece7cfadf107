use serde::{Deserialize, Serialize};
use std::fmt;

/// Player-facing game actions. Each variant carries exactly the contract arguments it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GameAction {
    Register,
    Attack {
        monster_id: u64,
    },
    MultiAttack {
        monster_id: u64,
        times: u64,
    },
    ChangeArea {
        area: String,
    },
    MintItem {
        recipient: String,
        token_uri: String,
        item_type: String,
    },
    ClaimDailyReward,
}

impl GameAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            GameAction::Register => ActionKind::Register,
            GameAction::Attack { .. } => ActionKind::Attack,
            GameAction::MultiAttack { .. } => ActionKind::MultiAttack,
            GameAction::ChangeArea { .. } => ActionKind::ChangeArea,
            GameAction::MintItem { .. } => ActionKind::MintItem,
            GameAction::ClaimDailyReward => ActionKind::ClaimDailyReward,
        }
    }
}

/// Payload-free action discriminant, used to key the in-flight guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Register,
    Attack,
    MultiAttack,
    ChangeArea,
    MintItem,
    ClaimDailyReward,
}

impl ActionKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "register" => Some(ActionKind::Register),
            "attack" => Some(ActionKind::Attack),
            "multi_attack" => Some(ActionKind::MultiAttack),
            "change_area" => Some(ActionKind::ChangeArea),
            "mint_item" => Some(ActionKind::MintItem),
            "claim_daily_reward" => Some(ActionKind::ClaimDailyReward),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Register => "register",
            ActionKind::Attack => "attack",
            ActionKind::MultiAttack => "multi_attack",
            ActionKind::ChangeArea => "change_area",
            ActionKind::MintItem => "mint_item",
            ActionKind::ClaimDailyReward => "claim_daily_reward",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub level: u64,
    pub experience: u64,
    pub coins: u64,
    pub damage: u64,
    pub auto_damage: u64,
    pub current_area: String,
    /// Unix seconds.
    pub last_updated: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterInfo {
    pub id: u64,
    pub name: String,
    pub hp: u64,
    pub max_hp: u64,
    pub level: u64,
}

/// Contract events the backend understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    MonsterAttacked {
        player: String,
        monster_id: u64,
        damage: u64,
    },
    MonsterDefeated {
        player: String,
        monster_id: u64,
        reward: u64,
    },
    ItemMinted {
        token_id: u64,
        player: String,
        item_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ActionEffect {
    Registered {
        already_registered: bool,
    },
    Attacked {
        monster_id: u64,
        damage: u64,
        defeated: bool,
        reward: Option<u64>,
    },
    AreaChanged {
        area: String,
    },
    ItemMinted {
        token_id: u64,
        item_type: String,
    },
    RewardClaimed {
        /// Known only on the simulated path; live rewards are decided on-chain.
        coins: Option<u64>,
    },
}

/// Result of a write. `pending` is set when the transaction left the process but no receipt was observed in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub tx_hash: Option<String>,
    pub pending: bool,
    pub effect: Option<ActionEffect>,
}

impl WriteResult {
    pub fn settled(tx_hash: Option<String>, effect: ActionEffect) -> Self {
        Self {
            tx_hash,
            pending: false,
            effect: Some(effect),
        }
    }

    pub fn pending(tx_hash: String) -> Self {
        Self {
            tx_hash: Some(tx_hash),
            pending: true,
            effect: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Player(PlayerSnapshot),
    Monster(MonsterInfo),
    Write(WriteResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderUnreachable,
    CallReverted,
    MalformedResponse,
    AlreadyInFlight,
    InvalidInput,
    Cooldown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ActionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }
}

/// Exactly one of these is returned per read or action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum ActionOutcome {
    Confirmed(Payload),
    Simulated(Payload),
    Failed(ActionError),
}

impl ActionOutcome {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        ActionOutcome::Failed(ActionError::new(kind, message))
    }

    pub fn state(&self) -> ActionState {
        match self {
            ActionOutcome::Confirmed(_) => ActionState::Confirmed,
            ActionOutcome::Simulated(_) => ActionState::Simulated,
            ActionOutcome::Failed(_) => ActionState::Failed,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            ActionOutcome::Confirmed(payload) | ActionOutcome::Simulated(payload) => Some(payload),
            ActionOutcome::Failed(_) => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ActionOutcome::Failed(err) => Some(err.kind),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ActionOutcome::Confirmed(Payload::Write(WriteResult { pending: true, .. }))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Idle,
    Submitting,
    Confirmed,
    Simulated,
    Failed,
}

impl ActionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ActionState::Confirmed | ActionState::Simulated | ActionState::Failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_action_deserializes_from_tagged_json() {
        // Actions arrive tagged by name
        let action: GameAction =
            serde_json::from_str(r#"{"action":"multi_attack","monster_id":3,"times":5}"#)
                .expect("valid action");
        assert_eq!(
            action,
            GameAction::MultiAttack {
                monster_id: 3,
                times: 5
            }
        );
        assert_eq!(action.kind(), ActionKind::MultiAttack);

        let action: GameAction =
            serde_json::from_str(r#"{"action":"claim_daily_reward"}"#).expect("valid action");
        assert_eq!(action, GameAction::ClaimDailyReward);
    }

    #[test]
    fn action_kind_parses_path_segments() {
        // Path names accept dashes and any case
        assert_eq!(ActionKind::parse("multi-attack"), Some(ActionKind::MultiAttack));
        assert_eq!(ActionKind::parse("Claim_Daily_Reward"), Some(ActionKind::ClaimDailyReward));
        assert_eq!(ActionKind::parse("teleport"), None);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        // Pending write keeps the confirmed tag
        let outcome = ActionOutcome::Confirmed(Payload::Write(WriteResult::pending("0xabc".into())));
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["result"]["type"], "write");
        assert_eq!(json["result"]["pending"], true);
        assert!(outcome.is_pending());
        assert_eq!(outcome.state(), ActionState::Confirmed);
    }

    #[test]
    fn failed_outcome_exposes_kind() {
        // Failures carry a kind and no payload
        let outcome = ActionOutcome::failed(ErrorKind::Cooldown, "wait");
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Cooldown));
        assert!(outcome.payload().is_none());
        assert!(outcome.state().is_terminal());
        assert!(!ActionState::Submitting.is_terminal());
    }
}
