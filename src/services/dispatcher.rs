use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;

use crate::constants::{ACTION_SLOT_RETENTION_SECS, KNOWN_AREAS};
use crate::models::{
    ActionError, ActionKind, ActionOutcome, ActionState, ErrorKind, GameAction, Payload,
    WriteResult,
};
use crate::utils::normalize_address;

use super::gateway::ChainGateway;
use super::onchain::ContractCall;

const TRANSITION_CAPACITY: usize = 256;

type SlotKey = (String, ActionKind);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub player: String,
    pub kind: ActionKind,
    pub state: ActionState,
}

/// What `poll` reports for one (player, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionStatus {
    pub player: String,
    pub kind: ActionKind,
    pub state: ActionState,
    pub action: Option<GameAction>,
    pub outcome: Option<ActionOutcome>,
    /// Set when this poll upgraded a pending write to its final outcome.
    #[serde(skip)]
    pub settled_now: bool,
}

impl ActionStatus {
    fn idle(player: String, kind: ActionKind) -> Self {
        Self {
            player,
            kind,
            state: ActionState::Idle,
            action: None,
            outcome: None,
            settled_now: false,
        }
    }
}

struct Slot {
    state: ActionState,
    action: GameAction,
    call: ContractCall,
    outcome: Option<ActionOutcome>,
    touched: Instant,
}

impl Slot {
    fn status(&self, key: &SlotKey) -> ActionStatus {
        ActionStatus {
            player: key.0.clone(),
            kind: key.1,
            state: self.state,
            action: Some(self.action.clone()),
            outcome: self.outcome.clone(),
            settled_now: false,
        }
    }

    fn expired(&self, retention: Duration) -> bool {
        self.state.is_terminal() && self.touched.elapsed() >= retention
    }
}

/// Shared between the dispatcher and the write tasks it spawns.
struct Ledger {
    slots: Mutex<HashMap<SlotKey, Slot>>,
    last_claims: Mutex<HashMap<String, DateTime<Utc>>>,
    transitions: broadcast::Sender<Transition>,
    claim_cooldown: TimeDelta,
}

impl Ledger {
    fn publish(&self, key: &SlotKey, state: ActionState) {
        tracing::debug!("{} {} -> {:?}", key.0, key.1, state);
        // No subscribers is fine.
        let _ = self.transitions.send(Transition {
            player: key.0.clone(),
            kind: key.1,
            state,
        });
    }

    /// A claim stops mattering once its cooldown window has passed.
    fn claim_blocks(&self, claimed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        claimed_at
            .checked_add_signed(self.claim_cooldown)
            .map_or(true, |next_claim| next_claim > now)
    }

    async fn store_claim(&self, player: &str, claimed_at: DateTime<Utc>) {
        let now = Utc::now();
        let mut claims = self.last_claims.lock().await;
        claims.retain(|_, at| self.claim_blocks(*at, now));
        let entry = claims.entry(player.to_string()).or_insert(claimed_at);
        if claimed_at > *entry {
            *entry = claimed_at;
        }
    }

    /// A pending confirmation keeps the slot `Submitting` until `poll` settles it.
    async fn finish(&self, key: &SlotKey, outcome: &ActionOutcome) {
        if key.1 == ActionKind::ClaimDailyReward
            && matches!(
                outcome,
                ActionOutcome::Confirmed(_) | ActionOutcome::Simulated(_)
            )
        {
            self.store_claim(&key.0, Utc::now()).await;
        }
        let state = if outcome.is_pending() {
            ActionState::Submitting
        } else {
            outcome.state()
        };
        if let Some(slot) = self.slots.lock().await.get_mut(key) {
            slot.state = state;
            slot.outcome = Some(outcome.clone());
            slot.touched = Instant::now();
        }
        if state != ActionState::Submitting {
            self.publish(key, state);
        }
    }
}

/// Validates, guards and submits game actions. One write in flight per (player, action).
pub struct GameActionDispatcher {
    gateway: Arc<ChainGateway>,
    ledger: Arc<Ledger>,
    max_multi_attack: u64,
    slot_retention: Duration,
}

impl GameActionDispatcher {
    pub fn new(gateway: Arc<ChainGateway>, max_multi_attack: u64, cooldown_hours: i64) -> Self {
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        let claim_cooldown = TimeDelta::try_hours(cooldown_hours).unwrap_or(TimeDelta::MAX);
        Self {
            gateway,
            ledger: Arc::new(Ledger {
                slots: Mutex::new(HashMap::new()),
                last_claims: Mutex::new(HashMap::new()),
                transitions,
                claim_cooldown,
            }),
            max_multi_attack,
            slot_retention: Duration::from_secs(ACTION_SLOT_RETENTION_SECS),
        }
    }

    #[cfg(test)]
    pub fn with_slot_retention(mut self, retention: Duration) -> Self {
        self.slot_retention = retention;
        self
    }

    pub fn gateway(&self) -> &Arc<ChainGateway> {
        &self.gateway
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Transition> {
        self.ledger.transitions.subscribe()
    }

    fn build_call(&self, action: &GameAction) -> Result<ContractCall, ActionError> {
        match action {
            GameAction::Register => Ok(ContractCall::RegisterPlayer),
            GameAction::Attack { monster_id } => {
                ensure_monster_id(*monster_id)?;
                Ok(ContractCall::AttackMonster {
                    monster_id: *monster_id,
                })
            }
            GameAction::MultiAttack { monster_id, times } => {
                ensure_monster_id(*monster_id)?;
                if *times == 0 || *times > self.max_multi_attack {
                    return Err(ActionError::invalid_input(format!(
                        "times must be between 1 and {}",
                        self.max_multi_attack
                    )));
                }
                Ok(ContractCall::MultiAttack {
                    monster_id: *monster_id,
                    times: *times,
                })
            }
            GameAction::ChangeArea { area } => {
                let area = area.trim().to_ascii_lowercase();
                if !KNOWN_AREAS.contains(&area.as_str()) {
                    return Err(ActionError::invalid_input(format!("Unknown area '{}'", area)));
                }
                Ok(ContractCall::ChangeArea { area })
            }
            GameAction::MintItem {
                recipient,
                token_uri,
                item_type,
            } => {
                let recipient = normalize_address(recipient).ok_or_else(|| {
                    ActionError::invalid_input(format!("Invalid recipient address '{}'", recipient))
                })?;
                if token_uri.trim().is_empty() || item_type.trim().is_empty() {
                    return Err(ActionError::invalid_input(
                        "token_uri and item_type are required",
                    ));
                }
                Ok(ContractCall::MintItem {
                    recipient,
                    token_uri: token_uri.trim().to_string(),
                    item_type: item_type.trim().to_string(),
                })
            }
            GameAction::ClaimDailyReward => Ok(ContractCall::ClaimDailyReward),
        }
    }

    async fn check_cooldown(&self, player: &str) -> Result<(), ActionError> {
        let Some(claimed_at) = self.last_claim(player).await else {
            return Ok(());
        };
        let Some(next_claim) = claimed_at.checked_add_signed(self.ledger.claim_cooldown) else {
            return Err(ActionError::new(
                ErrorKind::Cooldown,
                "Daily reward cooldown does not end",
            ));
        };
        if Utc::now() < next_claim {
            return Err(ActionError::new(
                ErrorKind::Cooldown,
                format!("Daily reward available again at {}", next_claim.to_rfc3339()),
            ));
        }
        Ok(())
    }

    pub async fn dispatch(&self, player: &str, action: GameAction) -> ActionOutcome {
        let Some(player) = normalize_address(player) else {
            return ActionOutcome::Failed(ActionError::invalid_input(format!(
                "Invalid player address '{}'",
                player
            )));
        };
        let call = match self.build_call(&action) {
            Ok(call) => call,
            Err(err) => return ActionOutcome::Failed(err),
        };
        if matches!(action, GameAction::ClaimDailyReward) {
            if let Err(err) = self.check_cooldown(&player).await {
                return ActionOutcome::Failed(err);
            }
        }

        let key: SlotKey = (player, action.kind());
        {
            let mut slots = self.ledger.slots.lock().await;
            slots.retain(|_, slot| !slot.expired(self.slot_retention));
            if slots
                .get(&key)
                .is_some_and(|slot| !slot.state.is_terminal())
            {
                return ActionOutcome::failed(
                    ErrorKind::AlreadyInFlight,
                    format!("{} already in flight for {}", key.1, key.0),
                );
            }
            slots.insert(
                key.clone(),
                Slot {
                    state: ActionState::Submitting,
                    action,
                    call: call.clone(),
                    outcome: None,
                    touched: Instant::now(),
                },
            );
        }
        self.ledger.publish(&key, ActionState::Submitting);

        // The write keeps running if the caller stops waiting.
        let gateway = self.gateway.clone();
        let ledger = self.ledger.clone();
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let outcome = gateway.write(&call).await;
            ledger.finish(&task_key, &outcome).await;
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!("{} task for {} aborted: {}", key.1, key.0, err);
                let outcome = ActionOutcome::failed(
                    ErrorKind::ProviderUnreachable,
                    format!("{} did not complete", key.1),
                );
                self.ledger.finish(&key, &outcome).await;
                outcome
            }
        }
    }

    /// Current state of a pair; a pending confirmation is re-checked once against the chain.
    pub async fn poll(&self, player: &str, kind: ActionKind) -> Option<ActionStatus> {
        let player = normalize_address(player)?;
        let key: SlotKey = (player, kind);

        let (status, call) = {
            let slots = self.ledger.slots.lock().await;
            match slots.get(&key) {
                Some(slot) => (slot.status(&key), slot.call.clone()),
                None => return Some(ActionStatus::idle(key.0, kind)),
            }
        };

        let pending_hash = match &status.outcome {
            Some(ActionOutcome::Confirmed(Payload::Write(WriteResult {
                pending: true,
                tx_hash: Some(tx_hash),
                ..
            }))) => Some(tx_hash.clone()),
            _ => None,
        };
        let Some(tx_hash) = pending_hash else {
            return Some(status);
        };

        let settled = self.gateway.settle(&call, &tx_hash).await;
        if settled.is_pending() {
            return Some(status);
        }

        let mut slots = self.ledger.slots.lock().await;
        let slot = slots.get_mut(&key)?;
        // A newer dispatch may have replaced the pending slot meanwhile.
        if slot.outcome != status.outcome {
            return Some(slot.status(&key));
        }
        slot.state = settled.state();
        slot.outcome = Some(settled);
        slot.touched = Instant::now();
        let mut status = slot.status(&key);
        drop(slots);
        self.ledger.publish(&key, status.state);
        status.settled_now = true;
        Some(status)
    }

    pub async fn read_player(&self, player: &str) -> ActionOutcome {
        let Some(player) = normalize_address(player) else {
            return ActionOutcome::Failed(ActionError::invalid_input(format!(
                "Invalid player address '{}'",
                player
            )));
        };
        self.gateway
            .read(&ContractCall::GetPlayerData { player })
            .await
    }

    pub async fn read_monster(&self, monster_id: u64) -> ActionOutcome {
        if let Err(err) = ensure_monster_id(monster_id) {
            return ActionOutcome::Failed(err);
        }
        self.gateway
            .read(&ContractCall::GetMonster { monster_id })
            .await
    }

    pub async fn last_claim(&self, player: &str) -> Option<DateTime<Utc>> {
        let player = normalize_address(player)?;
        self.ledger.last_claims.lock().await.get(&player).copied()
    }

    /// Seeds the cooldown from persisted progress. Never moves an existing claim backwards.
    pub async fn record_claim(&self, player: &str, claimed_at: DateTime<Utc>) {
        let Some(player) = normalize_address(player) else {
            return;
        };
        if !self.ledger.claim_blocks(claimed_at, Utc::now()) {
            return;
        }
        self.ledger.store_claim(&player, claimed_at).await;
    }

    #[cfg(test)]
    async fn tracked(&self) -> (usize, usize) {
        let slots = self.ledger.slots.lock().await.len();
        let claims = self.ledger.last_claims.lock().await.len();
        (slots, claims)
    }
}

fn ensure_monster_id(monster_id: u64) -> Result<(), ActionError> {
    if monster_id == 0 {
        return Err(ActionError::invalid_input("monster_id must be at least 1"));
    }
    Ok(())
}
