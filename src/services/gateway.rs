use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{
    ActionEffect, ActionOutcome, ErrorKind, GameEvent, Payload, ProviderKind, WriteResult,
};

use super::onchain::{ChainError, ContractCall, ContractRef, TxReceipt};
use super::provider_selector::ProviderSelector;
use super::simulation::SimulationOracle;

const COOLDOWN_REVERTS: [&str; 3] = ["cooldown", "already claimed", "once per day"];
const VALIDATION_REVERTS: [&str; 2] = ["not registered", "invalid"];

/// Snapshot of the live path, served by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LiveStatus {
    pub network: String,
    pub simulation_forced: bool,
    pub provider: Option<ProviderKind>,
    pub block_number: Option<u64>,
}

/// Every contract call goes through here. Provider failures never leave this type:
/// callers only ever see an `ActionOutcome`.
pub struct ChainGateway {
    selector: Arc<ProviderSelector>,
    oracle: SimulationOracle,
    contract_address: Option<String>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl ChainGateway {
    pub fn new(
        selector: Arc<ProviderSelector>,
        oracle: SimulationOracle,
        contract_address: Option<String>,
        confirmation_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            selector,
            oracle,
            contract_address,
            confirmation_timeout,
            poll_interval,
        }
    }

    async fn contract(&self) -> Option<ContractRef> {
        let address = self.contract_address.as_deref()?;
        let handle = self.selector.select().await?;
        Some(ContractRef::new(address, handle.client))
    }

    pub async fn read(&self, call: &ContractCall) -> ActionOutcome {
        let Some(contract) = self.contract().await else {
            tracing::debug!("Simulating {} (no live path)", call.method());
            return ActionOutcome::Simulated(self.oracle.read(call));
        };

        match contract.read(call).await {
            Ok(payload) if read_shape_matches(call, &payload) => ActionOutcome::Confirmed(payload),
            Ok(_) => {
                tracing::warn!("{} returned an unexpected payload; simulating", call.method());
                self.selector.invalidate();
                ActionOutcome::Simulated(self.oracle.read(call))
            }
            Err(err) => {
                tracing::warn!("Live {} failed: {}; simulating", call.method(), err);
                self.selector.invalidate();
                ActionOutcome::Simulated(self.oracle.read(call))
            }
        }
    }

    pub async fn write(&self, call: &ContractCall) -> ActionOutcome {
        if call.is_read() {
            return self.read(call).await;
        }
        let Some(contract) = self.contract().await else {
            tracing::debug!("Simulating {} (no live path)", call.method());
            return ActionOutcome::Simulated(self.oracle.write(call));
        };

        let tx_hash = match contract.submit(call).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                self.selector.invalidate();
                return self.submission_failed(call, err);
            }
        };
        tracing::info!("Submitted {} tx {}", call.method(), tx_hash);

        match self.await_receipt(&contract, &tx_hash).await {
            Some(receipt) => outcome_from_receipt(call, receipt),
            None => {
                tracing::warn!(
                    "{} tx {} not confirmed within {}s; reporting pending",
                    call.method(),
                    tx_hash,
                    self.confirmation_timeout.as_secs()
                );
                ActionOutcome::Confirmed(Payload::Write(WriteResult::pending(tx_hash)))
            }
        }
    }

    /// Single receipt lookup for a write reported as pending earlier.
    pub async fn settle(&self, call: &ContractCall, tx_hash: &str) -> ActionOutcome {
        let still_pending =
            || ActionOutcome::Confirmed(Payload::Write(WriteResult::pending(tx_hash.to_string())));
        let Some(contract) = self.contract().await else {
            return still_pending();
        };
        match contract.receipt(tx_hash).await {
            Ok(Some(receipt)) => outcome_from_receipt(call, receipt),
            Ok(None) => still_pending(),
            Err(err) => {
                tracing::warn!("Receipt lookup for {} failed: {}", tx_hash, err);
                self.selector.invalidate();
                still_pending()
            }
        }
    }

    pub async fn live_status(&self) -> LiveStatus {
        let network = self.selector.network().network.clone();
        if self.contract_address.is_none() {
            return LiveStatus {
                network,
                simulation_forced: true,
                provider: None,
                block_number: None,
            };
        }
        let handle = self.selector.select().await;
        LiveStatus {
            network,
            simulation_forced: false,
            provider: handle.as_ref().map(|h| h.kind),
            block_number: handle.map(|h| h.block_number),
        }
    }

    async fn await_receipt(&self, contract: &ContractRef, tx_hash: &str) -> Option<TxReceipt> {
        let poll = async {
            loop {
                match contract.receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(err) => tracing::debug!("Receipt poll for {} failed: {}", tx_hash, err),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };
        tokio::time::timeout(self.confirmation_timeout, poll).await.ok()
    }

    /// Only an `Unacknowledged` broadcast may have reached a mempool; every other failure
    /// happened before the transaction left the process, so simulating cannot double submit.
    fn submission_failed(&self, call: &ContractCall, err: ChainError) -> ActionOutcome {
        match err {
            ChainError::Reverted(reason) => {
                let lower = reason.to_ascii_lowercase();
                if matches!(call, ContractCall::RegisterPlayer) && lower.contains("already registered") {
                    tracing::info!("Player already registered; treating as confirmed");
                    return ActionOutcome::Confirmed(Payload::Write(WriteResult::settled(
                        None,
                        ActionEffect::Registered {
                            already_registered: true,
                        },
                    )));
                }
                if COOLDOWN_REVERTS.iter().any(|needle| lower.contains(needle)) {
                    return ActionOutcome::failed(ErrorKind::Cooldown, reason);
                }
                if VALIDATION_REVERTS.iter().any(|needle| lower.contains(needle)) {
                    return ActionOutcome::failed(ErrorKind::CallReverted, reason);
                }
                tracing::warn!("{} reverted ({}); simulating", call.method(), reason);
                ActionOutcome::Simulated(self.oracle.write(call))
            }
            ChainError::Malformed(message) => {
                ActionOutcome::failed(ErrorKind::MalformedResponse, message)
            }
            ChainError::Unacknowledged { tx_hash, reason } => {
                tracing::warn!(
                    "{} tx {} may have been broadcast ({}); reporting pending",
                    call.method(),
                    tx_hash,
                    reason
                );
                ActionOutcome::Confirmed(Payload::Write(WriteResult::pending(tx_hash)))
            }
            other => {
                tracing::warn!("Submitting {} failed: {}; simulating", call.method(), other);
                ActionOutcome::Simulated(self.oracle.write(call))
            }
        }
    }
}

fn read_shape_matches(call: &ContractCall, payload: &Payload) -> bool {
    matches!(
        (call, payload),
        (ContractCall::GetPlayerData { .. }, Payload::Player(_))
            | (ContractCall::GetMonster { .. }, Payload::Monster(_))
    )
}

fn outcome_from_receipt(call: &ContractCall, receipt: TxReceipt) -> ActionOutcome {
    if !receipt.success {
        return ActionOutcome::failed(
            ErrorKind::CallReverted,
            format!("transaction {} reverted on-chain", receipt.tx_hash),
        );
    }
    match effect_from_events(call, &receipt.events) {
        Ok(effect) => ActionOutcome::Confirmed(Payload::Write(WriteResult::settled(
            Some(receipt.tx_hash),
            effect,
        ))),
        Err(message) => ActionOutcome::failed(
            ErrorKind::MalformedResponse,
            format!("{} (tx {})", message, receipt.tx_hash),
        ),
    }
}

fn effect_from_events(call: &ContractCall, events: &[GameEvent]) -> Result<ActionEffect, String> {
    match call {
        ContractCall::RegisterPlayer => Ok(ActionEffect::Registered {
            already_registered: false,
        }),
        ContractCall::AttackMonster { monster_id } | ContractCall::MultiAttack { monster_id, .. } => {
            let hits: Vec<u64> = events
                .iter()
                .filter_map(|event| match event {
                    GameEvent::MonsterAttacked {
                        monster_id: id,
                        damage,
                        ..
                    } if id == monster_id => Some(*damage),
                    _ => None,
                })
                .collect();
            if hits.is_empty() {
                return Err(format!("no MonsterAttacked event for monster {}", monster_id));
            }
            let reward = events.iter().find_map(|event| match event {
                GameEvent::MonsterDefeated {
                    monster_id: id,
                    reward,
                    ..
                } if id == monster_id => Some(*reward),
                _ => None,
            });
            Ok(ActionEffect::Attacked {
                monster_id: *monster_id,
                damage: hits.iter().fold(0u64, |acc, hit| acc.saturating_add(*hit)),
                defeated: reward.is_some(),
                reward,
            })
        }
        ContractCall::ChangeArea { area } => Ok(ActionEffect::AreaChanged { area: area.clone() }),
        ContractCall::MintItem { .. } => events
            .iter()
            .find_map(|event| match event {
                GameEvent::ItemMinted {
                    token_id,
                    item_type,
                    ..
                } => Some(ActionEffect::ItemMinted {
                    token_id: *token_id,
                    item_type: item_type.clone(),
                }),
                _ => None,
            })
            .ok_or_else(|| "no ItemMinted event in receipt".to_string()),
        ContractCall::ClaimDailyReward => Ok(ActionEffect::RewardClaimed { coins: None }),
        ContractCall::GetPlayerData { .. } | ContractCall::GetMonster { .. } => {
            Err(format!("{} is not a transaction", call.method()))
        }
    }
}
