//! Scripted chain clients for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::{GameEvent, NetworkConfig, Payload, ProviderKind, ProviderSpec};

use super::gateway::ChainGateway;
use super::onchain::{ChainClient, ChainError, Connector, ContractCall, TxReceipt};
use super::provider_selector::ProviderSelector;
use super::simulation::SimulationOracle;

pub const TEST_CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const TEST_PLAYER: &str = "0xabc0000000000000000000000000000000000def";

#[derive(Debug, Clone)]
pub enum ProbeBehavior {
    Healthy(u64),
    Fails,
    Hangs(Duration),
}

#[derive(Debug, Clone)]
pub enum ReceiptBehavior {
    Mined { success: bool, events: Vec<GameEvent> },
    NeverMined,
    MinedAfter { polls: usize, events: Vec<GameEvent> },
}

pub struct MockClient {
    probe: ProbeBehavior,
    read_result: Mutex<Result<Payload, ChainError>>,
    submit_results: Mutex<Vec<Result<String, ChainError>>>,
    submit_delay: Mutex<Duration>,
    receipt: Mutex<ReceiptBehavior>,
    pub probes: AtomicUsize,
    pub reads: AtomicUsize,
    pub submits: AtomicUsize,
    pub receipts: AtomicUsize,
}

impl MockClient {
    pub fn new(probe: ProbeBehavior) -> Self {
        Self {
            probe,
            read_result: Mutex::new(Err(ChainError::Unreachable("no read scripted".into()))),
            submit_results: Mutex::new(Vec::new()),
            submit_delay: Mutex::new(Duration::ZERO),
            receipt: Mutex::new(ReceiptBehavior::NeverMined),
            probes: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            receipts: AtomicUsize::new(0),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ProbeBehavior::Healthy(1_000))
    }

    pub fn with_read(self, result: Result<Payload, ChainError>) -> Self {
        *self.read_result.lock().unwrap() = result;
        self
    }

    /// Results are handed out in order; the last one repeats.
    pub fn with_submits(self, results: Vec<Result<String, ChainError>>) -> Self {
        *self.submit_results.lock().unwrap() = results;
        self
    }

    pub fn with_submit_delay(self, delay: Duration) -> Self {
        *self.submit_delay.lock().unwrap() = delay;
        self
    }

    pub fn with_receipt(self, behavior: ReceiptBehavior) -> Self {
        *self.receipt.lock().unwrap() = behavior;
        self
    }

    pub fn set_receipt(&self, behavior: ReceiptBehavior) {
        *self.receipt.lock().unwrap() = behavior;
    }

    pub fn network_calls(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
            + self.reads.load(Ordering::SeqCst)
            + self.submits.load(Ordering::SeqCst)
            + self.receipts.load(Ordering::SeqCst)
    }
}

pub fn tx_hash(n: u8) -> String {
    format!("0x{}", hex::encode([n; 32]))
}

/// Broadcast that went out under `tx_hash(n)` but never got an answer.
pub fn unacknowledged(n: u8) -> ChainError {
    ChainError::Unacknowledged {
        tx_hash: tx_hash(n),
        reason: "eth_sendRawTransaction exceeded 1000ms".into(),
    }
}

#[async_trait]
impl ChainClient for MockClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match &self.probe {
            ProbeBehavior::Healthy(block) => Ok(*block),
            ProbeBehavior::Fails => Err(ChainError::Unreachable("connection refused".into())),
            ProbeBehavior::Hangs(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(1)
            }
        }
    }

    async fn read(&self, _contract: &str, _call: &ContractCall) -> Result<Payload, ChainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.read_result.lock().unwrap().clone()
    }

    async fn submit(&self, _contract: &str, _call: &ContractCall) -> Result<String, ChainError> {
        let index = self.submits.fetch_add(1, Ordering::SeqCst);
        let delay = *self.submit_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let results = self.submit_results.lock().unwrap();
        match results.get(index).or_else(|| results.last()) {
            Some(result) => result.clone(),
            None => Ok(tx_hash(index as u8 + 1)),
        }
    }

    async fn receipt(&self, _contract: &str, tx_hash: &str) -> Result<Option<TxReceipt>, ChainError> {
        let polls = self.receipts.fetch_add(1, Ordering::SeqCst) + 1;
        let behavior = self.receipt.lock().unwrap().clone();
        match behavior {
            ReceiptBehavior::NeverMined => Ok(None),
            ReceiptBehavior::Mined { success, events } => Ok(Some(TxReceipt {
                tx_hash: tx_hash.to_string(),
                success,
                block_number: Some(1_001),
                events,
            })),
            ReceiptBehavior::MinedAfter {
                polls: needed,
                events,
            } => {
                if polls < needed {
                    return Ok(None);
                }
                Ok(Some(TxReceipt {
                    tx_hash: tx_hash.to_string(),
                    success: true,
                    block_number: Some(1_001),
                    events,
                }))
            }
        }
    }
}

/// Hands out one scripted client per provider kind and records the order it was asked in.
#[derive(Default)]
pub struct MockConnector {
    clients: HashMap<ProviderKind, Arc<MockClient>>,
    pub attempts: Mutex<Vec<ProviderKind>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ProviderKind, client: Arc<MockClient>) -> Self {
        self.clients.insert(kind, client);
        self
    }

    pub fn attempted(&self) -> Vec<ProviderKind> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        _network: &str,
        spec: &ProviderSpec,
        _url: &str,
    ) -> Result<Arc<dyn ChainClient>, ChainError> {
        self.attempts.lock().unwrap().push(spec.kind);
        match self.clients.get(&spec.kind) {
            Some(client) => Ok(client.clone() as Arc<dyn ChainClient>),
            None => Err(ChainError::Unreachable(format!("{} not scripted", spec.kind))),
        }
    }
}

/// All three backends usable, short probe timeout.
pub fn network_with_all_providers() -> NetworkConfig {
    let probe = Duration::from_millis(150);
    NetworkConfig::new(
        "sepolia",
        vec![
            ProviderSpec::keyed(ProviderKind::Alchemy, Some("alchemy-key".into()), probe),
            ProviderSpec::keyed(ProviderKind::Infura, Some("infura-key".into()), probe),
            ProviderSpec::public(Some("http://public.test".into()), probe),
        ],
    )
}

/// No credentials and no public endpoint for the network.
pub fn network_without_providers() -> NetworkConfig {
    let probe = Duration::from_millis(150);
    NetworkConfig::new(
        "sepolia",
        vec![
            ProviderSpec::keyed(ProviderKind::Alchemy, None, probe),
            ProviderSpec::keyed(ProviderKind::Infura, None, probe),
        ],
    )
}

/// Gateway over a scripted connector, with a deployed contract.
pub fn gateway_over(network: NetworkConfig, connector: MockConnector) -> Arc<ChainGateway> {
    let selector = ProviderSelector::new(Arc::new(network), Arc::new(connector));
    Arc::new(ChainGateway::new(
        Arc::new(selector),
        SimulationOracle::new(),
        Some(TEST_CONTRACT.to_string()),
        Duration::from_millis(200),
        Duration::from_millis(10),
    ))
}

/// Gateway backed by one scripted Alchemy client and a deployed contract.
pub fn live_gateway(client: Arc<MockClient>) -> Arc<ChainGateway> {
    gateway_over(
        network_with_all_providers(),
        MockConnector::new().with(ProviderKind::Alchemy, client),
    )
}

/// Gateway with no usable provider at all.
pub fn offline_gateway(contract: Option<&str>) -> Arc<ChainGateway> {
    let selector = ProviderSelector::new(
        Arc::new(network_without_providers()),
        Arc::new(MockConnector::new()),
    );
    Arc::new(ChainGateway::new(
        Arc::new(selector),
        SimulationOracle::new(),
        contract.map(str::to_string),
        Duration::from_millis(200),
        Duration::from_millis(10),
    ))
}
