use async_trait::async_trait;
use ethers::{
    contract::{abigen, parse_log, ContractError},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, MiddlewareError, Provider, ProviderError},
    signers::{LocalWallet, Signer},
    types::{Address, TransactionReceipt, H256, U256, U64},
};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::{
    constants::{CHAIN_ID_HOLESKY, CHAIN_ID_LOCALHOST, CHAIN_ID_MAINNET, CHAIN_ID_SEPOLIA},
    integrations::JsonRpcClient,
    models::{GameEvent, MonsterInfo, Payload, PlayerSnapshot, ProviderSpec},
};

abigen!(
    ClickerGame,
    r#"[
        function registerPlayer()
        function attackMonster(uint256 monsterId) returns (uint256)
        function multiAttack(uint256 monsterId, uint256 times) returns (uint256)
        function changeArea(string areaId)
        function mintItem(address recipient, string tokenURI, string itemType) returns (uint256)
        function claimDailyReward()
        function getPlayerData(address player) view returns (uint256, uint256, uint256, uint256, uint256, string, uint256)
        function getMonster(uint256 monsterId) view returns (string, uint256, uint256, uint256)
        event ItemMinted(uint256 indexed tokenId, address indexed player, string itemType)
        event MonsterAttacked(address indexed player, uint256 indexed monsterId, uint256 damage)
        event MonsterDefeated(address indexed player, uint256 indexed monsterId, uint256 reward)
    ]"#
);

/// Contract methods the gateway may invoke, bit-exact with the deployed ABI.
pub const METHOD_SIGNATURES: [&str; 8] = [
    "registerPlayer()",
    "attackMonster(uint256)",
    "multiAttack(uint256,uint256)",
    "changeArea(string)",
    "mintItem(address,string,string)",
    "claimDailyReward()",
    "getPlayerData(address)",
    "getMonster(uint256)",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("call reverted: {0}")]
    Reverted(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("signer error: {0}")]
    Signer(String),

    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Signed and handed to the provider, but the broadcast was never acknowledged.
    /// The transaction may already be in a mempool under `tx_hash`.
    #[error("broadcast of {tx_hash} unacknowledged: {reason}")]
    Unacknowledged { tx_hash: String, reason: String },
}

/// A contract method plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    RegisterPlayer,
    AttackMonster {
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
    GetPlayerData {
        player: String,
    },
    GetMonster {
        monster_id: u64,
    },
}

impl ContractCall {
    pub fn signature(&self) -> &'static str {
        match self {
            ContractCall::RegisterPlayer => METHOD_SIGNATURES[0],
            ContractCall::AttackMonster { .. } => METHOD_SIGNATURES[1],
            ContractCall::MultiAttack { .. } => METHOD_SIGNATURES[2],
            ContractCall::ChangeArea { .. } => METHOD_SIGNATURES[3],
            ContractCall::MintItem { .. } => METHOD_SIGNATURES[4],
            ContractCall::ClaimDailyReward => METHOD_SIGNATURES[5],
            ContractCall::GetPlayerData { .. } => METHOD_SIGNATURES[6],
            ContractCall::GetMonster { .. } => METHOD_SIGNATURES[7],
        }
    }

    pub fn method(&self) -> &'static str {
        let signature = self.signature();
        signature.split('(').next().unwrap_or(signature)
    }

    pub fn is_read(&self) -> bool {
        matches!(
            self,
            ContractCall::GetPlayerData { .. } | ContractCall::GetMonster { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub success: bool,
    pub block_number: Option<u64>,
    pub events: Vec<GameEvent>,
}

/// One live connection to a provider backend.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Liveness probe.
    async fn block_number(&self) -> Result<u64, ChainError>;

    async fn read(&self, contract: &str, call: &ContractCall) -> Result<Payload, ChainError>;

    /// Signs and broadcasts; returns the transaction hash once it left the process.
    /// Fails with `Unacknowledged` when the outcome of the broadcast itself is unknown.
    async fn submit(&self, contract: &str, call: &ContractCall) -> Result<String, ChainError>;

    /// `Ok(None)` while the transaction is not mined yet.
    async fn receipt(&self, contract: &str, tx_hash: &str) -> Result<Option<TxReceipt>, ChainError>;
}

/// Builds a candidate client for one provider spec. No network traffic beyond what the client needs to exist.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        network: &str,
        spec: &ProviderSpec,
        url: &str,
    ) -> Result<Arc<dyn ChainClient>, ChainError>;
}

/// Contract address, method table and the connection it is reached through.
pub struct ContractRef {
    address: String,
    methods: &'static [&'static str],
    client: Arc<dyn ChainClient>,
}

impl ContractRef {
    pub fn new(address: impl Into<String>, client: Arc<dyn ChainClient>) -> Self {
        Self {
            address: address.into(),
            methods: &METHOD_SIGNATURES,
            client,
        }
    }

    fn ensure_known(&self, call: &ContractCall) -> Result<(), ChainError> {
        if self.methods.contains(&call.signature()) {
            return Ok(());
        }
        Err(ChainError::NotConfigured(format!(
            "method {} not in contract table",
            call.signature()
        )))
    }

    pub async fn read(&self, call: &ContractCall) -> Result<Payload, ChainError> {
        self.ensure_known(call)?;
        self.client.read(&self.address, call).await
    }

    pub async fn submit(&self, call: &ContractCall) -> Result<String, ChainError> {
        self.ensure_known(call)?;
        self.client.submit(&self.address, call).await
    }

    pub async fn receipt(&self, tx_hash: &str) -> Result<Option<TxReceipt>, ChainError> {
        self.client.receipt(&self.address, tx_hash).await
    }
}

pub fn chain_id_for(network: &str) -> Option<u64> {
    match network.trim().to_ascii_lowercase().as_str() {
        "mainnet" => Some(CHAIN_ID_MAINNET),
        "sepolia" => Some(CHAIN_ID_SEPOLIA),
        "holesky" => Some(CHAIN_ID_HOLESKY),
        "localhost" => Some(CHAIN_ID_LOCALHOST),
        _ => None,
    }
}

pub fn parse_address(value: &str) -> Result<Address, ChainError> {
    Address::from_str(value.trim())
        .map_err(|e| ChainError::NotConfigured(format!("Invalid address {}: {}", value, e)))
}

pub fn parse_tx_hash(value: &str) -> Result<H256, ChainError> {
    H256::from_str(value.trim())
        .map_err(|e| ChainError::Malformed(format!("Invalid tx hash {}: {}", value, e)))
}

pub fn u256_to_u64(value: U256) -> Result<u64, ChainError> {
    if value > U256::from(u64::MAX) {
        return Err(ChainError::Malformed(format!("value {} exceeds u64", value)));
    }
    Ok(value.as_u64())
}

fn classify_message(message: String) -> ChainError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("revert") {
        ChainError::Reverted(message)
    } else if lower.contains("timeout") || lower.contains("timed out") {
        ChainError::Timeout(message)
    } else if lower.contains("deserializ")
        || lower.contains("invalid type")
        || lower.contains("abi decod")
        || lower.contains("invalid data")
    {
        ChainError::Malformed(message)
    } else if lower.contains("signer") || lower.contains("signature") {
        ChainError::Signer(message)
    } else {
        ChainError::Unreachable(message)
    }
}

fn classify_contract_error<M: Middleware>(err: ContractError<M>) -> ChainError {
    if let Some(reason) = err.decode_revert::<String>() {
        return ChainError::Reverted(reason);
    }
    classify_message(err.to_string())
}

async fn bounded<T, F>(label: &str, limit: Duration, fut: F) -> Result<T, ChainError>
where
    F: Future<Output = Result<T, ChainError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::Timeout(format!(
            "{} exceeded {}ms",
            label,
            limit.as_millis()
        ))),
    }
}

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Live EVM connection: raw JSON-RPC probe plus an ethers provider for contract traffic.
pub struct EvmClient {
    probe: JsonRpcClient,
    provider: Arc<Provider<Http>>,
    signer: Option<Arc<SignerClient>>,
    call_timeout: Duration,
}

impl EvmClient {
    pub fn new(
        url: &str,
        probe_timeout: Duration,
        call_timeout: Duration,
        wallet: Option<LocalWallet>,
    ) -> Result<Self, ChainError> {
        let probe = JsonRpcClient::new(url.to_string(), probe_timeout)?;
        let provider = Provider::<Http>::try_from(url)
            .map_err(|e| ChainError::NotConfigured(format!("Invalid RPC URL: {}", e)))?;
        let signer = wallet.map(|wallet| Arc::new(SignerMiddleware::new(provider.clone(), wallet)));
        Ok(Self {
            probe,
            provider: Arc::new(provider),
            signer,
            call_timeout,
        })
    }

    fn signer(&self) -> Result<Arc<SignerClient>, ChainError> {
        self.signer
            .clone()
            .ok_or_else(|| ChainError::Signer("no signing key configured".to_string()))
    }

    /// Node answered the broadcast: either it has the transaction or it refused it.
    fn broadcast_refused(err: &ProviderError, tx_hash: &str) -> Option<Result<String, ChainError>> {
        let rpc = err.as_error_response()?;
        if rpc.message.to_ascii_lowercase().contains("already known") {
            return Some(Ok(tx_hash.to_string()));
        }
        Some(Err(classify_message(rpc.message.clone())))
    }

    fn decode_events(contract: Address, receipt: &TransactionReceipt) -> Vec<GameEvent> {
        receipt
            .logs
            .iter()
            .filter(|log| log.address == contract)
            .filter_map(|log| parse_log::<ClickerGameEvents>(log.clone()).ok())
            .filter_map(|event| match event {
                ClickerGameEvents::ItemMintedFilter(e) => Some(GameEvent::ItemMinted {
                    token_id: u256_to_u64(e.token_id).ok()?,
                    player: format!("{:#x}", e.player),
                    item_type: e.item_type,
                }),
                ClickerGameEvents::MonsterAttackedFilter(e) => Some(GameEvent::MonsterAttacked {
                    player: format!("{:#x}", e.player),
                    monster_id: u256_to_u64(e.monster_id).ok()?,
                    damage: u256_to_u64(e.damage).ok()?,
                }),
                ClickerGameEvents::MonsterDefeatedFilter(e) => Some(GameEvent::MonsterDefeated {
                    player: format!("{:#x}", e.player),
                    monster_id: u256_to_u64(e.monster_id).ok()?,
                    reward: u256_to_u64(e.reward).ok()?,
                }),
            })
            .collect()
    }
}

#[async_trait]
impl ChainClient for EvmClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.probe.get_block_number().await
    }

    async fn read(&self, contract: &str, call: &ContractCall) -> Result<Payload, ChainError> {
        let address = parse_address(contract)?;
        let game = ClickerGame::new(address, self.provider.clone());
        match call {
            ContractCall::GetPlayerData { player } => {
                let player = parse_address(player)?;
                let (level, experience, coins, damage, auto_damage, current_area, last_updated) =
                    bounded("getPlayerData", self.call_timeout, async {
                        game.get_player_data(player)
                            .call()
                            .await
                            .map_err(classify_contract_error)
                    })
                    .await?;
                Ok(Payload::Player(PlayerSnapshot {
                    level: u256_to_u64(level)?,
                    experience: u256_to_u64(experience)?,
                    coins: u256_to_u64(coins)?,
                    damage: u256_to_u64(damage)?,
                    auto_damage: u256_to_u64(auto_damage)?,
                    current_area,
                    last_updated: u256_to_u64(last_updated)?,
                }))
            }
            ContractCall::GetMonster { monster_id } => {
                let (name, hp, max_hp, level) = bounded("getMonster", self.call_timeout, async {
                    game.get_monster(U256::from(*monster_id))
                        .call()
                        .await
                        .map_err(classify_contract_error)
                })
                .await?;
                Ok(Payload::Monster(MonsterInfo {
                    id: *monster_id,
                    name,
                    hp: u256_to_u64(hp)?,
                    max_hp: u256_to_u64(max_hp)?,
                    level: u256_to_u64(level)?,
                }))
            }
            other => Err(ChainError::NotConfigured(format!(
                "{} is not a view method",
                other.method()
            ))),
        }
    }

    async fn submit(&self, contract: &str, call: &ContractCall) -> Result<String, ChainError> {
        let address = parse_address(contract)?;
        let signer = self.signer()?;
        let game = ClickerGame::new(address, signer.clone());
        let mut tx = match call {
            ContractCall::RegisterPlayer => game.register_player().tx,
            ContractCall::AttackMonster { monster_id } => {
                game.attack_monster(U256::from(*monster_id)).tx
            }
            ContractCall::MultiAttack { monster_id, times } => {
                game.multi_attack(U256::from(*monster_id), U256::from(*times)).tx
            }
            ContractCall::ChangeArea { area } => game.change_area(area.clone()).tx,
            ContractCall::MintItem {
                recipient,
                token_uri,
                item_type,
            } => {
                let recipient = parse_address(recipient)?;
                game.mint_item(recipient, token_uri.clone(), item_type.clone()).tx
            }
            ContractCall::ClaimDailyReward => game.claim_daily_reward().tx,
            other => {
                return Err(ChainError::NotConfigured(format!(
                    "{} is a view method",
                    other.method()
                )))
            }
        };

        // Nonce, gas and chain id; reverts surface here through gas estimation.
        bounded(call.method(), self.call_timeout, async {
            signer.fill_transaction(&mut tx, None).await.map_err(|e| {
                classify_contract_error(ContractError::<SignerClient>::from_middleware_error(e))
            })
        })
        .await?;
        let signature = signer
            .signer()
            .sign_transaction(&tx)
            .await
            .map_err(|e| ChainError::Signer(e.to_string()))?;
        let tx_hash = format!("{:#x}", tx.hash(&signature));
        let raw = tx.rlp_signed(&signature);

        // The hash is known before the broadcast, so a lost answer can still be tracked.
        match tokio::time::timeout(self.call_timeout, self.provider.send_raw_transaction(raw)).await
        {
            Ok(Ok(_)) => Ok(tx_hash),
            Ok(Err(err)) => match Self::broadcast_refused(&err, &tx_hash) {
                Some(result) => result,
                None => Err(ChainError::Unacknowledged {
                    tx_hash,
                    reason: err.to_string(),
                }),
            },
            Err(_) => Err(ChainError::Unacknowledged {
                tx_hash,
                reason: format!(
                    "eth_sendRawTransaction exceeded {}ms",
                    self.call_timeout.as_millis()
                ),
            }),
        }
    }

    async fn receipt(&self, contract: &str, tx_hash: &str) -> Result<Option<TxReceipt>, ChainError> {
        let address = parse_address(contract)?;
        let hash = parse_tx_hash(tx_hash)?;
        let receipt = bounded("eth_getTransactionReceipt", self.call_timeout, async {
            self.provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| classify_message(e.to_string()))
        })
        .await?;

        let Some(receipt) = receipt else {
            return Ok(None);
        };
        // Pending-block receipts from some providers carry no block number yet.
        if receipt.block_number.is_none() {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            tx_hash: tx_hash.to_string(),
            success: receipt.status == Some(U64::from(1)),
            block_number: receipt.block_number.map(|n| n.as_u64()),
            events: Self::decode_events(address, &receipt),
        }))
    }
}

/// Connects to real EVM endpoints.
pub struct EvmConnector {
    signer_key: Option<String>,
    call_timeout: Duration,
}

impl EvmConnector {
    pub fn new(signer_key: Option<String>, call_timeout: Duration) -> Self {
        Self {
            signer_key,
            call_timeout,
        }
    }

    async fn wallet(
        &self,
        network: &str,
        spec: &ProviderSpec,
        url: &str,
    ) -> Result<Option<LocalWallet>, ChainError> {
        let Some(key) = self.signer_key.as_deref() else {
            return Ok(None);
        };
        let wallet = key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| ChainError::Signer(format!("Invalid signing key: {}", e)))?;
        let chain_id = match chain_id_for(network) {
            Some(id) => id,
            None => {
                JsonRpcClient::new(url.to_string(), spec.probe_timeout)?
                    .get_chain_id()
                    .await?
            }
        };
        Ok(Some(wallet.with_chain_id(chain_id)))
    }
}

#[async_trait]
impl Connector for EvmConnector {
    async fn connect(
        &self,
        network: &str,
        spec: &ProviderSpec,
        url: &str,
    ) -> Result<Arc<dyn ChainClient>, ChainError> {
        let wallet = match self.wallet(network, spec, url).await {
            Ok(wallet) => wallet,
            Err(err) => {
                // Reads stay live without a signer; writes will fall back.
                tracing::warn!("Signer unavailable for {} provider: {}", spec.kind, err);
                None
            }
        };
        let client = EvmClient::new(url, spec.probe_timeout, self.call_timeout, wallet)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_match_contract_surface() {
        // Method table matches the deployed ABI
        assert_eq!(ContractCall::RegisterPlayer.signature(), "registerPlayer()");
        assert_eq!(
            ContractCall::MultiAttack {
                monster_id: 1,
                times: 2
            }
            .signature(),
            "multiAttack(uint256,uint256)"
        );
        assert_eq!(
            ContractCall::MintItem {
                recipient: "0x1".into(),
                token_uri: "ipfs://x".into(),
                item_type: "sword".into()
            }
            .signature(),
            "mintItem(address,string,string)"
        );
        assert_eq!(ContractCall::GetMonster { monster_id: 7 }.method(), "getMonster");
    }

    #[test]
    fn only_getters_are_reads() {
        // Only the two view methods are reads
        assert!(ContractCall::GetPlayerData {
            player: "0xabc".into()
        }
        .is_read());
        assert!(ContractCall::GetMonster { monster_id: 1 }.is_read());
        assert!(!ContractCall::ClaimDailyReward.is_read());
        assert!(!ContractCall::AttackMonster { monster_id: 1 }.is_read());
    }

    #[test]
    fn classify_message_sorts_failures() {
        // Provider error text maps onto the failure taxonomy
        assert!(matches!(
            classify_message("execution reverted: Player already registered".into()),
            ChainError::Reverted(_)
        ));
        assert!(matches!(
            classify_message("request timed out".into()),
            ChainError::Timeout(_)
        ));
        assert!(matches!(
            classify_message("Deserialization Error: expected value".into()),
            ChainError::Malformed(_)
        ));
        assert!(matches!(
            classify_message("connection refused".into()),
            ChainError::Unreachable(_)
        ));
    }

    #[test]
    fn u256_conversion_rejects_overflow() {
        // Values past u64 are malformed, not truncated
        assert_eq!(u256_to_u64(U256::from(42u64)).ok(), Some(42));
        assert!(matches!(
            u256_to_u64(U256::from(u64::MAX) + U256::one()),
            Err(ChainError::Malformed(_))
        ));
    }

    #[test]
    fn chain_ids_cover_known_networks() {
        // Known networks skip chain id discovery
        assert_eq!(chain_id_for("Sepolia"), Some(CHAIN_ID_SEPOLIA));
        assert_eq!(chain_id_for("mainnet"), Some(CHAIN_ID_MAINNET));
        assert_eq!(chain_id_for("unknown"), None);
    }

    #[test]
    fn tx_hash_parsing_requires_32_bytes() {
        // Short hashes are rejected
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(parse_tx_hash(&hash).is_ok());
        assert!(matches!(parse_tx_hash("0x1234"), Err(ChainError::Malformed(_))));
    }

    #[tokio::test]
    async fn evm_client_without_signer_cannot_submit() {
        // No key means no submit, and no network traffic for it
        let client = EvmClient::new(
            "http://127.0.0.1:9",
            Duration::from_millis(100),
            Duration::from_millis(100),
            None,
        )
        .expect("client builds");
        let result = client
            .submit(
                "0x5FbDB2315678afecb367f032d93F642f64180aa3",
                &ContractCall::RegisterPlayer,
            )
            .await;
        assert!(matches!(result, Err(ChainError::Signer(_))));
    }
}
