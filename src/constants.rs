/// Application constants

// Networks
pub const DEFAULT_NETWORK: &str = "sepolia";
pub const KNOWN_NETWORKS: [&str; 4] = ["mainnet", "sepolia", "holesky", "localhost"];

// Provider URL templates ({network} and {key} are substituted)
pub const ALCHEMY_URL_TEMPLATE: &str = "https://eth-{network}.g.alchemy.com/v2/{key}";
pub const INFURA_URL_TEMPLATE: &str = "https://{network}.infura.io/v3/{key}";
pub const PUBLIC_RPC_MAINNET: &str = "https://ethereum-rpc.publicnode.com";
pub const PUBLIC_RPC_SEPOLIA: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const PUBLIC_RPC_HOLESKY: &str = "https://ethereum-holesky-rpc.publicnode.com";
pub const PUBLIC_RPC_LOCALHOST: &str = "http://127.0.0.1:8545";

// Chain ids for signing
pub const CHAIN_ID_MAINNET: u64 = 1;
pub const CHAIN_ID_SEPOLIA: u64 = 11_155_111;
pub const CHAIN_ID_HOLESKY: u64 = 17_000;
pub const CHAIN_ID_LOCALHOST: u64 = 31_337;

// Timeouts
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROVIDER_CACHE_TTL_SECS: u64 = 0;
/// Resolved action slots older than this are dropped on the next dispatch.
pub const ACTION_SLOT_RETENTION_SECS: u64 = 600;

// Game balance
pub const DEFAULT_MAX_MULTI_ATTACK: u64 = 100;
pub const DEFAULT_DAILY_REWARD_COOLDOWN_HOURS: i64 = 24;
pub const MAX_DAILY_REWARD_COOLDOWN_HOURS: i64 = 24 * 366;
pub const SIM_DAMAGE_MIN: u64 = 1;
pub const SIM_DAMAGE_MAX: u64 = 25;
pub const SIM_DAILY_REWARD_MIN: u64 = 50;
pub const SIM_DAILY_REWARD_MAX: u64 = 150;
pub const SIM_DEFEAT_REWARD_MIN: u64 = 5;
pub const SIM_DEFEAT_REWARD_MAX: u64 = 50;
pub const SIM_TOKEN_ID_MIN: u64 = 1_000_000;
pub const SIM_TOKEN_ID_MAX: u64 = 9_999_999;
pub const SIM_MAX_LEVEL: u64 = 30;
pub const EXPERIENCE_PER_LEVEL: u64 = 100;
pub const COINS_PER_LEVEL: u64 = 250;

// Areas, in unlock order
pub const KNOWN_AREAS: [&str; 5] = ["forest", "cave", "mountain", "desert", "volcano"];
pub const STARTING_AREA: &str = "forest";

/// (id, name, max_hp, level)
pub const MONSTERS: [(u64, &str, u64, u64); 10] = [
    (1, "Slime", 50, 1),
    (2, "Goblin", 120, 2),
    (3, "Wolf", 200, 3),
    (4, "Cave Bat", 320, 5),
    (5, "Skeleton", 500, 7),
    (6, "Troll", 800, 10),
    (7, "Sand Wyrm", 1_200, 14),
    (8, "Fire Imp", 1_800, 18),
    (9, "Golem", 2_600, 23),
    (10, "Dragon", 4_000, 30),
];

// Persistence
pub const REDIS_PLAYER_KEY_PREFIX: &str = "clicker:player:";

// API version
pub const API_VERSION: &str = "v1";
