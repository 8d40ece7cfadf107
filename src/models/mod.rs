// src/models/mod.rs
pub mod game;
pub mod network;
pub mod record;

pub use game::{
    ActionEffect, ActionError, ActionKind, ActionOutcome, ActionState, ErrorKind, GameAction,
    GameEvent, MonsterInfo, Payload, PlayerSnapshot, WriteResult,
};
pub use network::{NetworkConfig, ProviderKind, ProviderSpec};
pub use record::{ApiResponse, PlayerRecord};
