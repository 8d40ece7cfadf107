pub mod dispatcher;
pub mod gateway;
pub mod onchain;
pub mod provider_selector;
pub mod session;
pub mod simulation;

#[cfg(test)]
pub(crate) mod mock;

pub use dispatcher::{ActionStatus, GameActionDispatcher};
pub use gateway::ChainGateway;
pub use onchain::EvmConnector;
pub use provider_selector::ProviderSelector;
pub use session::SessionBridge;
pub use simulation::SimulationOracle;
