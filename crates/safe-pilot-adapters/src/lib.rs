pub mod chain;
pub mod config;
pub mod contracts;
pub mod custody;
pub mod relay;
pub mod tx_service;

pub use chain::ChainClient;
pub use config::{AppConfig, Operation, VaultConfig};
pub use contracts::DeploymentAddresses;
pub use custody::CustodySigner;
pub use relay::RelayClient;
pub use tx_service::TxServiceClient;
