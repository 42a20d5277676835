//! Environment-backed configuration.
//!
//! Everything the binary needs arrives through `SAFE_PILOT_*` variables and
//! is parsed and cross-checked here, before any network call is made.

use std::path::PathBuf;
use std::str::FromStr;

use alloy::primitives::{Address, B256, U256};

use safe_pilot_core::{ExecutionStrategy, PortError};

const ENV_PREFIX: &str = "SAFE_PILOT_";

pub const DEFAULT_CHAIN_ID: u64 = 11155111;
pub const DEFAULT_TX_SERVICE_URL: &str = "https://safe-transaction-sepolia.safe.global";
pub const DEFAULT_RELAY_URL: &str = "https://api.gelato.digital";
pub const DEFAULT_TOKEN_ADDRESS: &str = "0xd6981777F89aCD65bcD4deEE1EF78f40331AF80c";
pub const DEFAULT_MINT_AMOUNT: &str = "199446851080883354501";

/// The lifecycle operation a single process run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deploy,
    Propose,
    Confirm,
    Execute,
    Pending,
    Status,
}

impl FromStr for Operation {
    type Err = PortError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "deploy" => Ok(Self::Deploy),
            "propose" => Ok(Self::Propose),
            "confirm" => Ok(Self::Confirm),
            "execute" => Ok(Self::Execute),
            "pending" => Ok(Self::Pending),
            "status" => Ok(Self::Status),
            other => Err(PortError::Validation(format!(
                "unknown operation '{other}' (expected deploy, propose, confirm, execute, pending or status)"
            ))),
        }
    }
}

/// Custody vault connection parameters.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub base_url: String,
    pub api_key: String,
    pub secret_path: PathBuf,
    pub account: u64,
}

/// Validated process configuration (one chain, one operation per run).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub tx_service_url: String,
    pub relay_url: String,
    pub relay_api_key: Option<String>,
    pub vault: VaultConfig,
    pub safe_address: Option<Address>,
    pub operation: Operation,
    pub strategy: ExecutionStrategy,
    pub token_address: Address,
    pub mint_amount: U256,
    pub tx_hash: Option<B256>,
}

impl AppConfig {
    /// Reads and validates the full configuration from the environment.
    ///
    /// Missing key material is a `Credential` error; every other missing or
    /// malformed value is `Validation`.
    pub fn from_env() -> Result<Self, PortError> {
        let chain_id = match var("CHAIN_ID") {
            Some(raw) => raw
                .parse()
                .map_err(|e| PortError::Validation(format!("invalid SAFE_PILOT_CHAIN_ID: {e}")))?,
            None => DEFAULT_CHAIN_ID,
        };

        let rpc_url = var("RPC_URL")
            .ok_or_else(|| PortError::Validation("SAFE_PILOT_RPC_URL is required".to_owned()))?;

        let tx_service_url =
            var("TX_SERVICE_URL").unwrap_or_else(|| DEFAULT_TX_SERVICE_URL.to_owned());
        let relay_url = var("RELAY_URL").unwrap_or_else(|| DEFAULT_RELAY_URL.to_owned());
        let relay_api_key = var("RELAY_API_KEY");

        let vault = VaultConfig {
            base_url: var("VAULT_URL").ok_or_else(|| {
                PortError::Validation("SAFE_PILOT_VAULT_URL is required".to_owned())
            })?,
            api_key: var("VAULT_API_KEY").ok_or_else(|| {
                PortError::Credential("SAFE_PILOT_VAULT_API_KEY is required".to_owned())
            })?,
            secret_path: var("VAULT_SECRET_PATH")
                .map(PathBuf::from)
                .ok_or_else(|| {
                    PortError::Credential("SAFE_PILOT_VAULT_SECRET_PATH is required".to_owned())
                })?,
            account: match var("VAULT_ACCOUNT") {
                Some(raw) => raw.parse().map_err(|e| {
                    PortError::Validation(format!("invalid SAFE_PILOT_VAULT_ACCOUNT: {e}"))
                })?,
                None => 0,
            },
        };

        let safe_address = var("SAFE_ADDRESS")
            .map(|raw| {
                raw.parse().map_err(|e| {
                    PortError::Validation(format!("invalid SAFE_PILOT_SAFE_ADDRESS: {e}"))
                })
            })
            .transpose()?;

        let operation = match var("OPERATION") {
            Some(raw) => raw.parse()?,
            None => Operation::Propose,
        };

        let strategy = match var("STRATEGY") {
            Some(raw) => parse_strategy(&raw)?,
            None => ExecutionStrategy::Direct,
        };

        let token_address = var("TOKEN_ADDRESS")
            .unwrap_or_else(|| DEFAULT_TOKEN_ADDRESS.to_owned())
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid SAFE_PILOT_TOKEN_ADDRESS: {e}")))?;

        let mint_amount = var("MINT_AMOUNT")
            .unwrap_or_else(|| DEFAULT_MINT_AMOUNT.to_owned())
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid SAFE_PILOT_MINT_AMOUNT: {e}")))?;

        let tx_hash = var("TX_HASH")
            .map(|raw| {
                raw.parse().map_err(|e| {
                    PortError::Validation(format!("invalid SAFE_PILOT_TX_HASH: {e}"))
                })
            })
            .transpose()?;

        let config = Self {
            chain_id,
            rpc_url,
            tx_service_url,
            relay_url,
            relay_api_key,
            vault,
            safe_address,
            operation,
            strategy,
            token_address,
            mint_amount,
            tx_hash,
        };
        config.check_operation_inputs()?;
        Ok(config)
    }

    // The per-operation requirements, rejected up front rather than deep in
    // an operation half-way through its network calls.
    fn check_operation_inputs(&self) -> Result<(), PortError> {
        if self.operation != Operation::Deploy && self.safe_address.is_none() {
            return Err(PortError::Validation(format!(
                "SAFE_PILOT_SAFE_ADDRESS is required for the {:?} operation",
                self.operation
            )));
        }
        if matches!(
            self.operation,
            Operation::Confirm | Operation::Execute | Operation::Status
        ) && self.tx_hash.is_none()
        {
            return Err(PortError::Validation(format!(
                "SAFE_PILOT_TX_HASH is required for the {:?} operation",
                self.operation
            )));
        }
        if self.operation == Operation::Execute
            && self.strategy == ExecutionStrategy::Sponsored
            && self.relay_api_key.is_none()
        {
            return Err(PortError::Credential(
                "SAFE_PILOT_RELAY_API_KEY is required for the sponsored strategy".to_owned(),
            ));
        }
        Ok(())
    }
}

fn var(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}"))
        .ok()
        .filter(|v| !v.is_empty())
}

fn parse_strategy(raw: &str) -> Result<ExecutionStrategy, PortError> {
    match raw.to_ascii_lowercase().as_str() {
        "direct" => Ok(ExecutionStrategy::Direct),
        "sponsored" => Ok(ExecutionStrategy::Sponsored),
        other => Err(PortError::Validation(format!(
            "unknown strategy '{other}' (expected direct or sponsored)"
        ))),
    }
}
