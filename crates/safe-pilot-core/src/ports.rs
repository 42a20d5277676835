use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ExecutionResult, Proposal, ProposedTx, RelayTask, SafeInfo, SafeTransaction};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("credential error: {0}")]
    Credential(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote rejection: {0}")]
    Rejection(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Key-custody signing provider: holds the key, signs 32-byte digests.
#[async_trait]
pub trait SignerPort: Send + Sync {
    /// The signing address, known once the provider context is built.
    fn address(&self) -> Address;
    async fn sign_digest(&self, digest: B256) -> Result<Bytes, PortError>;
}

/// On-chain collaborator: the proxy factory and the wallet contract.
#[async_trait]
pub trait ChainPort: Send + Sync {
    async fn deploy_wallet(
        &self,
        owners: &[Address],
        threshold: u64,
        salt_nonce: U256,
    ) -> Result<Address, PortError>;

    /// Whether `execTransaction` with these signatures would currently
    /// succeed (the wallet's own threshold/signature checks included).
    async fn validate_transaction(
        &self,
        safe: Address,
        tx: &SafeTransaction,
        signatures: &Bytes,
    ) -> Result<bool, PortError>;

    async fn execute_transaction(
        &self,
        safe: Address,
        tx: &SafeTransaction,
        signatures: &Bytes,
    ) -> Result<ExecutionResult, PortError>;
}

/// The Transaction Service: off-chain proposal and confirmation collection.
#[async_trait]
pub trait TxServicePort: Send + Sync {
    async fn safe_info(&self, safe: Address) -> Result<SafeInfo, PortError>;
    async fn next_nonce(&self, safe: Address) -> Result<u64, PortError>;
    async fn propose(&self, proposal: &Proposal) -> Result<(), PortError>;
    async fn confirm(&self, safe_tx_hash: B256, signature: &Bytes) -> Result<(), PortError>;
    async fn get_transaction(&self, safe_tx_hash: B256) -> Result<ProposedTx, PortError>;
    async fn pending_transactions(&self, safe: Address) -> Result<Vec<ProposedTx>, PortError>;
}

/// Gasless relay: sponsored execution of an already-confirmed transaction.
#[async_trait]
pub trait RelayPort: Send + Sync {
    async fn relay_execution(
        &self,
        safe: Address,
        tx: &SafeTransaction,
        signatures: &Bytes,
    ) -> Result<RelayTask, PortError>;

    async fn task_status(&self, task_id: &str) -> Result<String, PortError>;
}

/// Safe transaction digest computation. Pure, but kept behind a port so the
/// orchestration tests can substitute sentinel hashes.
pub trait HashingPort: Send + Sync {
    fn safe_tx_hash(
        &self,
        chain_id: u64,
        safe: Address,
        tx: &SafeTransaction,
    ) -> Result<B256, PortError>;
}
