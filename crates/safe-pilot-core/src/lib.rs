pub mod domain;
pub mod hashing;
pub mod orchestrator;
pub mod ports;
pub mod state_machine;

pub use domain::{
    pack_signatures, validate_signature_bytes, ConfirmationRecord, ExecutionOutcome,
    ExecutionResult, ExecutionStrategy, Proposal, ProposedTx, RelayTask, SafeInfo,
    SafeTransaction, TxFlow, TxStatus, OPERATION_CALL, OPERATION_DELEGATE_CALL,
};
pub use hashing::{
    domain_separator, safe_tx_hash, safe_tx_struct_hash, SafeHasher, DOMAIN_SEPARATOR_TYPEHASH,
    SAFE_TX_TYPEHASH,
};
pub use orchestrator::Orchestrator;
pub use ports::{ChainPort, HashingPort, PortError, RelayPort, SignerPort, TxServicePort};
pub use state_machine::{derive_status, tx_transition, LifecycleAction, StateTransition};
