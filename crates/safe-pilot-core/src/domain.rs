use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::ports::PortError;

pub const OPERATION_CALL: u8 = 0;
pub const OPERATION_DELEGATE_CALL: u8 = 1;

/// A Safe transaction descriptor with the full EIP-712 field set.
///
/// Serializes with the Transaction Service conventions: camelCase keys,
/// decimal strings for the uint256 fields, plain numbers for `operation`
/// and `nonce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransaction {
    pub to: Address,
    #[serde(with = "u256_decimal")]
    pub value: U256,
    #[serde(default, deserialize_with = "bytes_or_empty")]
    pub data: Bytes,
    pub operation: u8,
    #[serde(with = "u256_decimal")]
    pub safe_tx_gas: U256,
    #[serde(with = "u256_decimal")]
    pub base_gas: U256,
    #[serde(with = "u256_decimal")]
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub nonce: u64,
}

impl SafeTransaction {
    /// Plain CALL with the Safe SDK gas defaults (all zero, no refund).
    pub fn new_call(to: Address, value: U256, data: Bytes, nonce: u64) -> Self {
        Self {
            to,
            value,
            data,
            operation: OPERATION_CALL,
            safe_tx_gas: U256::ZERO,
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce,
        }
    }
}

/// Wallet state as reported by the Transaction Service `/safes/{address}/`
/// endpoint. The service has returned `nonce` both as a number and as a
/// string across versions, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeInfo {
    pub address: Address,
    #[serde(deserialize_with = "u64_number_or_string")]
    pub nonce: u64,
    pub threshold: u64,
    pub owners: Vec<Address>,
}

/// One collected co-signature on a proposed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRecord {
    pub owner: Address,
    pub signature: Bytes,
}

/// A transaction record held by the Transaction Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedTx {
    pub safe_tx_hash: B256,
    #[serde(flatten)]
    pub transaction: SafeTransaction,
    pub is_executed: bool,
    pub confirmations_required: u64,
    #[serde(default)]
    pub confirmations: Vec<ConfirmationRecord>,
}

/// Everything the Transaction Service needs to register a new proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub safe: Address,
    pub transaction: SafeTransaction,
    pub safe_tx_hash: B256,
    pub sender: Address,
    pub signature: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub tx_hash: B256,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayTask {
    pub task_id: String,
}

/// How a validated transaction leaves the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// `execTransaction` sent from the signer's own account.
    Direct,
    /// Sponsored relay task; the relay service pays gas.
    Sponsored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Executed(ExecutionResult),
    Relayed(RelayTask),
}

/// Lifecycle position of a Safe transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Draft,
    Signed,
    Proposed,
    Confirmed,
    ReadyToExecute,
    Executed,
    Relayed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Relayed | Self::Failed)
    }
}

/// The single in-flight transaction an orchestrator is driving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxFlow {
    pub safe: Address,
    pub transaction: SafeTransaction,
    pub safe_tx_hash: B256,
    pub status: TxStatus,
}

/// Accepts exactly the signature shape the wallet contract accepts from an
/// ECDSA owner: 65 bytes `r || s || v` with `v` in {27, 28}.
pub fn validate_signature_bytes(signature: &Bytes) -> Result<(), PortError> {
    if signature.len() != 65 {
        return Err(PortError::Validation(format!(
            "signature must be 65 bytes, got {}",
            signature.len()
        )));
    }
    let v = signature[64];
    if v != 27 && v != 28 {
        return Err(PortError::Validation(format!(
            "signature v must be 27 or 28, got {v}"
        )));
    }
    Ok(())
}

/// Packs collected confirmations into the byte blob `execTransaction`
/// expects: signatures concatenated in ascending owner-address order.
pub fn pack_signatures(confirmations: &[ConfirmationRecord]) -> Result<Bytes, PortError> {
    let mut sorted: Vec<&ConfirmationRecord> = confirmations.iter().collect();
    sorted.sort_by_key(|c| c.owner);
    for pair in sorted.windows(2) {
        if pair[0].owner == pair[1].owner {
            return Err(PortError::Validation(format!(
                "duplicate confirmation from owner {}",
                pair[0].owner
            )));
        }
    }
    let mut packed = Vec::with_capacity(sorted.len() * 65);
    for confirmation in sorted {
        validate_signature_bytes(&confirmation.signature)?;
        packed.extend_from_slice(&confirmation.signature);
    }
    Ok(Bytes::from(packed))
}

mod u256_decimal {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// The service reports `data: null` for plain transfers.
fn bytes_or_empty<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Bytes>::deserialize(deserializer)?.unwrap_or_default())
}

fn u64_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
