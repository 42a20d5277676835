//! EIP-712 digest computation for Safe transactions.
//!
//! `safe_tx_hash = keccak256(0x19 || 0x01 || domain_separator || struct_hash)`
//! with the domain bound to (chain id, wallet address).

use alloy::primitives::{b256, keccak256, Address, B256, U256};

use crate::domain::SafeTransaction;
use crate::ports::{HashingPort, PortError};

/// keccak256("SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)")
pub const SAFE_TX_TYPEHASH: B256 =
    b256!("0xbb8310d486368db6bd6f849402fdd73ad53d316b5a4b2644ad6efe0f941286d8");

/// keccak256("EIP712Domain(uint256 chainId,address verifyingContract)")
pub const DOMAIN_SEPARATOR_TYPEHASH: B256 =
    b256!("0x47e79534a245952e8b16893a336b85a3d9ea9fa8c573f3d803afb92a79469218");

pub fn domain_separator(chain_id: u64, safe: Address) -> B256 {
    let mut encoded = Vec::with_capacity(96);
    encoded.extend_from_slice(DOMAIN_SEPARATOR_TYPEHASH.as_slice());
    encoded.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    encoded.extend_from_slice(safe.into_word().as_slice());
    keccak256(&encoded)
}

pub fn safe_tx_struct_hash(tx: &SafeTransaction) -> B256 {
    let mut encoded = Vec::with_capacity(352);
    encoded.extend_from_slice(SAFE_TX_TYPEHASH.as_slice());
    encoded.extend_from_slice(tx.to.into_word().as_slice());
    encoded.extend_from_slice(&tx.value.to_be_bytes::<32>());
    // `bytes` fields are hashed, not inlined.
    encoded.extend_from_slice(keccak256(&tx.data).as_slice());
    encoded.extend_from_slice(&U256::from(tx.operation).to_be_bytes::<32>());
    encoded.extend_from_slice(&tx.safe_tx_gas.to_be_bytes::<32>());
    encoded.extend_from_slice(&tx.base_gas.to_be_bytes::<32>());
    encoded.extend_from_slice(&tx.gas_price.to_be_bytes::<32>());
    encoded.extend_from_slice(tx.gas_token.into_word().as_slice());
    encoded.extend_from_slice(tx.refund_receiver.into_word().as_slice());
    encoded.extend_from_slice(&U256::from(tx.nonce).to_be_bytes::<32>());
    keccak256(&encoded)
}

pub fn safe_tx_hash(chain_id: u64, safe: Address, tx: &SafeTransaction) -> B256 {
    let mut encoded = Vec::with_capacity(66);
    encoded.extend_from_slice(&[0x19, 0x01]);
    encoded.extend_from_slice(domain_separator(chain_id, safe).as_slice());
    encoded.extend_from_slice(safe_tx_struct_hash(tx).as_slice());
    keccak256(&encoded)
}

/// Production [`HashingPort`]: the in-crate EIP-712 implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeHasher;

impl HashingPort for SafeHasher {
    fn safe_tx_hash(
        &self,
        chain_id: u64,
        safe: Address,
        tx: &SafeTransaction,
    ) -> Result<B256, PortError> {
        Ok(safe_tx_hash(chain_id, safe, tx))
    }
}
