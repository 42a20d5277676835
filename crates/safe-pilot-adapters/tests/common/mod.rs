#![allow(dead_code)]

use std::path::PathBuf;

use alloy::primitives::{Address, Bytes, B256, U256};

use safe_pilot_core::SafeTransaction;

pub const VAULT_SECRET: &[u8] = b"vault-shared-secret-fixture";

pub fn safe_address() -> Address {
    "0x000000000000000000000000000000000000BEEF"
        .parse()
        .expect("valid safe address")
}

pub fn quiet_safe_address() -> Address {
    "0x000000000000000000000000000000000000CAFE"
        .parse()
        .expect("valid safe address")
}

pub fn owner_address() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid owner address")
}

pub fn token_address() -> Address {
    "0xd6981777F89aCD65bcD4deEE1EF78f40331AF80c"
        .parse()
        .expect("valid token address")
}

pub fn sample_hash(seed: u8) -> B256 {
    B256::repeat_byte(seed)
}

pub fn signature_bytes(seed: u8) -> Bytes {
    let mut raw = vec![seed; 65];
    raw[64] = 27;
    Bytes::from(raw)
}

pub fn sample_transaction(nonce: u64) -> SafeTransaction {
    SafeTransaction::new_call(
        token_address(),
        U256::ZERO,
        Bytes::from(vec![0xab, 0xcd, 0xef, 0x01]),
        nonce,
    )
}

/// Writes the fixture secret to a per-process temp file the vault client can
/// read back.
pub fn write_vault_secret(tag: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "safe-pilot-vault-secret-{tag}-{}",
        std::process::id()
    ));
    std::fs::write(&path, VAULT_SECRET).expect("write vault secret");
    path
}
