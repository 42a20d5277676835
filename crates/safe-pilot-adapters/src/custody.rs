//! Custody vault client: a remote signer that never exposes key material.
//!
//! Every request carries an HMAC-SHA256 of
//! `"{timestamp}\n{METHOD}\n{path}\n{body}"` keyed by the API secret, so the
//! vault can authenticate the caller without a session. The connected signer
//! also implements alloy's `Signer`/`TxSigner`, letting the chain client's
//! wallet filler sign deployment and execution transactions through the
//! vault.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::consensus::SignableTransaction;
use alloy::network::TxSigner;
use alloy::primitives::{Address, Bytes, ChainId, Signature, B256, U256};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use safe_pilot_core::{validate_signature_bytes, PortError, SignerPort};

use crate::config::VaultConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct CustodySigner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    secret: Vec<u8>,
    account: u64,
    address: Address,
    chain_id: Option<ChainId>,
}

impl std::fmt::Debug for CustodySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodySigner")
            .field("base_url", &self.base_url)
            .field("account", &self.account)
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    address: Address,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    signature: Bytes,
}

impl CustodySigner {
    /// Reads the API secret and performs one authenticated address lookup,
    /// returning a signer that is ready to use everywhere else.
    pub async fn connect(config: &VaultConfig, chain_id: u64) -> Result<Self, PortError> {
        let secret = std::fs::read(&config.secret_path).map_err(|e| {
            PortError::Credential(format!(
                "cannot read vault secret {}: {e}",
                config.secret_path.display()
            ))
        })?;

        let mut signer = Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            secret,
            account: config.account,
            address: Address::ZERO,
            chain_id: Some(chain_id),
        };

        let path = format!("/v1/accounts/{}/eth/address", signer.account);
        let value = signer.send_signed(Method::GET, &path, None).await?;
        let parsed: AddressResponse = serde_json::from_value(value).map_err(|e| {
            PortError::Validation(format!("malformed vault address response: {e}"))
        })?;
        signer.address = parsed.address;

        tracing::debug!(address = %signer.address, account = signer.account, "vault signer connected");
        Ok(signer)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn send_signed(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, PortError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let body_text = match &body {
            Some(value) => serde_json::to_string(value).map_err(|e| {
                PortError::Validation(format!("vault request serialization failed: {e}"))
            })?,
            None => String::new(),
        };

        let payload = format!("{timestamp}\n{}\n{path}\n{body_text}", method.as_str());
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .map_err(|e| PortError::Credential(format!("vault hmac init failed: {e}")))?;
        mac.update(payload.as_bytes());
        let signature = alloy::hex::encode(mac.finalize().into_bytes());

        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .header("X-Timestamp", timestamp.to_string())
            .header("X-Signature", signature);
        if body.is_some() {
            // The signed bytes must be the sent bytes, so the serialized
            // string goes out as-is instead of through .json().
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body_text);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("vault request failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PortError::Transport(format!("vault response read failed: {e}")))?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(PortError::Credential(format!(
                "vault rejected credentials ({status}): {text}"
            )));
        }
        if !status.is_success() {
            return Err(PortError::Rejection(format!("vault {status}: {text}")));
        }

        serde_json::from_str(&text)
            .map_err(|e| PortError::Validation(format!("malformed vault response: {e}")))
    }
}

#[async_trait]
impl SignerPort for CustodySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_digest(&self, digest: B256) -> Result<Bytes, PortError> {
        let path = format!("/v1/accounts/{}/eth/sign", self.account);
        let body = serde_json::json!({ "digest": digest });
        let value = self.send_signed(Method::POST, &path, Some(body)).await?;
        let parsed: SignResponse = serde_json::from_value(value)
            .map_err(|e| PortError::Validation(format!("malformed vault sign response: {e}")))?;

        let signature = normalize_v(parsed.signature)?;
        validate_signature_bytes(&signature)?;
        Ok(signature)
    }
}

#[async_trait]
impl alloy::signers::Signer for CustodySigner {
    async fn sign_hash(&self, hash: &B256) -> alloy::signers::Result<Signature> {
        let bytes = self
            .sign_digest(*hash)
            .await
            .map_err(alloy::signers::Error::other)?;
        decode_signature(&bytes).map_err(alloy::signers::Error::other)
    }

    fn address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> Option<ChainId> {
        self.chain_id
    }

    fn set_chain_id(&mut self, chain_id: Option<ChainId>) {
        self.chain_id = chain_id;
    }
}

#[async_trait]
impl TxSigner<Signature> for CustodySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_transaction(
        &self,
        tx: &mut dyn SignableTransaction<Signature>,
    ) -> alloy::signers::Result<Signature> {
        if let Some(chain_id) = self.chain_id {
            match tx.chain_id() {
                Some(tx_chain_id) if tx_chain_id != chain_id => {
                    return Err(alloy::signers::Error::TransactionChainIdMismatch {
                        signer: chain_id,
                        tx: tx_chain_id,
                    });
                }
                _ => tx.set_chain_id(chain_id),
            }
        }
        alloy::signers::Signer::sign_hash(self, &tx.signature_hash()).await
    }
}

// Vaults disagree on the recovery byte; the wallet contract only accepts the
// legacy 27/28 form.
fn normalize_v(signature: Bytes) -> Result<Bytes, PortError> {
    if signature.len() != 65 {
        return Err(PortError::Validation(format!(
            "vault signature must be 65 bytes, got {}",
            signature.len()
        )));
    }
    let mut raw = signature.to_vec();
    raw[64] = match raw[64] {
        0 | 27 => 27,
        1 | 28 => 28,
        other => {
            return Err(PortError::Validation(format!(
                "vault signature v must be 0, 1, 27 or 28, got {other}"
            )))
        }
    };
    Ok(Bytes::from(raw))
}

fn decode_signature(bytes: &Bytes) -> Result<Signature, PortError> {
    validate_signature_bytes(bytes)?;
    let r = U256::from_be_slice(&bytes[..32]);
    let s = U256::from_be_slice(&bytes[32..64]);
    Ok(Signature::new(r, s, bytes[64] == 28))
}
