//! REST client for the Safe Transaction Service.

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use safe_pilot_core::{PortError, Proposal, ProposedTx, SafeInfo, SafeTransaction, TxServicePort};

#[derive(Debug, Clone)]
pub struct TxServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl TxServiceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: String,
        context: &str,
    ) -> Result<T, PortError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("{context} request failed: {e}")))?;
        let response = check_status(response, context).await?;
        response
            .json()
            .await
            .map_err(|e| PortError::Validation(format!("malformed {context} response: {e}")))
    }
}

#[async_trait]
impl TxServicePort for TxServiceClient {
    async fn safe_info(&self, safe: Address) -> Result<SafeInfo, PortError> {
        self.get_json(format!("/api/v1/safes/{safe}/"), "safe info")
            .await
    }

    /// The next usable nonce: the wallet's on-chain counter unless the queue
    /// already holds a higher-numbered proposal.
    async fn next_nonce(&self, safe: Address) -> Result<u64, PortError> {
        let info = self.safe_info(safe).await?;
        let page: Paginated<ProposedTx> = self
            .get_json(
                format!(
                    "/api/v1/safes/{safe}/multisig-transactions/?executed=false&ordering=-nonce&limit=1"
                ),
                "queued transactions",
            )
            .await?;
        let next = match page.results.first() {
            Some(queued) => info.nonce.max(queued.transaction.nonce + 1),
            None => info.nonce,
        };
        Ok(next)
    }

    async fn propose(&self, proposal: &Proposal) -> Result<(), PortError> {
        let url = format!(
            "{}/api/v1/safes/{}/multisig-transactions/",
            self.base_url, proposal.safe
        );
        let body = ProposeBody {
            transaction: &proposal.transaction,
            contract_transaction_hash: proposal.safe_tx_hash,
            sender: proposal.sender,
            signature: &proposal.signature,
        };
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("proposal request failed: {e}")))?;
        check_status(response, "proposal").await?;
        tracing::info!(
            safe = %proposal.safe,
            hash = %proposal.safe_tx_hash,
            nonce = proposal.transaction.nonce,
            "transaction proposed"
        );
        Ok(())
    }

    async fn confirm(&self, safe_tx_hash: B256, signature: &Bytes) -> Result<(), PortError> {
        let url = format!(
            "{}/api/v1/multisig-transactions/{safe_tx_hash}/confirmations/",
            self.base_url
        );
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "signature": signature }))
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("confirmation request failed: {e}")))?;
        check_status(response, "confirmation").await?;
        tracing::info!(hash = %safe_tx_hash, "confirmation recorded");
        Ok(())
    }

    async fn get_transaction(&self, safe_tx_hash: B256) -> Result<ProposedTx, PortError> {
        self.get_json(
            format!("/api/v1/multisig-transactions/{safe_tx_hash}/"),
            "transaction lookup",
        )
        .await
    }

    async fn pending_transactions(&self, safe: Address) -> Result<Vec<ProposedTx>, PortError> {
        let page: Paginated<ProposedTx> = self
            .get_json(
                format!("/api/v1/safes/{safe}/multisig-transactions/?executed=false"),
                "pending transactions",
            )
            .await?;
        Ok(page.results)
    }
}

/// Proposal payload; the service checks `contractTransactionHash` against its
/// own digest of the flattened fields and rejects mismatches.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProposeBody<'a> {
    #[serde(flatten)]
    transaction: &'a SafeTransaction,
    contract_transaction_hash: B256,
    sender: Address,
    signature: &'a Bytes,
}

#[derive(Deserialize)]
struct Paginated<T> {
    results: Vec<T>,
}

async fn check_status(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, PortError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(PortError::Credential(format!(
            "{context}: service returned {status}"
        )));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PortError::Rejection(format!("{context}: {status}: {body}")));
    }
    Ok(response)
}
