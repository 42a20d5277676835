//! Gasless relay client for Gelato sponsored calls.

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::Deserialize;

use safe_pilot_core::{PortError, RelayPort, RelayTask, SafeTransaction};

use crate::contracts::ISafe;

#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
    chain_id: u64,
    api_key: Option<String>,
}

impl RelayClient {
    pub fn new(base_url: &str, chain_id: u64, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            chain_id,
            api_key,
        }
    }
}

#[async_trait]
impl RelayPort for RelayClient {
    async fn relay_execution(
        &self,
        safe: Address,
        tx: &SafeTransaction,
        signatures: &Bytes,
    ) -> Result<RelayTask, PortError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PortError::Credential("relay sponsor key not configured".to_owned()))?;

        // The relay submits raw calldata, so the wallet call is encoded here
        // rather than on the wallet contract binding.
        let data = ISafe::execTransactionCall {
            to: tx.to,
            value: tx.value,
            data: tx.data.clone(),
            operation: tx.operation,
            safeTxGas: tx.safe_tx_gas,
            baseGas: tx.base_gas,
            gasPrice: tx.gas_price,
            gasToken: tx.gas_token,
            refundReceiver: tx.refund_receiver,
            signatures: signatures.clone(),
        }
        .abi_encode();

        let response = self
            .client
            .post(format!("{}/relays/v2/sponsored-call", self.base_url))
            .json(&serde_json::json!({
                "chainId": self.chain_id,
                "target": safe,
                "data": Bytes::from(data),
                "sponsorApiKey": api_key,
            }))
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("sponsored call request failed: {e}")))?;
        let response = check_status(response, "sponsored call").await?;
        let task: RelayTask = response
            .json()
            .await
            .map_err(|e| PortError::Validation(format!("malformed sponsored call response: {e}")))?;
        tracing::info!(%safe, task = %task.task_id, "sponsored call submitted");
        Ok(task)
    }

    async fn task_status(&self, task_id: &str) -> Result<String, PortError> {
        let response = self
            .client
            .get(format!("{}/tasks/status/{task_id}", self.base_url))
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("task status request failed: {e}")))?;
        let response = check_status(response, "task status").await?;
        let status: TaskStatusResponse = response
            .json()
            .await
            .map_err(|e| PortError::Validation(format!("malformed task status response: {e}")))?;
        Ok(status.task.task_state)
    }
}

#[derive(Deserialize)]
struct TaskStatusResponse {
    task: TaskState,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskState {
    task_state: String,
}

async fn check_status(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, PortError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(PortError::Credential(format!(
            "{context}: relay returned {status}"
        )));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PortError::Rejection(format!("{context}: {status}: {body}")));
    }
    Ok(response)
}
