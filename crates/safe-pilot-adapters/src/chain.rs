//! On-chain client for the proxy factory and the wallet contract.

use alloy::network::primitives::ReceiptResponse;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;

use safe_pilot_core::{ChainPort, ExecutionResult, PortError, SafeTransaction};

use crate::contracts::{
    compute_proxy_address, encode_setup_call, DeploymentAddresses, ISafe, ISafeProxyFactory,
};
use crate::custody::CustodySigner;

/// One provider per process, wallet-filled so deployment and execution
/// transactions are signed by the custody vault.
#[derive(Debug, Clone)]
pub struct ChainClient {
    provider: DynProvider,
    addresses: DeploymentAddresses,
}

impl ChainClient {
    pub fn connect(rpc_url: &str, signer: CustodySigner) -> Result<Self, PortError> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid rpc url '{rpc_url}': {e}")))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        Ok(Self {
            provider,
            addresses: DeploymentAddresses::v1_4_1(),
        })
    }

    pub fn addresses(&self) -> DeploymentAddresses {
        self.addresses
    }
}

#[async_trait]
impl ChainPort for ChainClient {
    async fn deploy_wallet(
        &self,
        owners: &[Address],
        threshold: u64,
        salt_nonce: U256,
    ) -> Result<Address, PortError> {
        let initializer = encode_setup_call(owners, threshold, self.addresses.fallback_handler);
        let factory = ISafeProxyFactory::new(self.addresses.proxy_factory, &self.provider);

        let creation_code = factory
            .proxyCreationCode()
            .call()
            .await
            .map_err(|e| classify("proxy creation code fetch", &e))?;
        let wallet = compute_proxy_address(
            self.addresses.proxy_factory,
            self.addresses.singleton,
            &initializer,
            salt_nonce,
            &creation_code,
        );

        let pending = factory
            .createProxyWithNonce(self.addresses.singleton, initializer, salt_nonce)
            .send()
            .await
            .map_err(|e| classify("wallet deployment", &e))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| PortError::Transport(format!("deployment receipt fetch failed: {e}")))?;
        if !receipt.status() {
            return Err(PortError::Rejection(format!(
                "wallet deployment reverted in {}",
                receipt.transaction_hash
            )));
        }

        // The factory deploys at the CREATE2 address derived above; an empty
        // account there means the proxy was not created.
        let code = self
            .provider
            .get_code_at(wallet)
            .await
            .map_err(|e| PortError::Transport(format!("deployed code check failed: {e}")))?;
        if code.is_empty() {
            return Err(PortError::Rejection(format!(
                "no wallet code at computed address {wallet}"
            )));
        }

        tracing::info!(%wallet, tx = %receipt.transaction_hash, "wallet deployed");
        Ok(wallet)
    }

    async fn validate_transaction(
        &self,
        safe: Address,
        tx: &SafeTransaction,
        signatures: &Bytes,
    ) -> Result<bool, PortError> {
        let wallet = ISafe::new(safe, &self.provider);
        let call = wallet.execTransaction(
            tx.to,
            tx.value,
            tx.data.clone(),
            tx.operation,
            tx.safe_tx_gas,
            tx.base_gas,
            tx.gas_price,
            tx.gas_token,
            tx.refund_receiver,
            signatures.clone(),
        );

        match call.call().await {
            Ok(valid) => Ok(valid),
            Err(error) => match classify("transaction validity check", &error) {
                PortError::Rejection(reason) => {
                    tracing::debug!(%safe, %reason, "validity check reverted");
                    Ok(false)
                }
                other => Err(other),
            },
        }
    }

    async fn execute_transaction(
        &self,
        safe: Address,
        tx: &SafeTransaction,
        signatures: &Bytes,
    ) -> Result<ExecutionResult, PortError> {
        let wallet = ISafe::new(safe, &self.provider);
        let pending = wallet
            .execTransaction(
                tx.to,
                tx.value,
                tx.data.clone(),
                tx.operation,
                tx.safe_tx_gas,
                tx.base_gas,
                tx.gas_price,
                tx.gas_token,
                tx.refund_receiver,
                signatures.clone(),
            )
            .send()
            .await
            .map_err(|e| classify("execTransaction submission", &e))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| PortError::Transport(format!("execution receipt fetch failed: {e}")))?;

        let result = ExecutionResult {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
        };
        tracing::info!(%safe, tx = %result.tx_hash, success = result.success, "execTransaction mined");
        Ok(result)
    }
}

// A node that answered with an error payload rejected the request; anything
// else never produced an answer at all.
fn classify(context: &str, error: &alloy::contract::Error) -> PortError {
    match error {
        alloy::contract::Error::TransportError(rpc) if rpc.as_error_resp().is_some() => {
            PortError::Rejection(format!("{context} rejected: {error}"))
        }
        _ => PortError::Transport(format!("{context} failed: {error}")),
    }
}
