//! One entrypoint per operation the process can be asked to run.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use eyre::eyre;

use safe_pilot_adapters::contracts::IMintableToken;
use safe_pilot_adapters::{AppConfig, ChainClient, CustodySigner, RelayClient, TxServiceClient};
use safe_pilot_core::{ExecutionOutcome, Orchestrator, PortError, SafeHasher};

pub type PilotOrchestrator =
    Orchestrator<CustodySigner, ChainClient, TxServiceClient, RelayClient, SafeHasher>;

/// Deploys a fresh 1-of-1 wallet owned by the vault signer. Every run
/// deploys a new wallet; the salt is the current time.
pub async fn deploy(orchestrator: &PilotOrchestrator) -> eyre::Result<()> {
    let owner = orchestrator.signer.address();
    let address = orchestrator
        .deploy_wallet(&[owner], 1, fresh_salt())
        .await?;
    tracing::info!(%address, %owner, "wallet ready");
    Ok(())
}

/// Builds and proposes a token mint to the wallet itself.
pub async fn propose(orchestrator: &PilotOrchestrator, config: &AppConfig) -> eyre::Result<()> {
    let safe = require_safe(config)?;
    let data = mint_calldata(safe, config.mint_amount);
    let tx = orchestrator
        .build_transaction(safe, config.token_address, U256::ZERO, data)
        .await?;
    let safe_tx_hash = orchestrator.propose().await?;
    tracing::info!(%safe_tx_hash, nonce = tx.nonce, token = %config.token_address, "proposal registered");
    Ok(())
}

/// Co-signs a transaction somebody else proposed.
pub async fn confirm(orchestrator: &PilotOrchestrator, config: &AppConfig) -> eyre::Result<()> {
    let safe_tx_hash = require_tx_hash(config)?;
    orchestrator.confirm(safe_tx_hash).await?;
    Ok(())
}

/// Adopts a proposed transaction, checks it against the wallet, and runs the
/// configured execution strategy if the wallet reports it executable.
pub async fn execute(orchestrator: &PilotOrchestrator, config: &AppConfig) -> eyre::Result<()> {
    let safe = require_safe(config)?;
    let safe_tx_hash = require_tx_hash(config)?;

    let record = orchestrator.adopt_transaction(safe, safe_tx_hash).await?;
    if record.is_executed {
        tracing::info!(%safe_tx_hash, "transaction already executed");
        return Ok(());
    }
    tracing::info!(
        confirmations = record.confirmations.len(),
        required = record.confirmations_required,
        "adopted transaction"
    );

    if !orchestrator.validate().await? {
        tracing::warn!(%safe_tx_hash, "not executable yet; more confirmations needed");
        return Ok(());
    }

    match orchestrator.dispatch_execution(config.strategy).await? {
        ExecutionOutcome::Executed(result) => {
            tracing::info!(tx_hash = %result.tx_hash, success = result.success, "direct execution finished");
        }
        ExecutionOutcome::Relayed(task) => {
            tracing::info!(task_id = %task.task_id, "sponsored execution submitted");
        }
    }
    Ok(())
}

/// Lists the wallet's queue alongside its on-chain counters.
pub async fn pending(orchestrator: &PilotOrchestrator, config: &AppConfig) -> eyre::Result<()> {
    let safe = require_safe(config)?;
    let info = orchestrator.safe_info(safe).await?;
    let pending = orchestrator.pending_transactions(safe).await?;
    tracing::info!(
        nonce = info.nonce,
        threshold = info.threshold,
        owners = info.owners.len(),
        pending = pending.len(),
        "wallet queue"
    );
    for tx in &pending {
        tracing::info!(
            hash = %tx.safe_tx_hash,
            nonce = tx.transaction.nonce,
            to = %tx.transaction.to,
            confirmations = tx.confirmations.len(),
            required = tx.confirmations_required,
            "pending transaction"
        );
    }
    Ok(())
}

/// Reports one transaction record. A hash the service does not know may be a
/// relay task id, so the relay is asked as a fallback.
pub async fn status(orchestrator: &PilotOrchestrator, config: &AppConfig) -> eyre::Result<()> {
    let safe_tx_hash = require_tx_hash(config)?;
    match orchestrator.get_transaction(safe_tx_hash).await {
        Ok(record) => {
            tracing::info!(
                hash = %record.safe_tx_hash,
                executed = record.is_executed,
                confirmations = record.confirmations.len(),
                required = record.confirmations_required,
                "service record"
            );
            Ok(())
        }
        Err(PortError::Rejection(_)) => {
            let state = orchestrator
                .relay_task_status(&safe_tx_hash.to_string())
                .await?;
            tracing::info!(task = %safe_tx_hash, %state, "relay task");
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}

fn mint_calldata(recipient: Address, amount: U256) -> Bytes {
    IMintableToken::mintCall {
        to: recipient,
        amount,
    }
    .abi_encode()
    .into()
}

fn fresh_salt() -> U256 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    U256::from(millis)
}

fn require_safe(config: &AppConfig) -> eyre::Result<Address> {
    config
        .safe_address
        .ok_or_else(|| eyre!("SAFE_PILOT_SAFE_ADDRESS is not set"))
}

fn require_tx_hash(config: &AppConfig) -> eyre::Result<B256> {
    config
        .tx_hash
        .ok_or_else(|| eyre!("SAFE_PILOT_TX_HASH is not set"))
}
