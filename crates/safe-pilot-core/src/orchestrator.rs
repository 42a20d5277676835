use std::sync::{Mutex, MutexGuard};

use alloy::primitives::{Address, Bytes, B256, U256};
use tracing::{debug, info, warn};

use crate::domain::{
    pack_signatures, validate_signature_bytes, ExecutionOutcome, ExecutionResult,
    ExecutionStrategy, Proposal, ProposedTx, RelayTask, SafeInfo, SafeTransaction, TxFlow,
    TxStatus,
};
use crate::ports::{ChainPort, HashingPort, PortError, RelayPort, SignerPort, TxServicePort};
use crate::state_machine::{derive_status, tx_transition, LifecycleAction, StateTransition};

/// Sequences one Safe transaction at a time through
/// construct → hash → sign → propose → confirm → relay/execute, against the
/// four external collaborators behind the ports.
///
/// Built once and passed by reference into each operation; every operation
/// is an independently awaitable unit with no internal parallelism.
pub struct Orchestrator<S, C, T, R, H>
where
    S: SignerPort,
    C: ChainPort,
    T: TxServicePort,
    R: RelayPort,
    H: HashingPort,
{
    pub signer: S,
    pub chain: C,
    pub tx_service: T,
    pub relay: R,
    pub hashing: H,
    pub chain_id: u64,
    flow: Mutex<Option<TxFlow>>,
}

impl<S, C, T, R, H> Orchestrator<S, C, T, R, H>
where
    S: SignerPort,
    C: ChainPort,
    T: TxServicePort,
    R: RelayPort,
    H: HashingPort,
{
    pub fn new(signer: S, chain: C, tx_service: T, relay: R, hashing: H, chain_id: u64) -> Self {
        Self {
            signer,
            chain,
            tx_service,
            relay,
            hashing,
            chain_id,
            flow: Mutex::new(None),
        }
    }

    /// Snapshot of the in-flight transaction, if any.
    pub fn current_flow(&self) -> Option<TxFlow> {
        self.flow.lock().ok().and_then(|guard| (*guard).clone())
    }

    /// Deploys a fresh wallet and returns the address the factory reports.
    /// Not idempotent: every call deploys a distinct wallet.
    pub async fn deploy_wallet(
        &self,
        owners: &[Address],
        threshold: u64,
        salt_nonce: U256,
    ) -> Result<Address, PortError> {
        if owners.is_empty() {
            return Err(PortError::Validation(
                "wallet needs at least one owner".to_owned(),
            ));
        }
        let mut deduped = owners.to_vec();
        deduped.sort();
        deduped.dedup();
        if deduped.len() != owners.len() {
            return Err(PortError::Validation("duplicate owner address".to_owned()));
        }
        if threshold == 0 || threshold > owners.len() as u64 {
            return Err(PortError::Validation(format!(
                "threshold {threshold} out of range for {} owner(s)",
                owners.len()
            )));
        }

        info!(owners = owners.len(), threshold, "deploying wallet");
        let address = self.chain.deploy_wallet(owners, threshold, salt_nonce).await?;
        info!(%address, "wallet deployed");
        Ok(address)
    }

    /// Composes a fresh descriptor for a plain CALL, with the nonce fetched
    /// from the Transaction Service, and stores it as the in-flight flow.
    ///
    /// The nonce is fetched fresh on every build; concurrent orchestrators
    /// can race here and end up with duplicate nonces.
    pub async fn build_transaction(
        &self,
        safe: Address,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> Result<SafeTransaction, PortError> {
        self.ensure_no_active_flow()?;

        let nonce = self.tx_service.next_nonce(safe).await?;
        let tx = SafeTransaction::new_call(to, value, data, nonce);
        let safe_tx_hash = self
            .hashing
            .safe_tx_hash(self.chain_id, safe, &tx)?;
        info!(%safe, %safe_tx_hash, nonce, "transaction built");

        *self.flow_guard()? = Some(TxFlow {
            safe,
            transaction: tx.clone(),
            safe_tx_hash,
            status: TxStatus::Draft,
        });
        Ok(tx)
    }

    /// Signs the in-flight transaction's digest and registers the proposal
    /// with the Transaction Service. Returns the safe tx hash.
    pub async fn propose(&self) -> Result<B256, PortError> {
        let flow = self.require_flow()?;

        let (signed, transition) = tx_transition(flow.status, LifecycleAction::Sign)?;
        let signature = self.signer.sign_digest(flow.safe_tx_hash).await?;
        validate_signature_bytes(&signature)?;
        self.commit(flow.safe_tx_hash, signed, &transition)?;

        let (proposed, transition) = tx_transition(signed, LifecycleAction::Propose)?;
        let proposal = Proposal {
            safe: flow.safe,
            transaction: flow.transaction.clone(),
            safe_tx_hash: flow.safe_tx_hash,
            sender: self.signer.address(),
            signature,
        };
        self.tx_service.propose(&proposal).await?;
        self.commit(flow.safe_tx_hash, proposed, &transition)?;

        info!(safe_tx_hash = %flow.safe_tx_hash, "transaction proposed");
        Ok(flow.safe_tx_hash)
    }

    /// Signs the given digest and submits it as a confirmation. A hash that
    /// is not the in-flight flow is served as a plain co-signature (a
    /// transaction proposed by someone else) without touching the flow.
    pub async fn confirm(&self, safe_tx_hash: B256) -> Result<(), PortError> {
        let own_status = self
            .flow_guard()?
            .as_ref()
            .filter(|flow| flow.safe_tx_hash == safe_tx_hash)
            .map(|flow| flow.status);
        let next = match own_status {
            Some(status) => Some(tx_transition(status, LifecycleAction::Confirm)?),
            None => {
                debug!(%safe_tx_hash, "confirming a transaction proposed elsewhere");
                None
            }
        };

        let signature = self.signer.sign_digest(safe_tx_hash).await?;
        validate_signature_bytes(&signature)?;
        self.tx_service.confirm(safe_tx_hash, &signature).await?;

        if let Some((confirmed, transition)) = next {
            self.commit(safe_tx_hash, confirmed, &transition)?;
        }
        info!(%safe_tx_hash, "confirmation submitted");
        Ok(())
    }

    /// Asks the wallet whether the collected confirmations currently satisfy
    /// its threshold. On yes the flow becomes ready to execute; on no it
    /// stays where it is.
    pub async fn validate(&self) -> Result<bool, PortError> {
        let flow = self.require_flow()?;
        let (ready, transition) = tx_transition(flow.status, LifecycleAction::Validate)?;

        let record = self.tx_service.get_transaction(flow.safe_tx_hash).await?;
        let signatures = pack_signatures(&record.confirmations)?;
        let executable = self
            .chain
            .validate_transaction(flow.safe, &flow.transaction, &signatures)
            .await?;

        if executable {
            self.commit(flow.safe_tx_hash, ready, &transition)?;
        } else {
            debug!(safe_tx_hash = %flow.safe_tx_hash, "transaction not yet executable");
        }
        Ok(executable)
    }

    /// Executes the in-flight transaction on-chain. Only legal once a
    /// validity check has moved the flow to ReadyToExecute.
    pub async fn execute(&self) -> Result<ExecutionResult, PortError> {
        let flow = self.require_flow()?;
        let (executed, transition) = tx_transition(flow.status, LifecycleAction::Execute)?;

        let record = self.tx_service.get_transaction(flow.safe_tx_hash).await?;
        let signatures = pack_signatures(&record.confirmations)?;
        let result = self
            .chain
            .execute_transaction(flow.safe, &flow.transaction, &signatures)
            .await?;

        if result.success {
            self.commit(flow.safe_tx_hash, executed, &transition)?;
            info!(tx_hash = %result.tx_hash, "transaction executed");
        } else {
            let (failed, transition) = tx_transition(flow.status, LifecycleAction::Fail)?;
            self.commit(flow.safe_tx_hash, failed, &transition)?;
            warn!(tx_hash = %result.tx_hash, "execution reverted on-chain");
        }
        Ok(result)
    }

    /// Hands the in-flight transaction to the gasless relay for sponsored
    /// execution. Only legal from ReadyToExecute, same as `execute`.
    pub async fn relay(&self) -> Result<RelayTask, PortError> {
        let flow = self.require_flow()?;
        let (relayed, transition) = tx_transition(flow.status, LifecycleAction::Relay)?;

        let record = self.tx_service.get_transaction(flow.safe_tx_hash).await?;
        let signatures = pack_signatures(&record.confirmations)?;
        let task = self
            .relay
            .relay_execution(flow.safe, &flow.transaction, &signatures)
            .await?;

        self.commit(flow.safe_tx_hash, relayed, &transition)?;
        info!(task_id = %task.task_id, "relay task submitted");
        Ok(task)
    }

    /// Runs exactly one of the two execution strategies.
    pub async fn dispatch_execution(
        &self,
        strategy: ExecutionStrategy,
    ) -> Result<ExecutionOutcome, PortError> {
        match strategy {
            ExecutionStrategy::Direct => self.execute().await.map(ExecutionOutcome::Executed),
            ExecutionStrategy::Sponsored => self.relay().await.map(ExecutionOutcome::Relayed),
        }
    }

    /// Rebuilds the in-flight flow from a transaction already held by the
    /// Transaction Service (e.g. to execute something proposed earlier).
    pub async fn adopt_transaction(
        &self,
        safe: Address,
        safe_tx_hash: B256,
    ) -> Result<ProposedTx, PortError> {
        self.ensure_no_active_flow()?;

        let record = self.tx_service.get_transaction(safe_tx_hash).await?;
        let status = derive_status(&record);
        info!(%safe_tx_hash, ?status, "adopted transaction from service record");

        *self.flow_guard()? = Some(TxFlow {
            safe,
            transaction: record.transaction.clone(),
            safe_tx_hash,
            status,
        });
        Ok(record)
    }

    pub async fn safe_info(&self, safe: Address) -> Result<SafeInfo, PortError> {
        self.tx_service.safe_info(safe).await
    }

    pub async fn pending_transactions(&self, safe: Address) -> Result<Vec<ProposedTx>, PortError> {
        self.tx_service.pending_transactions(safe).await
    }

    pub async fn get_transaction(&self, safe_tx_hash: B256) -> Result<ProposedTx, PortError> {
        self.tx_service.get_transaction(safe_tx_hash).await
    }

    pub async fn relay_task_status(&self, task_id: &str) -> Result<String, PortError> {
        self.relay.task_status(task_id).await
    }

    fn flow_guard(&self) -> Result<MutexGuard<'_, Option<TxFlow>>, PortError> {
        self.flow
            .lock()
            .map_err(|_| PortError::Validation("tx flow lock poisoned".to_owned()))
    }

    fn require_flow(&self) -> Result<TxFlow, PortError> {
        self.flow_guard()?
            .clone()
            .ok_or_else(|| PortError::Validation("no transaction in flight".to_owned()))
    }

    fn ensure_no_active_flow(&self) -> Result<(), PortError> {
        if let Some(flow) = self.flow_guard()?.as_ref() {
            if !flow.status.is_terminal() {
                return Err(PortError::Validation(format!(
                    "transaction {} still in flight ({:?})",
                    flow.safe_tx_hash, flow.status
                )));
            }
        }
        Ok(())
    }

    /// Records a transition on the in-flight flow. The flow must still be
    /// the one the operation started from.
    fn commit(
        &self,
        safe_tx_hash: B256,
        status: TxStatus,
        transition: &StateTransition,
    ) -> Result<(), PortError> {
        let mut guard = self.flow_guard()?;
        match guard.as_mut() {
            Some(flow) if flow.safe_tx_hash == safe_tx_hash => {
                flow.status = status;
                debug!(
                    %safe_tx_hash,
                    from = ?transition.from,
                    to = ?transition.to,
                    reason = transition.reason,
                    "tx transition"
                );
                Ok(())
            }
            _ => Err(PortError::Validation(
                "tx flow changed mid-operation".to_owned(),
            )),
        }
    }
}
