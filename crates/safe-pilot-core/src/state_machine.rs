use crate::domain::{ProposedTx, TxStatus};
use crate::ports::PortError;

/// What an orchestrator operation is about to do to the in-flight
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Sign,
    Propose,
    Confirm,
    Validate,
    Execute,
    Relay,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: TxStatus,
    pub to: TxStatus,
    pub reason: &'static str,
}

/// The lifecycle table. Every (status, action) pair not listed here is an
/// out-of-order call and is rejected instead of trusting caller discipline.
pub fn tx_transition(
    status: TxStatus,
    action: LifecycleAction,
) -> Result<(TxStatus, StateTransition), PortError> {
    use LifecycleAction as A;
    use TxStatus as S;

    let (to, reason) = match (status, action) {
        (S::Draft, A::Sign) => (S::Signed, "digest signed"),
        (S::Signed, A::Propose) => (S::Proposed, "proposal submitted"),
        (S::Proposed | S::Confirmed, A::Confirm) => (S::Confirmed, "confirmation submitted"),
        (S::Proposed | S::Confirmed, A::Validate) => {
            (S::ReadyToExecute, "threshold satisfied on-chain")
        }
        (S::ReadyToExecute, A::Execute) => (S::Executed, "executed on-chain"),
        (S::ReadyToExecute, A::Relay) => (S::Relayed, "relay task submitted"),
        (from, A::Fail) if !from.is_terminal() => (S::Failed, "lifecycle aborted"),
        (from, action) => {
            return Err(PortError::Validation(format!(
                "illegal tx transition: {action:?} while {from:?}"
            )))
        }
    };
    Ok((
        to,
        StateTransition {
            from: status,
            to,
            reason,
        },
    ))
}

/// Where a transaction fetched back from the Transaction Service sits in
/// the lifecycle.
pub fn derive_status(record: &ProposedTx) -> TxStatus {
    if record.is_executed {
        TxStatus::Executed
    } else if record.confirmations_required > 0
        && record.confirmations.len() as u64 >= record.confirmations_required
    {
        TxStatus::Confirmed
    } else {
        TxStatus::Proposed
    }
}
