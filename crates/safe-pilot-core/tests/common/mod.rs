#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use safe_pilot_core::{
    ChainPort, ConfirmationRecord, ExecutionResult, HashingPort, Orchestrator, PortError,
    Proposal, ProposedTx, RelayPort, RelayTask, SafeInfo, SafeTransaction, SignerPort,
    TxServicePort,
};

pub fn safe_address() -> Address {
    "0x000000000000000000000000000000000000BEEF"
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

pub fn signature_bytes(seed: u8) -> Bytes {
    let mut v = vec![seed; 65];
    v[64] = 27;
    Bytes::from(v)
}

pub fn sentinel_hash() -> B256 {
    B256::repeat_byte(0x42)
}

/// Records every digest it is asked to sign.
pub struct StubSigner {
    pub address: Address,
    pub signature: Bytes,
    pub signed_digests: Mutex<Vec<B256>>,
}

impl Default for StubSigner {
    fn default() -> Self {
        Self {
            address: owner_address(),
            signature: signature_bytes(0x77),
            signed_digests: Mutex::new(Vec::new()),
        }
    }
}

impl StubSigner {
    pub fn sign_calls(&self) -> usize {
        self.signed_digests.lock().expect("signer lock").len()
    }
}

#[async_trait]
impl SignerPort for StubSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_digest(&self, digest: B256) -> Result<Bytes, PortError> {
        self.signed_digests.lock().expect("signer lock").push(digest);
        Ok(self.signature.clone())
    }
}

pub struct StubChain {
    pub deployed_address: Address,
    pub validity: AtomicBool,
    pub execution_success: AtomicBool,
    pub deploy_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    pub execute_calls: AtomicUsize,
}

impl Default for StubChain {
    fn default() -> Self {
        Self {
            deployed_address: safe_address(),
            validity: AtomicBool::new(true),
            execution_success: AtomicBool::new(true),
            deploy_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChainPort for StubChain {
    async fn deploy_wallet(
        &self,
        _owners: &[Address],
        _threshold: u64,
        _salt_nonce: U256,
    ) -> Result<Address, PortError> {
        self.deploy_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.deployed_address)
    }

    async fn validate_transaction(
        &self,
        _safe: Address,
        _tx: &SafeTransaction,
        _signatures: &Bytes,
    ) -> Result<bool, PortError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.validity.load(Ordering::SeqCst))
    }

    async fn execute_transaction(
        &self,
        _safe: Address,
        _tx: &SafeTransaction,
        _signatures: &Bytes,
    ) -> Result<ExecutionResult, PortError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExecutionResult {
            tx_hash: B256::repeat_byte(0xEE),
            success: self.execution_success.load(Ordering::SeqCst),
        })
    }
}

/// In-memory stand-in for the Transaction Service. `get_transaction`
/// synthesizes a record for whatever hash is asked, from the configured
/// confirmations.
pub struct StubTxService {
    pub nonce: AtomicU64,
    pub fail_nonce: AtomicBool,
    pub confirmations_required: AtomicU64,
    pub confirmations: Mutex<Vec<ConfirmationRecord>>,
    pub proposals: Mutex<Vec<Proposal>>,
    pub confirmed: Mutex<Vec<(B256, Bytes)>>,
}

impl Default for StubTxService {
    fn default() -> Self {
        Self {
            nonce: AtomicU64::new(7),
            fail_nonce: AtomicBool::new(false),
            confirmations_required: AtomicU64::new(1),
            confirmations: Mutex::new(Vec::new()),
            proposals: Mutex::new(Vec::new()),
            confirmed: Mutex::new(Vec::new()),
        }
    }
}

impl StubTxService {
    pub fn propose_calls(&self) -> usize {
        self.proposals.lock().expect("service lock").len()
    }

    pub fn add_confirmation(&self, owner: Address, signature: Bytes) {
        self.confirmations
            .lock()
            .expect("service lock")
            .push(ConfirmationRecord { owner, signature });
    }
}

#[async_trait]
impl TxServicePort for StubTxService {
    async fn safe_info(&self, safe: Address) -> Result<SafeInfo, PortError> {
        Ok(SafeInfo {
            address: safe,
            nonce: self.nonce.load(Ordering::SeqCst),
            threshold: self.confirmations_required.load(Ordering::SeqCst),
            owners: vec![owner_address()],
        })
    }

    async fn next_nonce(&self, _safe: Address) -> Result<u64, PortError> {
        if self.fail_nonce.load(Ordering::SeqCst) {
            return Err(PortError::Transport("nonce endpoint unreachable".to_owned()));
        }
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn propose(&self, proposal: &Proposal) -> Result<(), PortError> {
        self.proposals
            .lock()
            .expect("service lock")
            .push(proposal.clone());
        Ok(())
    }

    async fn confirm(&self, safe_tx_hash: B256, signature: &Bytes) -> Result<(), PortError> {
        self.confirmed
            .lock()
            .expect("service lock")
            .push((safe_tx_hash, signature.clone()));
        Ok(())
    }

    async fn get_transaction(&self, safe_tx_hash: B256) -> Result<ProposedTx, PortError> {
        Ok(ProposedTx {
            safe_tx_hash,
            transaction: SafeTransaction::new_call(
                token_address(),
                U256::ZERO,
                Bytes::new(),
                self.nonce.load(Ordering::SeqCst),
            ),
            is_executed: false,
            confirmations_required: self.confirmations_required.load(Ordering::SeqCst),
            confirmations: self.confirmations.lock().expect("service lock").clone(),
        })
    }

    async fn pending_transactions(&self, _safe: Address) -> Result<Vec<ProposedTx>, PortError> {
        Ok(Vec::new())
    }
}

pub struct StubRelay {
    pub relayed: Mutex<Vec<(Address, Bytes)>>,
}

impl Default for StubRelay {
    fn default() -> Self {
        Self {
            relayed: Mutex::new(Vec::new()),
        }
    }
}

impl StubRelay {
    pub fn relay_calls(&self) -> usize {
        self.relayed.lock().expect("relay lock").len()
    }
}

#[async_trait]
impl RelayPort for StubRelay {
    async fn relay_execution(
        &self,
        safe: Address,
        _tx: &SafeTransaction,
        signatures: &Bytes,
    ) -> Result<RelayTask, PortError> {
        self.relayed
            .lock()
            .expect("relay lock")
            .push((safe, signatures.clone()));
        Ok(RelayTask {
            task_id: "task-0xfeed".to_owned(),
        })
    }

    async fn task_status(&self, _task_id: &str) -> Result<String, PortError> {
        Ok("ExecSuccess".to_owned())
    }
}

/// Reports a fixed sentinel digest so tests can assert that downstream
/// steps consume exactly the hash this port produced.
pub struct StubHashing {
    pub hash: B256,
}

impl Default for StubHashing {
    fn default() -> Self {
        Self {
            hash: sentinel_hash(),
        }
    }
}

impl HashingPort for StubHashing {
    fn safe_tx_hash(
        &self,
        _chain_id: u64,
        _safe: Address,
        _tx: &SafeTransaction,
    ) -> Result<B256, PortError> {
        Ok(self.hash)
    }
}

pub type TestOrchestrator =
    Orchestrator<StubSigner, StubChain, StubTxService, StubRelay, StubHashing>;

pub fn new_orchestrator() -> TestOrchestrator {
    Orchestrator::new(
        StubSigner::default(),
        StubChain::default(),
        StubTxService::default(),
        StubRelay::default(),
        StubHashing::default(),
        11155111,
    )
}
