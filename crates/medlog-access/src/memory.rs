//! In-process collaborators
//!
//! A ledger and a content store that live in memory, for tests, local
//! development and benchmarks. Both can be slowed down or taken offline to
//! exercise the engine's timeout and fail-closed paths.
//!
//! The ledger applies its own access gate the way the deployed registry
//! does: only the owner writes and assigns roles, and records are readable
//! by the patient, any role holder, or the owner.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use medlog_integrity::{
    keccak256, ContentHash, Identity, MedicalRecordRef, RecordDraft, Role, RoleSet, TransactionId,
};
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};

use crate::clock::{Clock, SystemClock};
use crate::error::UpstreamError;
use crate::upstream::{ContentStore, RecordStore, RoleAdministrator, RoleRegistry, UpstreamResult};

/// Injected latency and outage switch shared by the memory collaborators
#[derive(Debug)]
struct Conditions {
    name: &'static str,
    latency: Mutex<Option<Duration>>,
    available: AtomicBool,
}

impl Conditions {
    fn new(name: &'static str) -> Self {
        Conditions {
            name,
            latency: Mutex::new(None),
            available: AtomicBool::new(true),
        }
    }

    /// Wait out the configured latency, then fail if offline
    async fn enter(&self) -> UpstreamResult<()> {
        let latency = *self.latency.lock();
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(UpstreamError::Unavailable(format!("{} is offline", self.name)))
        }
    }
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Debug, Default)]
struct LedgerState {
    roles: HashMap<Identity, RoleSet>,
    records: HashMap<Identity, Vec<MedicalRecordRef>>,
    transactions: u64,
}

impl LedgerState {
    fn holds(&self, who: &Identity, role: Role) -> bool {
        self.roles.get(who).is_some_and(|set| set.contains(role))
    }

    fn holds_any(&self, who: &Identity) -> bool {
        self.roles
            .get(who)
            .is_some_and(RoleSet::is_authorized_personnel)
    }

    /// Next transaction hash, derived from a counter and the call data
    fn next_transaction(&mut self, data: &[u8]) -> TransactionId {
        self.transactions += 1;
        let mut preimage = self.transactions.to_be_bytes().to_vec();
        preimage.extend_from_slice(data);
        TransactionId(format!("0x{}", hex::encode(keccak256(&preimage))))
    }
}

/// Role registry and record ledger in one, owned by a single identity
pub struct MemoryLedger {
    owner: Identity,
    state: RwLock<LedgerState>,
    conditions: Conditions,
    clock: Arc<dyn Clock>,
}

impl MemoryLedger {
    pub fn new(owner: Identity) -> Self {
        MemoryLedger {
            owner,
            state: RwLock::new(LedgerState::default()),
            conditions: Conditions::new("ledger"),
            clock: Arc::new(SystemClock),
        }
    }

    /// Timestamp records with `clock` instead of the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn owner(&self) -> Identity {
        self.owner
    }

    /// Delay every call by `latency`; `None` removes the delay
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.conditions.latency.lock() = latency;
    }

    pub fn set_available(&self, available: bool) {
        self.conditions.available.store(available, Ordering::Release);
    }

    /// Number of records stored for `patient`, bypassing the access gate
    pub fn record_count(&self, patient: &Identity) -> usize {
        self.state.read().records.get(patient).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLedger")
            .field("owner", &self.owner)
            .field("state", &self.state)
            .field("conditions", &self.conditions)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RoleRegistry for MemoryLedger {
    async fn is_doctor(&self, who: &Identity) -> UpstreamResult<bool> {
        self.conditions.enter().await?;
        Ok(self.state.read().holds(who, Role::Doctor))
    }

    async fn is_nurse(&self, who: &Identity) -> UpstreamResult<bool> {
        self.conditions.enter().await?;
        Ok(self.state.read().holds(who, Role::Nurse))
    }

    async fn is_staff(&self, who: &Identity) -> UpstreamResult<bool> {
        self.conditions.enter().await?;
        Ok(self.state.read().holds(who, Role::Staff))
    }
}

#[async_trait]
impl RoleAdministrator for MemoryLedger {
    async fn assign_role(
        &self,
        owner: &Identity,
        target: &Identity,
        role: Role,
    ) -> UpstreamResult<TransactionId> {
        self.conditions.enter().await?;
        if *owner != self.owner {
            return Err(UpstreamError::Denied("only the owner can assign roles".to_string()));
        }
        if !role.is_clinical() {
            return Err(UpstreamError::Denied(format!("cannot assign role {role}")));
        }

        let mut state = self.state.write();
        state.roles.entry(*target).or_default().insert(role);

        let mut data = target.as_bytes().to_vec();
        data.extend_from_slice(role.as_str().as_bytes());
        Ok(state.next_transaction(&data))
    }
}

#[async_trait]
impl RecordStore for MemoryLedger {
    async fn add_record(&self, writer: &Identity, draft: &RecordDraft) -> UpstreamResult<TransactionId> {
        self.conditions.enter().await?;
        if *writer != self.owner {
            return Err(UpstreamError::Denied("only the owner can add records".to_string()));
        }

        let record = MedicalRecordRef::from_draft(draft.clone(), self.clock.now());
        let mut data = draft.patient.as_bytes().to_vec();
        data.extend_from_slice(draft.content_hash.as_str().as_bytes());

        let mut state = self.state.write();
        state.records.entry(draft.patient).or_default().push(record);
        Ok(state.next_transaction(&data))
    }

    async fn get_records(
        &self,
        patient: &Identity,
        caller: &Identity,
    ) -> UpstreamResult<Vec<MedicalRecordRef>> {
        self.conditions.enter().await?;

        let state = self.state.read();
        if caller != patient && *caller != self.owner && !state.holds_any(caller) {
            return Err(UpstreamError::Denied("caller may not read these records".to_string()));
        }
        Ok(state.records.get(patient).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Content store
// =============================================================================

/// Blob store addressed by the hex SHA-256 of the content
#[derive(Debug)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<ContentHash, Vec<u8>>>,
    conditions: Conditions,
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        MemoryContentStore {
            blobs: RwLock::new(HashMap::new()),
            conditions: Conditions::new("content store"),
        }
    }
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address `bytes` would be stored under
    pub fn address_of(bytes: &[u8]) -> ContentHash {
        ContentHash::from_digest(Sha256::digest(bytes).into())
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.conditions.latency.lock() = latency;
    }

    pub fn set_available(&self, available: bool) {
        self.conditions.available.store(available, Ordering::Release);
    }

    /// Drop a blob, as an unpinned object would disappear
    pub fn evict(&self, hash: &ContentHash) -> bool {
        self.blobs.write().remove(hash).is_some()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, bytes: Vec<u8>) -> UpstreamResult<ContentHash> {
        self.conditions.enter().await?;
        let hash = Self::address_of(&bytes);
        self.blobs.write().insert(hash.clone(), bytes);
        Ok(hash)
    }

    async fn get(&self, hash: &ContentHash) -> UpstreamResult<Option<Vec<u8>>> {
        self.conditions.enter().await?;
        Ok(self.blobs.read().get(hash).cloned())
    }

    async fn contains(&self, hash: &ContentHash) -> UpstreamResult<bool> {
        self.conditions.enter().await?;
        Ok(self.blobs.read().contains_key(hash))
    }
}
