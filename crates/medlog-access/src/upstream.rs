//! Collaborators the engine calls out to
//!
//! The ledger (roles and record references) and the content-addressed blob
//! store live outside this crate. Implementations are expected to do
//! network I/O; the engine bounds every call with the configured timeout
//! and never retries.

use async_trait::async_trait;
use medlog_integrity::{ContentHash, Identity, MedicalRecordRef, RecordDraft, Role, TransactionId};

use crate::error::UpstreamError;

pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Read-only role queries against the ledger's role registry
#[async_trait]
pub trait RoleRegistry: Send + Sync {
    async fn is_doctor(&self, who: &Identity) -> UpstreamResult<bool>;

    async fn is_nurse(&self, who: &Identity) -> UpstreamResult<bool>;

    async fn is_staff(&self, who: &Identity) -> UpstreamResult<bool>;

    /// Dispatch to the per-role query. `Role::None` is never "held".
    async fn has_role(&self, who: &Identity, role: Role) -> UpstreamResult<bool> {
        match role {
            Role::Doctor => self.is_doctor(who).await,
            Role::Nurse => self.is_nurse(who).await,
            Role::Staff => self.is_staff(who).await,
            Role::None => Ok(false),
        }
    }
}

/// Administrative role assignment, executed by the registry owner.
///
/// Not used by authorization decisions; it is the trust boundary they
/// depend on.
#[async_trait]
pub trait RoleAdministrator: Send + Sync {
    async fn assign_role(
        &self,
        owner: &Identity,
        target: &Identity,
        role: Role,
    ) -> UpstreamResult<TransactionId>;
}

/// Ledger-side storage of immutable record references
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a record, transacting as `writer` (the service identity)
    async fn add_record(&self, writer: &Identity, draft: &RecordDraft) -> UpstreamResult<TransactionId>;

    /// Records of `patient`, read as `caller`. The ledger may apply its own
    /// access gate on top of the engine's decision.
    async fn get_records(
        &self,
        patient: &Identity,
        caller: &Identity,
    ) -> UpstreamResult<Vec<MedicalRecordRef>>;
}

/// Content-addressed blob storage
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload a blob and return its address
    async fn put(&self, bytes: Vec<u8>) -> UpstreamResult<ContentHash>;

    /// Fetch a blob by address. `None` when nothing is stored there.
    async fn get(&self, hash: &ContentHash) -> UpstreamResult<Option<Vec<u8>>>;

    /// Whether a blob exists, without transferring it. Called once per
    /// listed record, so implementations should use a metadata lookup
    /// (a `HEAD` or stat) rather than fetching the bytes.
    async fn contains(&self, hash: &ContentHash) -> UpstreamResult<bool>;
}
