//! Authorization engine
//!
//! Combines three independent trust sources into write and read decisions:
//!
//! - record ownership (the caller is the patient)
//! - the ledger's role registry (Doctor / Nurse / Staff)
//! - patient-signed consent grants held in the [`DelegationStore`]
//!
//! Every path fails closed: a verification failure, a missing grant or an
//! upstream timeout while evaluating a role is a Deny, never an Allow.
//!
//! # Write
//!
//! 1. The payload's canonical bytes must recover to the claimed sender,
//!    otherwise `SignatureMismatch`.
//! 2. The sender must hold a clinical role, otherwise `Unauthorized`.
//! 3. The record is forwarded to the ledger under the service's own
//!    identity. The referenced content must already exist.
//!
//! # Read (first match wins)
//!
//! 1. caller == patient: Allow.
//! 2. caller holds a clinical role, the patient has a grant on file, and
//!    that grant still re-verifies to the patient: Allow.
//! 3. Otherwise Deny.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use medlog_integrity::record::sort_newest_first;
use medlog_integrity::{
    validation, ConsentGrant, ContentHash, EncodingError, Identity, MedicalRecordRef,
    PayloadError, Role, SignedPayload, TransactionId,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::AccessConfig;
use crate::error::{AccessError, UpstreamError};
use crate::policy::{ConsentPolicy, UnboundedConsent};
use crate::store::DelegationStore;
use crate::upstream::{ContentStore, RecordStore, RoleRegistry, UpstreamResult};

/// Why a decision came out the way it did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Caller is the patient
    PatientOwner,
    /// Sender of a write holds a clinical role
    AuthorizedPersonnel,
    /// Clinical caller with a valid grant from the patient
    DelegatedConsent,
    NoClinicalRole,
    NoConsentOnFile,
    /// The stored grant no longer recovers to the patient
    ConsentNotAuthentic,
    /// Rejected by the consent policy
    ConsentExpired,
    /// The ledger's own access gate refused the call
    UpstreamDenied,
}

/// Outcome of an authorization check. Derived on demand, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl AuthorizationDecision {
    pub fn allow(reason: DecisionReason) -> Self {
        AuthorizationDecision {
            allowed: true,
            reason,
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        AuthorizationDecision {
            allowed: false,
            reason,
        }
    }

    /// Turn a Deny into `AccessError::Unauthorized`
    pub fn into_result(self) -> Result<DecisionReason, AccessError> {
        if self.allowed {
            Ok(self.reason)
        } else {
            Err(AccessError::Unauthorized(self.reason))
        }
    }
}

/// Whether a listed record's content could be found
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Available,
    /// The store has nothing at this address
    Missing,
    /// The store could not be asked
    Unreachable,
    /// Probing is disabled
    NotChecked,
}

/// A record as returned to a reader
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEntry {
    #[serde(flatten)]
    pub record: MedicalRecordRef,
    pub file_url: String,
    pub content: ContentStatus,
}

/// Collaborator behind a bounded call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Upstream {
    RecordStore,
    ContentStore,
    RoleRegistry,
}

impl Upstream {
    /// Name used in logs only
    fn name(self) -> &'static str {
        match self {
            Upstream::RecordStore => "record_store",
            Upstream::ContentStore => "content_store",
            Upstream::RoleRegistry => "role_registry",
        }
    }

    /// What the caller was after, as reported in `AccessError::NotFound`
    fn subject(self) -> &'static str {
        match self {
            Upstream::RecordStore => "record",
            Upstream::ContentStore => "content",
            Upstream::RoleRegistry => "role",
        }
    }
}

/// Per-request authorization over injected collaborators
pub struct AuthorizationEngine {
    config: AccessConfig,
    roles: Arc<dyn RoleRegistry>,
    records: Arc<dyn RecordStore>,
    content: Arc<dyn ContentStore>,
    delegations: Arc<DelegationStore>,
    policy: Arc<dyn ConsentPolicy>,
    clock: Arc<dyn Clock>,
}

impl AuthorizationEngine {
    /// Engine with unbounded consent validity and the system clock
    pub fn new(
        config: AccessConfig,
        roles: Arc<dyn RoleRegistry>,
        records: Arc<dyn RecordStore>,
        content: Arc<dyn ContentStore>,
        delegations: Arc<DelegationStore>,
    ) -> Self {
        AuthorizationEngine {
            config,
            roles,
            records,
            content,
            delegations,
            policy: Arc::new(UnboundedConsent),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the consent validity policy
    pub fn with_policy(mut self, policy: Arc<dyn ConsentPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // =========================================================================
    // Write path
    // =========================================================================

    /// Decide whether a signed record write may proceed
    #[instrument(skip_all, fields(sender = %request.claimed_signer))]
    pub async fn authorize_write(
        &self,
        request: &SignedPayload,
    ) -> Result<AuthorizationDecision, AccessError> {
        let sender = self.authenticate(request)?;

        match self.clinical_role(&sender).await? {
            Some(role) => {
                info!(%role, "write authorized");
                Ok(AuthorizationDecision::allow(DecisionReason::AuthorizedPersonnel))
            }
            None => {
                info!("write denied: sender holds no clinical role");
                Ok(AuthorizationDecision::deny(DecisionReason::NoClinicalRole))
            }
        }
    }

    /// Authorize a signed record and write it to the ledger.
    ///
    /// The ledger transaction is issued by the service identity, not the
    /// sender. Content is never uploaded here; it must already exist.
    #[instrument(skip_all, fields(sender = %request.claimed_signer))]
    pub async fn write_record(&self, request: &SignedPayload) -> Result<TransactionId, AccessError> {
        self.authorize_write(request).await?.into_result()?;

        let draft = validation::record_draft(&request.data)?;

        let exists = self
            .bounded(Upstream::ContentStore, self.content.contains(&draft.content_hash))
            .await?;
        if !exists {
            info!(content_hash = %draft.content_hash, "write rejected: content not in store");
            return Err(AccessError::NotFound(Upstream::ContentStore.subject()));
        }

        // Once submitted, a ledger write is not rolled back if the caller
        // goes away, and it is never retried here.
        let tx = self
            .bounded(
                Upstream::RecordStore,
                self.records.add_record(&self.config.service_identity, &draft),
            )
            .await?;

        info!(patient = %draft.patient, tx = %tx, "record written");
        Ok(tx)
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Decide whether `caller` may read `patient`'s records.
    ///
    /// `caller` is taken as asserted by the request; only the stored
    /// consent is re-verified cryptographically.
    #[instrument(skip_all, fields(caller = %caller, patient = %patient))]
    pub async fn authorize_read(
        &self,
        caller: &Identity,
        patient: &Identity,
    ) -> Result<AuthorizationDecision, AccessError> {
        if caller == patient {
            return Ok(AuthorizationDecision::allow(DecisionReason::PatientOwner));
        }

        // Snapshot; the store lock is already released
        let Some(grant) = self.delegations.get(patient) else {
            info!("read denied: no consent on file");
            return Ok(AuthorizationDecision::deny(DecisionReason::NoConsentOnFile));
        };

        if let Some(reason) = self.consent_rejection(&grant, patient) {
            return Ok(AuthorizationDecision::deny(reason));
        }

        match self.clinical_role(caller).await? {
            Some(role) => {
                info!(%role, "read authorized by patient consent");
                Ok(AuthorizationDecision::allow(DecisionReason::DelegatedConsent))
            }
            None => {
                info!("read denied: caller holds no clinical role");
                Ok(AuthorizationDecision::deny(DecisionReason::NoClinicalRole))
            }
        }
    }

    /// Authorize, then list the patient's records newest first
    #[instrument(skip_all, fields(caller = %caller, patient = %patient))]
    pub async fn read_records(
        &self,
        caller: &Identity,
        patient: &Identity,
    ) -> Result<Vec<RecordEntry>, AccessError> {
        self.authorize_read(caller, patient).await?.into_result()?;

        let mut records = self
            .bounded(Upstream::RecordStore, self.records.get_records(patient, caller))
            .await?;
        sort_newest_first(&mut records);

        // the checks run together and share one timeout window
        let statuses = if self.config.probe_content {
            join_all(records.iter().map(|record| self.probe_content(&record.content_hash))).await
        } else {
            vec![ContentStatus::NotChecked; records.len()]
        };

        let entries = records
            .into_iter()
            .zip(statuses)
            .map(|(record, content)| RecordEntry {
                file_url: self.config.content_url(&record.content_hash),
                record,
                content,
            })
            .collect();
        Ok(entries)
    }

    // =========================================================================
    // Consent
    // =========================================================================

    /// Store a patient's self-signed consent, replacing any earlier one.
    /// Nothing is stored unless the payload verifies.
    #[instrument(skip_all, fields(grantor = %request.claimed_signer))]
    pub async fn register_consent(
        &self,
        request: &SignedPayload,
    ) -> Result<Arc<ConsentGrant>, AccessError> {
        let grantor = match request.verify() {
            Ok(grantor) => grantor,
            Err(PayloadError::Encoding(err)) => return Err(err.into()),
            Err(PayloadError::Signature(err)) => {
                warn!(error = %err, "consent rejected: malformed signature");
                return Err(err.into());
            }
            Err(PayloadError::Mismatch { claimed, recovered }) => {
                warn!(%claimed, %recovered, "consent rejected: not signed by grantor");
                return Err(AccessError::ConsentSignerMismatch { claimed, recovered });
            }
        };

        let grant = self.delegations.put(
            grantor,
            request.data.clone(),
            request.signature.clone(),
            self.clock.now(),
        );
        info!(issued_at = %grant.issued_at, "consent registered");
        Ok(grant)
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Upload a blob to the content store
    pub async fn store_content(&self, bytes: Vec<u8>) -> Result<ContentHash, AccessError> {
        let hash = self.bounded(Upstream::ContentStore, self.content.put(bytes)).await?;
        info!(content_hash = %hash, "content stored");
        Ok(hash)
    }

    /// Upload a JSON document as compact bytes
    pub async fn store_document(&self, document: &serde_json::Value) -> Result<ContentHash, AccessError> {
        let bytes = serde_json::to_vec(document).map_err(|_| EncodingError::InvalidJson)?;
        self.store_content(bytes).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn authenticate(&self, request: &SignedPayload) -> Result<Identity, AccessError> {
        match request.verify() {
            Ok(signer) => Ok(signer),
            Err(PayloadError::Encoding(err)) => Err(err.into()),
            Err(PayloadError::Signature(err)) => {
                warn!(error = %err, "malformed signature");
                Err(err.into())
            }
            Err(PayloadError::Mismatch { claimed, recovered }) => {
                warn!(%claimed, %recovered, "signature mismatch");
                Err(AccessError::SignatureMismatch { claimed, recovered })
            }
        }
    }

    /// Reason to ignore a stored grant, if any
    fn consent_rejection(&self, grant: &ConsentGrant, patient: &Identity) -> Option<DecisionReason> {
        if grant.grantor != *patient {
            warn!(grantor = %grant.grantor, "stored consent is keyed to another grantor");
            return Some(DecisionReason::ConsentNotAuthentic);
        }
        if let Err(err) = grant.reverify() {
            warn!(error = %err, "stored consent failed re-verification");
            return Some(DecisionReason::ConsentNotAuthentic);
        }
        if !self.policy.is_current(grant, self.clock.now()) {
            info!(issued_at = %grant.issued_at, "read denied: consent no longer current");
            return Some(DecisionReason::ConsentExpired);
        }
        None
    }

    /// First clinical role the registry confirms, querying in order and
    /// stopping at the first yes. Any failed query fails the whole check.
    async fn clinical_role(&self, who: &Identity) -> Result<Option<Role>, AccessError> {
        for role in Role::CLINICAL {
            if self.bounded(Upstream::RoleRegistry, self.roles.has_role(who, role)).await? {
                return Ok(Some(role));
            }
        }
        Ok(None)
    }

    async fn probe_content(&self, hash: &ContentHash) -> ContentStatus {
        match self.timed(self.content.contains(hash)).await {
            Ok(true) => ContentStatus::Available,
            Ok(false) => ContentStatus::Missing,
            Err(err) => {
                warn!(content_hash = %hash, error = %err, "content probe failed");
                ContentStatus::Unreachable
            }
        }
    }

    async fn timed<T, F>(&self, call: F) -> UpstreamResult<T>
    where
        F: Future<Output = UpstreamResult<T>>,
    {
        tokio::time::timeout(self.config.upstream_timeout(), call)
            .await
            .unwrap_or(Err(UpstreamError::Timeout))
    }

    /// Timed upstream call mapped into the public error taxonomy
    async fn bounded<T, F>(&self, upstream: Upstream, call: F) -> Result<T, AccessError>
    where
        F: Future<Output = UpstreamResult<T>>,
    {
        self.timed(call).await.map_err(|err| {
            let name = upstream.name();
            match &err {
                UpstreamError::Timeout | UpstreamError::Unavailable(_) => {
                    error!(upstream = name, error = %err, "upstream call failed")
                }
                UpstreamError::Denied(_) | UpstreamError::NotFound(_) => {
                    warn!(upstream = name, error = %err, "upstream refused call")
                }
            }
            AccessError::from_upstream(&err, upstream.subject())
        })
    }
}
