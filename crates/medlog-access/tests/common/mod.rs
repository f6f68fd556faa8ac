//! Shared harness: an engine wired to in-memory collaborators

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use medlog_access::{
    AccessConfig, AuthorizationEngine, ConsentPolicy, DelegationStore, ManualClock,
    MemoryContentStore, MemoryLedger, RoleAdministrator,
};
use medlog_integrity::{ContentHash, Identity, LocalSigner, PayloadData, Role, SignedPayload};

pub const GATEWAY: &str = "https://gateway.test/ipfs/";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub engine: AuthorizationEngine,
    pub ledger: Arc<MemoryLedger>,
    pub content: Arc<MemoryContentStore>,
    pub delegations: Arc<DelegationStore>,
    pub clock: Arc<ManualClock>,
    /// Ledger owner and the identity the service transacts under
    pub owner: LocalSigner,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut AccessConfig)) -> Self {
        let owner = LocalSigner::from_seed("service-owner");
        let clock = Arc::new(ManualClock::new(start_time()));
        let ledger = Arc::new(MemoryLedger::new(owner.identity()).with_clock(clock.clone()));
        let content = Arc::new(MemoryContentStore::new());
        let delegations = Arc::new(DelegationStore::new());

        let mut config = AccessConfig::new(owner.identity());
        config.upstream_timeout_ms = 100;
        config.content_gateway = GATEWAY.to_string();
        adjust(&mut config);

        let engine = AuthorizationEngine::new(
            config,
            ledger.clone(),
            ledger.clone(),
            content.clone(),
            delegations.clone(),
        )
        .with_clock(clock.clone());

        Harness {
            engine,
            ledger,
            content,
            delegations,
            clock,
            owner,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn ConsentPolicy>) -> Self {
        self.engine = self.engine.with_policy(policy);
        self
    }

    pub async fn grant_role(&self, who: &LocalSigner, role: Role) {
        self.ledger
            .assign_role(&self.owner.identity(), &who.identity(), role)
            .await
            .unwrap();
    }

    /// Upload a document and return its address
    pub async fn upload(&self, document: serde_json::Value) -> ContentHash {
        self.engine.store_document(&document).await.unwrap()
    }
}

pub fn record_payload(patient: &Identity, content_hash: &ContentHash) -> PayloadData {
    PayloadData::new()
        .with("patientAddress", patient.to_string())
        .with("condition", "Type 2 diabetes")
        .with("diagnosis", "HbA1c 7.9%")
        .with("treatment", "Metformin 500mg twice daily")
        .with("ipfsHash", content_hash.as_str())
}

pub fn consent_payload(patient: &Identity) -> PayloadData {
    PayloadData::new()
        .with("grantor", patient.to_string())
        .with("scope", "share-records")
        .with("issuedAt", "2026-01-05T09:00:00Z")
}

/// Consent signed by the patient themself
pub fn signed_consent(patient: &LocalSigner) -> SignedPayload {
    patient.sign_payload(consent_payload(&patient.identity())).unwrap()
}
