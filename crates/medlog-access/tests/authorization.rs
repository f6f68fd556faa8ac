//! Authorization decision tests
//!
//! Covers:
//! - Write authentication (recovered signer == claimed signer)
//! - Write authorization by clinical role
//! - Read rules: ownership, then role plus re-verified consent
//! - Consent registration and replacement
//! - Fail-closed behaviour on upstream timeouts and outages
//! - Consent validity policies
//!
//! ```bash
//! cargo test -p medlog-access --test authorization
//! ```

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use common::{consent_payload, record_payload, signed_consent, Harness};
use medlog_access::{
    AccessError, AuthorizationDecision, DecisionReason, ErrorKind, MaxAgeConsent,
};
use medlog_integrity::{ContentHash, LocalSigner, Role, SignedPayload};

fn blob() -> ContentHash {
    ContentHash::new("QmRecordBlob1").unwrap()
}

// ============================================================================
// Write path
// ============================================================================

#[tokio::test]
async fn test_doctor_write_authorized() {
    let h = Harness::new();
    let doctor = LocalSigner::from_seed("doctor");
    let patient = LocalSigner::from_seed("patient");
    h.grant_role(&doctor, Role::Doctor).await;

    let request = doctor
        .sign_payload(record_payload(&patient.identity(), &blob()))
        .unwrap();
    let decision = h.engine.authorize_write(&request).await.unwrap();
    assert_eq!(
        decision,
        AuthorizationDecision::allow(DecisionReason::AuthorizedPersonnel)
    );
}

#[tokio::test]
async fn test_every_clinical_role_may_write() {
    let h = Harness::new();
    let patient = LocalSigner::from_seed("patient");

    for (seed, role) in [("d", Role::Doctor), ("n", Role::Nurse), ("s", Role::Staff)] {
        let member = LocalSigner::from_seed(seed);
        h.grant_role(&member, role).await;
        let request = member
            .sign_payload(record_payload(&patient.identity(), &blob()))
            .unwrap();
        assert!(h.engine.authorize_write(&request).await.unwrap().allowed, "{role}");
    }
}

#[tokio::test]
async fn test_write_without_role_is_unauthorized() {
    let h = Harness::new();
    let stranger = LocalSigner::from_seed("stranger");
    let patient = LocalSigner::from_seed("patient");

    let request = stranger
        .sign_payload(record_payload(&patient.identity(), &blob()))
        .unwrap();

    let decision = h.engine.authorize_write(&request).await.unwrap();
    assert_eq!(decision, AuthorizationDecision::deny(DecisionReason::NoClinicalRole));

    let err = h.engine.write_record(&request).await.unwrap_err();
    assert_eq!(err, AccessError::Unauthorized(DecisionReason::NoClinicalRole));
    assert_eq!(h.ledger.record_count(&patient.identity()), 0);
}

#[tokio::test]
async fn test_write_claiming_someone_else_is_mismatch() {
    let h = Harness::new();
    let doctor = LocalSigner::from_seed("doctor");
    let impostor = LocalSigner::from_seed("impostor");
    let patient = LocalSigner::from_seed("patient");
    h.grant_role(&doctor, Role::Doctor).await;

    // signed by the impostor, claimed as the doctor
    let signed = impostor
        .sign_payload(record_payload(&patient.identity(), &blob()))
        .unwrap();
    let forged = SignedPayload::new(signed.data, signed.signature, doctor.identity());

    let err = h.engine.authorize_write(&forged).await.unwrap_err();
    assert_eq!(
        err,
        AccessError::SignatureMismatch {
            claimed: doctor.identity(),
            recovered: impostor.identity(),
        }
    );
    assert_eq!(err.kind(), ErrorKind::SignatureMismatch);
}

#[tokio::test]
async fn test_clinician_cannot_claim_another_identity() {
    let h = Harness::new();
    let doctor = LocalSigner::from_seed("doctor");
    let nurse = LocalSigner::from_seed("nurse");
    let patient = LocalSigner::from_seed("patient");
    h.grant_role(&doctor, Role::Doctor).await;
    h.grant_role(&nurse, Role::Nurse).await;
    let hash = h.upload(serde_json::json!({"note": "ward round"})).await;

    // a real doctor signs, but claims to be the nurse
    let signed = doctor
        .sign_payload(record_payload(&patient.identity(), &hash))
        .unwrap();
    let claimed = SignedPayload::new(signed.data, signed.signature, nurse.identity());

    let expected = AccessError::SignatureMismatch {
        claimed: nurse.identity(),
        recovered: doctor.identity(),
    };
    assert_eq!(h.engine.authorize_write(&claimed).await.unwrap_err(), expected);
    assert_eq!(h.engine.write_record(&claimed).await.unwrap_err(), expected);
    assert_eq!(h.ledger.record_count(&patient.identity()), 0);
}

#[tokio::test]
async fn test_edited_payload_no_longer_authenticates() {
    let h = Harness::new();
    let doctor = LocalSigner::from_seed("doctor");
    let patient = LocalSigner::from_seed("patient");
    h.grant_role(&doctor, Role::Doctor).await;

    let mut request = doctor
        .sign_payload(record_payload(&patient.identity(), &blob()))
        .unwrap();
    request.data.insert("diagnosis", "HbA1c 5.1%");

    let err = h.engine.authorize_write(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SignatureMismatch);
}

#[tokio::test]
async fn test_malformed_signature_rejected() {
    let h = Harness::new();
    let doctor = LocalSigner::from_seed("doctor");
    let patient = LocalSigner::from_seed("patient");

    let mut request = doctor
        .sign_payload(record_payload(&patient.identity(), &blob()))
        .unwrap();
    request.signature.truncate(64);

    let err = h.engine.authorize_write(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSignature);
}

// ============================================================================
// Read path
// ============================================================================

#[tokio::test]
async fn test_patient_reads_own_records() {
    let h = Harness::new();
    let patient = LocalSigner::from_seed("patient");

    // no role and no consent needed
    let decision = h
        .engine
        .authorize_read(&patient.identity(), &patient.identity())
        .await
        .unwrap();
    assert_eq!(decision, AuthorizationDecision::allow(DecisionReason::PatientOwner));
}

#[tokio::test]
async fn test_staff_needs_consent() {
    let h = Harness::new();
    let patient = LocalSigner::from_seed("patient");
    let staff = LocalSigner::from_seed("staff");
    h.grant_role(&staff, Role::Staff).await;

    let before = h
        .engine
        .authorize_read(&staff.identity(), &patient.identity())
        .await
        .unwrap();
    assert_eq!(before, AuthorizationDecision::deny(DecisionReason::NoConsentOnFile));

    h.engine.register_consent(&signed_consent(&patient)).await.unwrap();

    let after = h
        .engine
        .authorize_read(&staff.identity(), &patient.identity())
        .await
        .unwrap();
    assert_eq!(after, AuthorizationDecision::allow(DecisionReason::DelegatedConsent));
}

#[tokio::test]
async fn test_consent_does_not_help_callers_without_role() {
    let h = Harness::new();
    let patient = LocalSigner::from_seed("patient");
    let neighbour = LocalSigner::from_seed("neighbour");

    h.engine.register_consent(&signed_consent(&patient)).await.unwrap();

    let decision = h
        .engine
        .authorize_read(&neighbour.identity(), &patient.identity())
        .await
        .unwrap();
    assert_eq!(decision, AuthorizationDecision::deny(DecisionReason::NoClinicalRole));
}

#[tokio::test]
async fn test_consent_from_another_patient_does_not_apply() {
    let h = Harness::new();
    let alice = LocalSigner::from_seed("alice");
    let bob = LocalSigner::from_seed("bob");
    let nurse = LocalSigner::from_seed("nurse");
    h.grant_role(&nurse, Role::Nurse).await;

    h.engine.register_consent(&signed_consent(&alice)).await.unwrap();

    let decision = h
        .engine
        .authorize_read(&nurse.identity(), &bob.identity())
        .await
        .unwrap();
    assert_eq!(decision, AuthorizationDecision::deny(DecisionReason::NoConsentOnFile));
}

#[tokio::test]
async fn test_tampered_stored_consent_denies() {
    let h = Harness::new();
    let patient = LocalSigner::from_seed("patient");
    let doctor = LocalSigner::from_seed("doctor");
    h.grant_role(&doctor, Role::Doctor).await;

    let grant = h.engine.register_consent(&signed_consent(&patient)).await.unwrap();
    assert!(h
        .engine
        .authorize_read(&doctor.identity(), &patient.identity())
        .await
        .unwrap()
        .allowed);

    // rewrite the stored message, keep the old signature
    let tampered = consent_payload(&patient.identity()).with("scope", "share-everything");
    h.delegations.put(
        patient.identity(),
        tampered,
        grant.signature.clone(),
        grant.issued_at,
    );

    let decision = h
        .engine
        .authorize_read(&doctor.identity(), &patient.identity())
        .await
        .unwrap();
    assert_eq!(
        decision,
        AuthorizationDecision::deny(DecisionReason::ConsentNotAuthentic)
    );
}

#[tokio::test]
async fn test_patient_grants_doctor_scenario() {
    let h = Harness::new();
    let patient = LocalSigner::from_seed("0xPatient");
    let doctor = LocalSigner::from_seed("0xDoctor");
    h.grant_role(&doctor, Role::Doctor).await;

    // the patient is always allowed, the doctor only once consent exists
    assert!(h.engine.authorize_read(&patient.identity(), &patient.identity()).await.unwrap().allowed);
    assert!(!h.engine.authorize_read(&doctor.identity(), &patient.identity()).await.unwrap().allowed);

    let grant = h.engine.register_consent(&signed_consent(&patient)).await.unwrap();
    assert_eq!(grant.grantor, patient.identity());
    assert_eq!(grant.issued_at, common::start_time());

    assert!(h.engine.authorize_read(&doctor.identity(), &patient.identity()).await.unwrap().allowed);

    // the doctor cannot read in the other direction
    assert!(!h.engine.authorize_read(&patient.identity(), &doctor.identity()).await.unwrap().allowed);
}

// ============================================================================
// Consent registration
// ============================================================================

#[tokio::test]
async fn test_consent_signed_by_someone_else_is_not_stored() {
    let h = Harness::new();
    let patient = LocalSigner::from_seed("patient");
    let doctor = LocalSigner::from_seed("doctor");

    // the doctor signs a consent naming the patient as grantor
    let signed = doctor.sign_payload(consent_payload(&patient.identity())).unwrap();
    let forged = SignedPayload::new(signed.data, signed.signature, patient.identity());

    let err = h.engine.register_consent(&forged).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSignature);
    assert_eq!(err.public_message(), "invalid signature");
    assert!(h.delegations.is_empty());
}

#[tokio::test]
async fn test_malformed_consent_signature_is_not_stored() {
    let h = Harness::new();
    let patient = LocalSigner::from_seed("patient");

    let mut request = signed_consent(&patient);
    request.signature[64] = 31;

    let err = h.engine.register_consent(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSignature);
    assert!(h.delegations.get(&patient.identity()).is_none());
}

#[tokio::test]
async fn test_newer_consent_replaces_older() {
    let h = Harness::new();
    let patient = LocalSigner::from_seed("patient");

    h.engine.register_consent(&signed_consent(&patient)).await.unwrap();
    h.clock.advance(ChronoDuration::hours(2));

    let renewed = patient
        .sign_payload(consent_payload(&patient.identity()).with("issuedAt", "2026-01-05T11:00:00Z"))
        .unwrap();
    h.engine.register_consent(&renewed).await.unwrap();

    assert_eq!(h.delegations.len(), 1);
    let stored = h.delegations.get(&patient.identity()).unwrap();
    assert_eq!(stored.message, renewed.data);
    assert_eq!(stored.issued_at, common::start_time() + ChronoDuration::hours(2));
    assert!(stored.is_authentic());
}

// ============================================================================
// Fail closed
// ============================================================================

#[tokio::test]
async fn test_role_query_timeout_denies() {
    let h = Harness::new();
    let patient = LocalSigner::from_seed("patient");
    let doctor = LocalSigner::from_seed("doctor");
    h.grant_role(&doctor, Role::Doctor).await;
    h.engine.register_consent(&signed_consent(&patient)).await.unwrap();

    h.ledger.set_latency(Some(Duration::from_secs(5)));

    let err = h
        .engine
        .authorize_read(&doctor.identity(), &patient.identity())
        .await
        .unwrap_err();
    assert_eq!(err, AccessError::UpstreamUnavailable);
    assert!(err.kind().is_retryable());

    // ownership needs no upstream call
    assert!(h
        .engine
        .authorize_read(&patient.identity(), &patient.identity())
        .await
        .unwrap()
        .allowed);
}

#[tokio::test]
async fn test_ledger_outage_denies_writes() {
    let h = Harness::new();
    let doctor = LocalSigner::from_seed("doctor");
    let patient = LocalSigner::from_seed("patient");
    h.grant_role(&doctor, Role::Doctor).await;
    h.ledger.set_available(false);

    let request = doctor
        .sign_payload(record_payload(&patient.identity(), &blob()))
        .unwrap();
    let err = h.engine.authorize_write(&request).await.unwrap_err();
    assert_eq!(err, AccessError::UpstreamUnavailable);
    assert_eq!(err.public_message(), "upstream service unavailable");
}

// ============================================================================
// Consent policy
// ============================================================================

#[tokio::test]
async fn test_max_age_consent_lapses() {
    let h = Harness::new().with_policy(Arc::new(MaxAgeConsent::new(ChronoDuration::days(30))));
    let patient = LocalSigner::from_seed("patient");
    let nurse = LocalSigner::from_seed("nurse");
    h.grant_role(&nurse, Role::Nurse).await;

    h.engine.register_consent(&signed_consent(&patient)).await.unwrap();
    h.clock.advance(ChronoDuration::days(29));
    assert!(h.engine.authorize_read(&nurse.identity(), &patient.identity()).await.unwrap().allowed);

    h.clock.advance(ChronoDuration::days(2));
    let decision = h
        .engine
        .authorize_read(&nurse.identity(), &patient.identity())
        .await
        .unwrap();
    assert_eq!(decision, AuthorizationDecision::deny(DecisionReason::ConsentExpired));

    // a fresh grant restores access
    h.engine.register_consent(&signed_consent(&patient)).await.unwrap();
    assert!(h.engine.authorize_read(&nurse.identity(), &patient.identity()).await.unwrap().allowed);
}
