//! Medlog Access - authorization decisions for medical record access
//!
//! Decides who may write and who may read a patient's records by combining
//! wallet signatures (verified with `medlog-integrity`), the ledger's role
//! registry, and consent grants signed by the patient.
//!
//! ## Collaborators
//!
//! The engine never talks to a network itself. It calls:
//!
//! - [`RoleRegistry`]: Doctor / Nurse / Staff membership
//! - [`RecordStore`]: the ledger holding record references
//! - [`ContentStore`]: the content-addressed blob store
//!
//! Each call is bounded by [`AccessConfig::upstream_timeout`] and a failure
//! always resolves to Deny. [`memory`] has in-process implementations.
//!
//! ## Example
//!
//! ```rust,ignore
//! let engine = AuthorizationEngine::new(config, ledger.clone(), ledger, content, delegations);
//!
//! engine.register_consent(&patient_consent).await?;
//! let records = engine.read_records(&doctor, &patient).await?;
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod policy;
pub mod store;
pub mod upstream;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AccessConfig;
pub use engine::{
    AuthorizationDecision, AuthorizationEngine, ContentStatus, DecisionReason, RecordEntry,
};
pub use error::{AccessError, ConfigError, ErrorKind, UpstreamError};
pub use memory::{MemoryContentStore, MemoryLedger};
pub use policy::{ConsentPolicy, MaxAgeConsent, UnboundedConsent};
pub use store::DelegationStore;
pub use upstream::{ContentStore, RecordStore, RoleAdministrator, RoleRegistry, UpstreamResult};
