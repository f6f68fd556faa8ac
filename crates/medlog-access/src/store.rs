//! Delegation store
//!
//! Holds the one active consent grant per patient. The store is plain
//! data: it never checks signatures, callers verify before `put` and
//! re-verify after `get`.
//!
//! Grants are kept behind `Arc` so a reader takes a complete snapshot
//! under the read lock and drops the lock immediately. Nothing awaits
//! while holding it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use medlog_integrity::{ConsentGrant, Identity, PayloadData};
use parking_lot::RwLock;

/// Concurrent grantor -> grant table
#[derive(Debug, Default)]
pub struct DelegationStore {
    grants: RwLock<HashMap<Identity, Arc<ConsentGrant>>>,
}

impl DelegationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever grant `grantor` had. No history is kept.
    pub fn put(
        &self,
        grantor: Identity,
        message: PayloadData,
        signature: Vec<u8>,
        issued_at: DateTime<Utc>,
    ) -> Arc<ConsentGrant> {
        // build outside the lock; the swap itself is the only critical section
        let grant = Arc::new(ConsentGrant::new(grantor, message, signature, issued_at));
        self.grants.write().insert(grantor, Arc::clone(&grant));
        grant
    }

    /// Snapshot of the current grant, if any
    pub fn get(&self, grantor: &Identity) -> Option<Arc<ConsentGrant>> {
        self.grants.read().get(grantor).cloned()
    }

    pub fn len(&self) -> usize {
        self.grants.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(n: u8) -> Identity {
        Identity::from_bytes([n; 20])
    }

    #[test]
    fn test_put_then_get() {
        let store = DelegationStore::new();
        assert!(store.get(&identity(1)).is_none());

        let now = Utc::now();
        store.put(identity(1), PayloadData::new().with("scope", "share-records"), vec![1, 2, 3], now);

        let grant = store.get(&identity(1)).unwrap();
        assert_eq!(grant.grantor, identity(1));
        assert_eq!(grant.signature, vec![1, 2, 3]);
        assert_eq!(grant.issued_at, now);
        assert!(store.get(&identity(2)).is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let store = DelegationStore::new();
        store.put(identity(1), PayloadData::new().with("v", 1), vec![1], Utc::now());
        store.put(identity(1), PayloadData::new().with("v", 2), vec![2], Utc::now());

        assert_eq!(store.len(), 1);
        let grant = store.get(&identity(1)).unwrap();
        assert_eq!(grant.signature, vec![2]);
        assert_eq!(grant.message.get("v"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_snapshot_survives_replacement() {
        let store = DelegationStore::new();
        store.put(identity(1), PayloadData::new().with("v", 1), vec![1], Utc::now());

        let before = store.get(&identity(1)).unwrap();
        store.put(identity(1), PayloadData::new().with("v", 2), vec![2], Utc::now());

        // the old snapshot is still whole
        assert_eq!(before.signature, vec![1]);
        assert_eq!(before.message.get("v"), Some(&serde_json::json!(1)));
    }
}
