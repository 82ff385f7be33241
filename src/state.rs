//! Injected server state (component C8, §3/§5/§9 of SPEC_FULL.md): the lock
//! table, user-info map, and revoked-restricted-links set, plus handles to
//! the three pluggable collaborators, bundled into one `Clone`-able value
//! passed to every handler via axum's `State` extractor rather than kept as
//! a process-wide singleton.
//!
//! This mirrors the teacher's own `Server` struct in
//! `durable-object/src/server.rs`, which groups its `Rc<RefCell<HashMap<...>>>`
//! fields behind one value shared by every connection; here the fields are
//! `std::sync::Mutex`-guarded instead of `RefCell`-guarded because handlers
//! run on a multi-threaded executor (§5), and the whole struct is wrapped in
//! an `Arc` so cloning it for axum's state plumbing is cheap.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::access::TokenAuthority;
use crate::lock::LockTable;
use crate::proof::ProofKeyValidator;
use crate::storage::Storage;
use crate::types::FileId;

pub(crate) struct Inner {
    lock_table: LockTable,
    user_info: Mutex<HashMap<String, String>>,
    revoked_links: Mutex<HashSet<FileId>>,
    storage: Arc<dyn Storage>,
    token_authority: Arc<dyn TokenAuthority>,
    pub(crate) proof_key: Arc<dyn ProofKeyValidator>,
    pub(crate) machine_name: String,
}

/// Cheaply `Clone`-able handle to the server's shared state. Every axum
/// handler and middleware layer in [`crate::app`] is registered against this
/// single type via `Router::with_state`.
#[derive(Clone)]
pub struct AppState(Arc<Inner>);

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        token_authority: Arc<dyn TokenAuthority>,
        proof_key: Arc<dyn ProofKeyValidator>,
        machine_name: impl Into<String>,
    ) -> Self {
        AppState(Arc::new(Inner {
            lock_table: LockTable::new(),
            user_info: Mutex::new(HashMap::new()),
            revoked_links: Mutex::new(HashSet::new()),
            storage,
            token_authority,
            proof_key,
            machine_name: machine_name.into(),
        }))
    }

    pub fn lock_table(&self) -> &LockTable {
        &self.0.lock_table
    }

    pub fn storage(&self) -> &dyn Storage {
        self.0.storage.as_ref()
    }

    pub fn token_authority(&self) -> &dyn TokenAuthority {
        self.0.token_authority.as_ref()
    }

    /// Current stored user-info string for `user`, if `PutUserInfo` has ever
    /// been called for them.
    pub fn user_info(&self, user: &str) -> Option<String> {
        self.0.user_info.lock().unwrap().get(user).cloned()
    }

    pub fn set_user_info(&self, user: &str, info: String) {
        self.0
            .user_info
            .lock()
            .unwrap()
            .insert(user.to_string(), info);
    }

    pub fn is_link_revoked(&self, id: &FileId) -> bool {
        self.0.revoked_links.lock().unwrap().contains(id)
    }

    pub fn revoke_link(&self, id: &FileId) {
        self.0.revoked_links.lock().unwrap().insert(id.clone());
    }
}

impl std::ops::Deref for AppState {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::InMemoryTokenAuthority;
    use crate::proof::AllowAll;
    use crate::storage::mem::MemStorage;

    fn state() -> AppState {
        AppState::new(
            Arc::new(MemStorage::new("root")),
            Arc::new(InMemoryTokenAuthority::new()),
            Arc::new(AllowAll),
            "test-machine",
        )
    }

    #[test]
    fn user_info_round_trips() {
        let state = state();
        assert_eq!(state.user_info("alice"), None);
        state.set_user_info("alice", "hello".to_string());
        assert_eq!(state.user_info("alice"), Some("hello".to_string()));
    }

    #[test]
    fn revoked_links_are_tracked_per_file() {
        let state = state();
        let id = FileId::new("doc.docx");
        assert!(!state.is_link_revoked(&id));
        state.revoke_link(&id);
        assert!(state.is_link_revoked(&id));
    }

    #[test]
    fn clone_shares_the_same_underlying_state() {
        let state = state();
        let clone = state.clone();
        state.set_user_info("alice", "x".to_string());
        assert_eq!(clone.user_info("alice"), Some("x".to_string()));
    }
}
