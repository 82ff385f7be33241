//! The Access Gate (component C2, §4.2 of SPEC_FULL.md) and the pluggable
//! [`TokenAuthority`] it consults. Token minting, binding lookup and the
//! per-user permission table are grouped behind one trait because the
//! distilled spec treats them as a single external collaborator ("Access
//! token minting and validation, and the per-user permission lookup").

use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;

use crate::types::{FileId, Permission};

/// What an access token, once resolved, is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBinding {
    pub user: String,
    pub file: FileId,
}

/// Every access-gate failure collapses to the same outcome: `401 Invalid
/// Token`. The distilled spec does not distinguish "token doesn't exist"
/// from "token valid but insufficient permission" at the HTTP layer, so
/// there is no reason to carry more information than this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied;

/// Validates access tokens and answers permission questions about them.
pub trait TokenAuthority: Send + Sync {
    /// Mint a fresh opaque token bound to `(user, file)` at the given
    /// permission level.
    fn mint(&self, user: &str, file: &FileId, permission: Permission) -> String;

    /// Resolve a token to the file it is bound to and the user that
    /// requested it, or `None` if the token is unknown.
    fn resolve(&self, token: &str) -> Option<TokenBinding>;

    /// The permission `user` currently holds over `file`, independent of any
    /// specific token (mirrors a real host's live ACL/permission lookup).
    fn permission_for(&self, user: &str, file: &FileId) -> Permission;
}

/// Runs the Access Gate: resolves `token`, checks it is bound to `file`, and
/// enforces `write_required` against the live permission lookup. A single
/// failure path keeps handler call sites to one `?`/`map_err`.
pub fn authorize(
    authority: &dyn TokenAuthority,
    token: &str,
    file: &FileId,
    write_required: bool,
) -> Result<TokenBinding, AccessDenied> {
    let binding = authority.resolve(token).ok_or(AccessDenied)?;
    if &binding.file != file {
        return Err(AccessDenied);
    }

    match authority.permission_for(&binding.user, file) {
        Permission::None => Err(AccessDenied),
        Permission::Read if write_required => Err(AccessDenied),
        Permission::Read | Permission::Write => Ok(binding),
    }
}

struct MintedToken {
    user: String,
    file: FileId,
    permission: Permission,
}

/// In-memory [`TokenAuthority`] suitable for development and for the test
/// harness: every minted token is remembered for the lifetime of the
/// process, and permissions are whatever was most recently granted via
/// [`InMemoryTokenAuthority::grant`].
#[derive(Default)]
pub struct InMemoryTokenAuthority {
    tokens: Mutex<HashMap<String, MintedToken>>,
    grants: Mutex<HashMap<(String, FileId), Permission>>,
}

impl InMemoryTokenAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `user` a permission level over `file`, consulted by
    /// [`TokenAuthority::permission_for`] and by [`TokenAuthority::mint`]
    /// when no explicit permission override is given.
    pub fn grant(&self, user: &str, file: &FileId, permission: Permission) {
        self.grants
            .lock()
            .unwrap()
            .insert((user.to_string(), file.clone()), permission);
    }

    fn random_token() -> String {
        let mut rng = rand::thread_rng();
        (0..32).map(|_| format!("{:x}", rng.gen_range(0..16))).collect()
    }
}

impl TokenAuthority for InMemoryTokenAuthority {
    fn mint(&self, user: &str, file: &FileId, permission: Permission) -> String {
        let token = Self::random_token();
        self.tokens.lock().unwrap().insert(
            token.clone(),
            MintedToken {
                user: user.to_string(),
                file: file.clone(),
                permission,
            },
        );
        self.grant(user, file, permission);
        token
    }

    fn resolve(&self, token: &str) -> Option<TokenBinding> {
        let tokens = self.tokens.lock().unwrap();
        tokens.get(token).map(|t| TokenBinding {
            user: t.user.clone(),
            file: t.file.clone(),
        })
    }

    fn permission_for(&self, user: &str, file: &FileId) -> Permission {
        self.grants
            .lock()
            .unwrap()
            .get(&(user.to_string(), file.clone()))
            .copied()
            .unwrap_or(Permission::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_token_resolves_to_its_binding() {
        let authority = InMemoryTokenAuthority::new();
        let file = FileId::new("doc.docx");
        let token = authority.mint("alice", &file, Permission::Write);
        let binding = authority.resolve(&token).unwrap();
        assert_eq!(binding.user, "alice");
        assert_eq!(binding.file, file);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let authority = InMemoryTokenAuthority::new();
        let file = FileId::new("doc.docx");
        assert_eq!(
            authorize(&authority, "bogus", &file, false),
            Err(AccessDenied)
        );
    }

    #[test]
    fn read_permission_rejects_write_required() {
        let authority = InMemoryTokenAuthority::new();
        let file = FileId::new("doc.docx");
        let token = authority.mint("alice", &file, Permission::Read);
        assert!(authorize(&authority, &token, &file, false).is_ok());
        assert_eq!(
            authorize(&authority, &token, &file, true),
            Err(AccessDenied)
        );
    }

    #[test]
    fn token_bound_to_a_different_file_is_rejected() {
        let authority = InMemoryTokenAuthority::new();
        let a = FileId::new("a.docx");
        let b = FileId::new("b.docx");
        let token = authority.mint("alice", &a, Permission::Write);
        assert_eq!(authorize(&authority, &token, &b, false), Err(AccessDenied));
    }

    #[test]
    fn none_permission_is_always_rejected_regardless_of_write_required() {
        let authority = InMemoryTokenAuthority::new();
        let file = FileId::new("doc.docx");
        authority.grant("alice", &file, Permission::None);
        // mint a token directly bound but with grants forced to None
        let token = authority.mint("alice", &file, Permission::Write);
        authority.grant("alice", &file, Permission::None);
        assert_eq!(
            authorize(&authority, &token, &file, false),
            Err(AccessDenied)
        );
        assert_eq!(
            authorize(&authority, &token, &file, true),
            Err(AccessDenied)
        );
    }
}
