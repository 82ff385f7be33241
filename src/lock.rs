//! The in-process lock table (component C3) and the per-file lock state
//! machine it drives (component C3's transition table, §4.3 of
//! SPEC_FULL.md).
//!
//! This follows the same shape as the teacher's per-path `FileLockState`
//! transition table in `durable-object/src/server.rs::FileConnection::lock`:
//! a `match` over `(current state, requested transition)` that both decides
//! whether the transition is legal and, on acceptance, mutates the state in
//! place, all performed while a single mutex guard is held so the
//! decide-and-mutate window can never be split across two lock acquisitions.

use std::collections::HashMap;
use std::sync::Mutex;

use time::{Duration, OffsetDateTime};

use crate::types::FileId;

/// How long an unrefreshed lock remains valid.
pub const LOCK_EXPIRY: Duration = Duration::minutes(30);

/// Reason text for the one case where WOPI wants an explanatory header
/// alongside the lock-mismatch status.
pub const REASON_NOT_LOCKED: &str = "File not locked";

#[derive(Debug, Clone)]
struct LockInfo {
    lock: String,
    created_at: OffsetDateTime,
}

impl LockInfo {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        now - self.created_at >= LOCK_EXPIRY
    }
}

/// Outcome of a lock-table transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// Transition accepted; the file is now locked with the given string
    /// (for `GetLock`, the `lock` field is the *current* lock, possibly
    /// empty, and the call never fails).
    Ok { lock: String },
    /// Transition rejected. `current` is always present (possibly empty) so
    /// callers can set `X-WOPI-Lock` unconditionally; `reason` is set only
    /// for the "unlocked file touched by Unlock/RefreshLock/UnlockAndRelock"
    /// case.
    Conflict {
        current: String,
        reason: Option<&'static str>,
    },
}

/// Process-wide map of FileId to its current lock, if any. Owned by
/// [`crate::state::AppState`] and shared behind an `Arc` rather than kept as
/// a singleton (Design Notes, SPEC_FULL.md §9).
#[derive(Default)]
pub struct LockTable {
    locks: Mutex<HashMap<FileId, LockInfo>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Lock` override: §4.3 rows 1-3.
    pub fn lock(&self, id: &FileId, new_lock: &str, now: OffsetDateTime) -> LockOutcome {
        let mut locks = self.locks.lock().unwrap();
        reap_expired(&mut locks, id, now);

        let outcome = match locks.get_mut(id) {
            None => {
                locks.insert(
                    id.clone(),
                    LockInfo {
                        lock: new_lock.to_string(),
                        created_at: now,
                    },
                );
                LockOutcome::Ok {
                    lock: new_lock.to_string(),
                }
            }
            Some(existing) if existing.lock == new_lock => {
                existing.created_at = now;
                LockOutcome::Ok {
                    lock: existing.lock.clone(),
                }
            }
            Some(existing) => LockOutcome::Conflict {
                current: existing.lock.clone(),
                reason: None,
            },
        };
        log::debug!("{id} lock request {new_lock:?} -> {outcome:?}");
        outcome
    }

    /// `Unlock` override: §4.3 rows 4-6.
    pub fn unlock(&self, id: &FileId, lock: &str, now: OffsetDateTime) -> LockOutcome {
        let mut locks = self.locks.lock().unwrap();
        reap_expired(&mut locks, id, now);

        let outcome = match locks.get(id) {
            Some(existing) if existing.lock == lock => {
                locks.remove(id);
                LockOutcome::Ok {
                    lock: String::new(),
                }
            }
            Some(existing) => LockOutcome::Conflict {
                current: existing.lock.clone(),
                reason: None,
            },
            None => LockOutcome::Conflict {
                current: String::new(),
                reason: Some(REASON_NOT_LOCKED),
            },
        };
        log::debug!("{id} unlock request {lock:?} -> {outcome:?}");
        outcome
    }

    /// `RefreshLock` override: §4.3 rows 7-9.
    pub fn refresh_lock(&self, id: &FileId, lock: &str, now: OffsetDateTime) -> LockOutcome {
        let mut locks = self.locks.lock().unwrap();
        reap_expired(&mut locks, id, now);

        let outcome = match locks.get_mut(id) {
            Some(existing) if existing.lock == lock => {
                existing.created_at = now;
                LockOutcome::Ok {
                    lock: existing.lock.clone(),
                }
            }
            Some(existing) => LockOutcome::Conflict {
                current: existing.lock.clone(),
                reason: None,
            },
            None => LockOutcome::Conflict {
                current: String::new(),
                reason: Some(REASON_NOT_LOCKED),
            },
        };
        log::debug!("{id} refresh_lock request {lock:?} -> {outcome:?}");
        outcome
    }

    /// `LOCK` override with `X-WOPI-OldLock` present: §4.3 rows 10-12. Note
    /// the WOPI quirk, preserved here rather than "fixed": on success the
    /// `X-WOPI-OldLock` response header carries the *new* lock string, not
    /// the old one.
    pub fn unlock_and_relock(
        &self,
        id: &FileId,
        old_lock: &str,
        new_lock: &str,
        now: OffsetDateTime,
    ) -> LockOutcome {
        let mut locks = self.locks.lock().unwrap();
        reap_expired(&mut locks, id, now);

        let outcome = match locks.get_mut(id) {
            Some(existing) if existing.lock == old_lock => {
                existing.lock = new_lock.to_string();
                existing.created_at = now;
                LockOutcome::Ok {
                    lock: new_lock.to_string(),
                }
            }
            Some(existing) => LockOutcome::Conflict {
                current: existing.lock.clone(),
                reason: None,
            },
            None => LockOutcome::Conflict {
                current: String::new(),
                reason: Some(REASON_NOT_LOCKED),
            },
        };
        log::debug!("{id} unlock_and_relock request {old_lock:?} -> {new_lock:?}: {outcome:?}");
        outcome
    }

    /// `GetLock` override: §4.3 rows 13-14. Never fails.
    pub fn get_lock(&self, id: &FileId, now: OffsetDateTime) -> String {
        let mut locks = self.locks.lock().unwrap();
        reap_expired(&mut locks, id, now);
        locks.get(id).map(|l| l.lock.clone()).unwrap_or_default()
    }

    /// Read-only peek used by `PutRelativeFile`'s relative-target overwrite
    /// check, which need to know the current lock (if any) without
    /// performing a transition.
    pub fn current(&self, id: &FileId, now: OffsetDateTime) -> Option<String> {
        let mut locks = self.locks.lock().unwrap();
        reap_expired(&mut locks, id, now);
        locks.get(id).map(|l| l.lock.clone())
    }

    /// Read-decide check used by `PutFile`/`DeleteFile`/`RenameFile` (§5):
    /// accepts when the file is unlocked, or when its current lock equals
    /// `expected_lock`; rejects otherwise. Unlike [`LockTable::current`],
    /// this performs the get-and-compare in one mutex acquisition, so a
    /// concurrent `Lock`/`Unlock` can never land between the read and the
    /// decision.
    pub fn check(&self, id: &FileId, expected_lock: &str, now: OffsetDateTime) -> LockOutcome {
        let mut locks = self.locks.lock().unwrap();
        reap_expired(&mut locks, id, now);

        match locks.get(id) {
            None => LockOutcome::Ok {
                lock: String::new(),
            },
            Some(existing) if existing.lock == expected_lock => LockOutcome::Ok {
                lock: existing.lock.clone(),
            },
            Some(existing) => LockOutcome::Conflict {
                current: existing.lock.clone(),
                reason: None,
            },
        }
    }
}

fn reap_expired(locks: &mut HashMap<FileId, LockInfo>, id: &FileId, now: OffsetDateTime) {
    if let Some(existing) = locks.get(id) {
        if existing.is_expired(now) {
            locks.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> FileId {
        FileId::new("doc.docx")
    }

    #[test]
    fn lock_then_get_lock_round_trips() {
        let table = LockTable::new();
        let now = OffsetDateTime::now_utc();
        assert_eq!(
            table.lock(&id(), "L1", now),
            LockOutcome::Ok {
                lock: "L1".to_string()
            }
        );
        assert_eq!(table.get_lock(&id(), now), "L1");
    }

    #[test]
    fn second_lock_with_different_string_conflicts() {
        let table = LockTable::new();
        let now = OffsetDateTime::now_utc();
        table.lock(&id(), "L1", now);
        assert_eq!(
            table.lock(&id(), "L2", now),
            LockOutcome::Conflict {
                current: "L1".to_string(),
                reason: None
            }
        );
    }

    #[test]
    fn lock_with_same_string_refreshes() {
        let table = LockTable::new();
        let t0 = OffsetDateTime::now_utc();
        table.lock(&id(), "L1", t0);
        let t1 = t0 + Duration::minutes(10);
        assert_eq!(
            table.lock(&id(), "L1", t1),
            LockOutcome::Ok {
                lock: "L1".to_string()
            }
        );
        // still valid 25 minutes after the refresh, i.e. 35 after the original lock
        let t2 = t1 + Duration::minutes(25);
        assert_eq!(table.get_lock(&id(), t2), "L1");
    }

    #[test]
    fn unlock_then_unlocked_is_not_locked() {
        let table = LockTable::new();
        let now = OffsetDateTime::now_utc();
        table.lock(&id(), "L1", now);
        assert_eq!(
            table.unlock(&id(), "L1", now),
            LockOutcome::Ok {
                lock: String::new()
            }
        );
        assert_eq!(table.get_lock(&id(), now), "");
    }

    #[test]
    fn unlock_on_unlocked_file_reports_not_locked() {
        let table = LockTable::new();
        let now = OffsetDateTime::now_utc();
        assert_eq!(
            table.unlock(&id(), "L1", now),
            LockOutcome::Conflict {
                current: String::new(),
                reason: Some(REASON_NOT_LOCKED),
            }
        );
    }

    #[test]
    fn unlock_and_relock_round_trips_through_get_lock() {
        let table = LockTable::new();
        let now = OffsetDateTime::now_utc();
        table.lock(&id(), "L1", now);
        assert_eq!(
            table.unlock_and_relock(&id(), "L1", "M", now),
            LockOutcome::Ok {
                lock: "M".to_string()
            }
        );
        assert_eq!(table.get_lock(&id(), now), "M");
    }

    #[test]
    fn expired_lock_is_reaped_on_next_touch() {
        let table = LockTable::new();
        let t0 = OffsetDateTime::now_utc();
        table.lock(&id(), "L1", t0);
        let t1 = t0 + LOCK_EXPIRY;
        // expiry is defined as now - created_at >= 30 minutes
        assert_eq!(table.get_lock(&id(), t1), "");
        // and a fresh lock can now be taken by a different string
        assert_eq!(
            table.lock(&id(), "L2", t1),
            LockOutcome::Ok {
                lock: "L2".to_string()
            }
        );
    }

    #[test]
    fn check_accepts_unlocked_regardless_of_expected_lock() {
        let table = LockTable::new();
        let now = OffsetDateTime::now_utc();
        assert_eq!(
            table.check(&id(), "anything", now),
            LockOutcome::Ok {
                lock: String::new()
            }
        );
    }

    #[test]
    fn check_accepts_matching_lock_and_rejects_mismatch() {
        let table = LockTable::new();
        let now = OffsetDateTime::now_utc();
        table.lock(&id(), "L1", now);
        assert_eq!(
            table.check(&id(), "L1", now),
            LockOutcome::Ok {
                lock: "L1".to_string()
            }
        );
        assert_eq!(
            table.check(&id(), "L2", now),
            LockOutcome::Conflict {
                current: "L1".to_string(),
                reason: None,
            }
        );
    }

    #[test]
    fn conflicts_always_carry_a_current_lock_value() {
        let table = LockTable::new();
        let now = OffsetDateTime::now_utc();
        // unlocked file: conflict carries an empty current lock, never absent
        match table.unlock(&id(), "X", now) {
            LockOutcome::Conflict { current, .. } => assert_eq!(current, ""),
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
