//! Poison-tolerant lock access for the page cache.
//!
//! A panic while a guard is held poisons the lock. Cached pages are
//! disposable, so the guard is recovered and the event is logged instead of
//! propagating the panic into every later request.

use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), op, "rwlock.read")
}

pub(crate) fn rw_write<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), op, "rwlock.write")
}

fn recover<G>(result: LockResult<G>, op: &'static str, lock_kind: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target = "yatube::cache",
            op,
            lock_kind,
            result = "poisoned_recovered",
            "recovered from poisoned page cache lock"
        );
        poisoned.into_inner()
    })
}
