//! Lock recovery utilities for poisoned mutexes.

use std::sync::{Mutex, MutexGuard};

/// Recover from a poisoned mutex while logging the context.
///
/// Poison only marks that some thread panicked while holding the guard; the
/// guarded state here (reservoirs, subscription sets, symbol tables) stays
/// structurally intact, so recovery is always safe.
pub(crate) fn recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::debug!("[sim] WARNING: {} poisoned, recovering", context);
            poisoned.into_inner()
        }
    }
}
