//! Reentrancy marker.
//!
//! While a hook runs, its namespace marks `(key, kind)` as active. A LOAD of a
//! name whose get-hook is running, or a STORE to a name whose set-hook is
//! running, would call the same hook again on the same binding; with the
//! guard enabled the namespace reports that as [`Error::ReentrantHook`]
//! instead. A set-hook that reads its own name is a different hook and is
//! allowed.
//!
//! Marks belong to the thread that set them. Two threads loading the same
//! cloaked name at once are not reentering anything.
//!
//! [`Error::ReentrantHook`]: crate::Error::ReentrantHook

use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};

use fxhash::FxHashSet;

use crate::cloak::HookKind;

type Entry<K> = (ThreadId, K, HookKind);

/// The set of hooks currently running against one namespace, per thread.
#[derive(Debug)]
pub struct ReentrancyGuard<K> {
    active: Mutex<FxHashSet<Entry<K>>>,
}

impl<K> Default for ReentrancyGuard<K> {
    fn default() -> Self {
        ReentrancyGuard {
            active: Mutex::new(FxHashSet::default()),
        }
    }
}

impl<K: Copy + Eq + Hash> ReentrancyGuard<K> {
    /// Empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `kind` on `key` as running on the current thread.
    ///
    /// Returns `None` when this thread is already running it; the existing
    /// mark is left in place. The new mark is cleared when the returned
    /// [`HookMark`] is dropped.
    #[must_use]
    pub fn enter(&self, key: K, kind: HookKind) -> Option<HookMark<'_, K>> {
        let entry = (thread::current().id(), key, kind);
        let inserted = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry);
        inserted.then(|| HookMark { guard: self, entry })
    }

    /// Whether the current thread is running `kind` on `key`.
    #[must_use]
    pub fn is_active(&self, key: K, kind: HookKind) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(thread::current().id(), key, kind))
    }

    /// Number of hooks currently marked, across all threads.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// An active mark; clears itself on drop.
#[derive(Debug)]
pub struct HookMark<'a, K: Copy + Eq + Hash> {
    guard: &'a ReentrancyGuard<K>,
    entry: Entry<K>,
}

impl<K: Copy + Eq + Hash> Drop for HookMark<'_, K> {
    fn drop(&mut self) {
        self.guard
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_twice_fails() {
        let guard = ReentrancyGuard::new();
        let mark = guard.enter(1_usize, HookKind::Get);
        assert!(mark.is_some());
        assert!(guard.enter(1, HookKind::Get).is_none());
        assert!(guard.is_active(1, HookKind::Get));
    }

    #[test]
    fn test_refused_enter_keeps_live_mark() {
        let guard = ReentrancyGuard::new();
        let _mark = guard.enter(1_usize, HookKind::Get).unwrap();
        for _ in 0..3 {
            assert!(guard.enter(1, HookKind::Get).is_none());
            assert!(guard.is_active(1, HookKind::Get));
        }
        assert_eq!(guard.active_count(), 1);
    }

    #[test]
    fn test_marks_are_per_thread() {
        let guard = ReentrancyGuard::new();
        let _mark = guard.enter(1_usize, HookKind::Get).unwrap();
        std::thread::scope(|s| {
            s.spawn(|| {
                assert!(!guard.is_active(1, HookKind::Get));
                let other = guard.enter(1, HookKind::Get);
                assert!(other.is_some());
                assert_eq!(guard.active_count(), 2);
            });
        });
        assert_eq!(guard.active_count(), 1);
    }

    #[test]
    fn test_kinds_and_keys_are_independent() {
        let guard = ReentrancyGuard::new();
        let _get = guard.enter(1_usize, HookKind::Get).unwrap();
        let _set = guard.enter(1, HookKind::Set).unwrap();
        let _other = guard.enter(2, HookKind::Get).unwrap();
        assert_eq!(guard.active_count(), 3);
    }

    #[test]
    fn test_mark_clears_on_drop() {
        let guard = ReentrancyGuard::new();
        {
            let _mark = guard.enter(7_usize, HookKind::Set).unwrap();
            assert_eq!(guard.active_count(), 1);
        }
        assert_eq!(guard.active_count(), 0);
        assert!(guard.enter(7, HookKind::Set).is_some());
    }
}
