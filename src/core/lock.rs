//! Reentrant lock serializing multi-line writes.
//!
//! A recorded function holds the lock for its whole invocation, and the
//! function body may itself log or call other recorded functions on the same
//! thread. The owning thread may therefore re-acquire the lock; other threads
//! wait until the outermost guard is dropped.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
}

#[derive(Debug, Default)]
pub struct WriteLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl WriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the calling thread owns the lock.
    pub fn acquire(&self) -> WriteGuard<'_> {
        let current = thread::current().id();
        let mut state = self.state();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(current);
                    state.depth = 1;
                    break;
                }
                Some(owner) if owner == current => {
                    state.depth += 1;
                    break;
                }
                Some(_) => {
                    state = self
                        .released
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        WriteGuard { lock: self }
    }

    /// Returns `true` when the calling thread currently holds the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state().owner == Some(thread::current().id())
    }

    fn release(&self) {
        let mut state = self.state();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_one();
        }
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases one level of ownership when dropped, including during unwinding.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a WriteLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
