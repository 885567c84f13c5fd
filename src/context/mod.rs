//! Store context - the shared view over a backing store.
//!
//! A `StoreContext` owns the change buffer: inserts and updates are staged in
//! memory and reach the backing store only through [`StoreContext::save`].
//! Batch deletes are the exception and write through immediately.
//!
//! The buffer mutex is only held while the buffer itself is read or changed,
//! never across a backing store call, so a slow store stalls only the
//! operations that are waiting on it. Writes that reach the store (save and
//! delete) are serialized by a separate writer lock.

mod buffer;
mod fetch;
mod mutate;
mod save;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::CabinetConfig;
use crate::error::{CabinetError, Result};
use crate::registry::Registry;

use buffer::ChangeBuffer;

/// Lifecycle of a store context as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// The backing store has not been opened yet.
    Uninitialized,
    /// Open, nothing staged.
    Ready,
    /// Open, with staged changes awaiting `save`.
    ReadyWithChanges,
    /// Opening the backing store failed, or an operation panicked while
    /// holding the change buffer. Terminal.
    Failed,
}

pub struct StoreContext<B> {
    store: B,
    registry: Arc<Registry>,
    config: CabinetConfig,
    buffer: Mutex<ChangeBuffer>,
    writer: Mutex<()>,
}

impl<B> StoreContext<B> {
    pub fn new(store: B, registry: Arc<Registry>, config: CabinetConfig) -> Self {
        Self {
            store,
            registry,
            config,
            buffer: Mutex::new(ChangeBuffer::default()),
            writer: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &CabinetConfig {
        &self.config
    }

    /// Whether anything is staged since the last save.
    pub fn has_changes(&self) -> Result<bool> {
        Ok(!self.lock_buffer("has_changes")?.is_empty())
    }

    /// Number of staged record changes.
    pub fn pending_changes(&self) -> Result<usize> {
        Ok(self.lock_buffer("pending_changes")?.len())
    }

    /// Drop every staged change without touching the backing store.
    pub fn discard_changes(&self) -> Result<()> {
        self.lock_buffer("discard_changes")?.clear();
        Ok(())
    }

    /// A poisoned change buffer reports [`ContextState::Failed`]; every
    /// operation on it fails with `LockPoisoned`.
    pub fn state(&self) -> ContextState {
        match self.has_changes() {
            Ok(true) => ContextState::ReadyWithChanges,
            Ok(false) => ContextState::Ready,
            Err(_) => ContextState::Failed,
        }
    }

    fn lock_buffer(&self, operation: &'static str) -> Result<MutexGuard<'_, ChangeBuffer>> {
        self.buffer
            .lock()
            .map_err(|_| CabinetError::LockPoisoned(operation))
    }

    /// Serializes operations that write to the backing store. Taken before the
    /// buffer lock, never while holding it.
    fn lock_writer(&self, operation: &'static str) -> Result<MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| CabinetError::LockPoisoned(operation))
    }
}
