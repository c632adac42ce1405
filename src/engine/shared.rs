//! Thread-safe handle for running the engine on a timer thread while
//! another thread reads snapshots.
//!
//! All access goes through one mutex, so a reader never observes a
//! half-committed step.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{RotorEngine, StepOutcome};
use crate::config::InitialConditions;
use crate::error::{SimError, SimResult};
use crate::history::HistorySnapshot;

/// Cloneable, lock-protected engine handle.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<RotorEngine>>,
}

impl SharedEngine {
    /// Wrap an engine.
    #[must_use]
    pub fn new(engine: RotorEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> SimResult<MutexGuard<'_, RotorEngine>> {
        self.inner.lock().map_err(|_| SimError::LockPoisoned)
    }

    /// Advance one macro step.
    ///
    /// # Errors
    ///
    /// Returns `SimError::LockPoisoned` if another holder panicked.
    pub fn step(&self) -> SimResult<StepOutcome> {
        Ok(self.lock()?.step())
    }

    /// Chronological copy of the history window.
    ///
    /// # Errors
    ///
    /// Returns `SimError::LockPoisoned` if another holder panicked.
    pub fn history_snapshot(&self) -> SimResult<HistorySnapshot> {
        Ok(self.lock()?.history_snapshot())
    }

    /// Reinitialise the engine.
    ///
    /// # Errors
    ///
    /// Returns `SimError::LockPoisoned`, or `SimError::InvalidInput` for
    /// non-finite arguments.
    pub fn reset_with(&self, initial: &InitialConditions) -> SimResult<()> {
        self.lock()?.reset_with(initial)
    }

    /// Run `f` with shared access to the engine.
    ///
    /// # Errors
    ///
    /// Returns `SimError::LockPoisoned` if another holder panicked.
    pub fn with<R>(&self, f: impl FnOnce(&RotorEngine) -> R) -> SimResult<R> {
        Ok(f(&*self.lock()?))
    }
}
