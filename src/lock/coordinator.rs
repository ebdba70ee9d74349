use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::{LockError, LockHandle, LockProvider};
use crate::error::Result;
use crate::model::Collection;
use crate::record::Record;

/// Lifecycle of a coordinated lock: `Unlocked -> Acquiring -> Held -> Releasing -> Unlocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Acquiring,
    Held,
    Releasing,
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockState::Unlocked => "unlocked",
            LockState::Acquiring => "acquiring",
            LockState::Held => "held",
            LockState::Releasing => "releasing",
        };
        f.write_str(name)
    }
}

/// A held lock that is released on every exit path.
///
/// `release().await` reports the provider's answer. Dropping a held guard
/// (early return, panic unwinding, or a cancelled future) hands the release
/// to the current tokio runtime.
pub struct LockGuard {
    provider: Arc<dyn LockProvider>,
    name: String,
    handle: Option<LockHandle>,
    state: LockState,
}

impl LockGuard {
    pub(crate) async fn acquire(provider: Arc<dyn LockProvider>, name: String) -> Result<Self, LockError> {
        tracing::debug!(lock = %name, state = %LockState::Acquiring, "acquiring lock");
        let handle = provider.acquire(&name).await?;
        tracing::debug!(lock = %name, state = %LockState::Held, "lock acquired");
        Ok(LockGuard {
            provider,
            name,
            handle: Some(handle),
            state: LockState::Held,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// Release through the provider. The handle stays with the guard until the
    /// provider answers, so a cancelled release still releases on drop.
    pub async fn release(mut self) -> Result<(), LockError> {
        let Some(handle) = self.handle.clone() else {
            return Ok(());
        };
        self.state = LockState::Releasing;
        let result = self.provider.release(handle).await;
        self.handle = None;
        self.state = LockState::Unlocked;
        tracing::debug!(lock = %self.name, state = %self.state, ok = result.is_ok(), "lock released");
        result
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let provider = self.provider.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let name = handle.name().to_string();
                    if let Err(err) = provider.release(handle).await {
                        tracing::warn!(lock = %name, error = %err, "failed to release dropped lock");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(lock = %self.name, "lock dropped outside a tokio runtime; not released");
            }
        }
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish()
    }
}

/// A record loaded under its lock.
///
/// [`commit`](Locked::commit) saves the record and then releases the lock;
/// [`abort`](Locked::abort), or dropping the value, releases without saving.
pub struct Locked<'a, R: Record> {
    collection: Collection<'a, R>,
    record: R,
    guard: LockGuard,
}

impl<'a, R: Record> Locked<'a, R> {
    pub(crate) fn new(collection: Collection<'a, R>, record: R, guard: LockGuard) -> Self {
        Locked {
            collection,
            record,
            guard,
        }
    }

    pub fn lock_name(&self) -> &str {
        self.guard.name()
    }

    pub fn lock_state(&self) -> LockState {
        self.guard.state()
    }

    /// Save the record, then release the lock. The lock is released even
    /// when the save fails.
    pub async fn commit(self) -> Result<R> {
        let Locked {
            collection,
            mut record,
            guard,
        } = self;
        let saved = collection.save(&mut record).await;
        let released = guard.release().await;
        saved?;
        released?;
        Ok(record)
    }

    /// Release the lock without saving.
    pub async fn abort(self) -> Result<R> {
        let Locked { record, guard, .. } = self;
        guard.release().await?;
        Ok(record)
    }

    pub fn into_inner(self) -> (R, LockGuard) {
        (self.record, self.guard)
    }
}

impl<R: Record> Deref for Locked<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.record
    }
}

impl<R: Record> DerefMut for Locked<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.record
    }
}

impl<R: Record + fmt::Debug> fmt::Debug for Locked<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locked")
            .field("record", &self.record)
            .field("lock", &self.guard)
            .finish()
    }
}
