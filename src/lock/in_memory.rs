use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use super::{LockError, LockHandle, LockProvider};

/// In-memory lock provider backed by one `Semaphore` per lock name.
///
/// Locks are created lazily per unique name and live for the life of the
/// provider. Held permits are kept by token until released. An optional
/// timeout bounds how long `acquire` waits.
pub struct InMemoryLockProvider {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
    held: Mutex<HashMap<String, OwnedSemaphorePermit>>,
    next_token: AtomicU64,
    timeout: Option<Duration>,
}

impl InMemoryLockProvider {
    pub fn new() -> Self {
        InMemoryLockProvider {
            locks: Mutex::new(HashMap::new()),
            held: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
            timeout: None,
        }
    }

    /// Fail `acquire` with [`LockError::Timeout`] after waiting `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether the named lock is currently held.
    pub fn is_locked(&self, name: &str) -> bool {
        self.locks
            .lock()
            .map(|locks| {
                locks
                    .get(name)
                    .is_some_and(|lock| lock.available_permits() == 0)
            })
            .unwrap_or(false)
    }

    fn get_lock(&self, name: &str) -> Result<Arc<Semaphore>, LockError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| LockError::Poisoned("lock provider map poisoned".into()))?;
        Ok(locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone())
    }

    fn hold(&self, name: &str, permit: OwnedSemaphorePermit) -> Result<LockHandle, LockError> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed).to_string();
        self.held
            .lock()
            .map_err(|_| LockError::Poisoned("held lock map poisoned".into()))?
            .insert(token.clone(), permit);
        Ok(LockHandle::new(name, token))
    }
}

impl Default for InMemoryLockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockProvider for InMemoryLockProvider {
    async fn acquire(&self, name: &str) -> Result<LockHandle, LockError> {
        let lock = self.get_lock(name)?;
        let permit = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, lock.acquire_owned())
                .await
                .map_err(|_| LockError::Timeout(name.to_string()))?,
            None => lock.acquire_owned().await,
        }
        .map_err(|e| LockError::AcquireFailed(e.to_string()))?;
        self.hold(name, permit)
    }

    async fn try_acquire(&self, name: &str) -> Result<Option<LockHandle>, LockError> {
        let lock = self.get_lock(name)?;
        match lock.try_acquire_owned() {
            Ok(permit) => self.hold(name, permit).map(Some),
            Err(TryAcquireError::NoPermits) => Ok(None),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    async fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        let permit = self
            .held
            .lock()
            .map_err(|_| LockError::Poisoned("held lock map poisoned".into()))?
            .remove(handle.token());
        match permit {
            Some(permit) => {
                drop(permit);
                Ok(())
            }
            None => Err(LockError::NotHeld(handle.name().to_string())),
        }
    }
}
