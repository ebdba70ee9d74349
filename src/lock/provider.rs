use async_trait::async_trait;

use super::LockError;

/// Proof of a held lock, returned by [`LockProvider::acquire`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockHandle {
    name: String,
    token: String,
}

impl LockHandle {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        LockHandle {
            name: name.into(),
            token: token.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provider-specific token identifying this acquisition.
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Capability granting named, mutually exclusive locks.
///
/// The in-memory provider serializes tasks of one process; distributed
/// implementations might use Redis, Postgres advisory locks, etcd leases, etc.
/// Timeouts and contention failures are the provider's to decide.
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Acquire the lock, waiting until it becomes available.
    async fn acquire(&self, name: &str) -> Result<LockHandle, LockError>;

    /// Try to acquire the lock without waiting.
    /// Returns `Ok(None)` if it is already held.
    async fn try_acquire(&self, name: &str) -> Result<Option<LockHandle>, LockError>;

    /// Release a lock previously acquired from this provider.
    async fn release(&self, handle: LockHandle) -> Result<(), LockError>;
}
