use thiserror::Error;

/// Error type for lock operations.
///
/// Raised by a [`LockProvider`](super::LockProvider) and carried through the
/// model layer unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The underlying lock primitive was poisoned (e.g. a thread panicked while holding it).
    #[error("lock poisoned: {0}")]
    Poisoned(String),
    /// Failed to acquire the lock.
    #[error("lock acquire failed: {0}")]
    AcquireFailed(String),
    /// The provider gave up waiting for the lock.
    #[error("timed out acquiring lock: {0}")]
    Timeout(String),
    /// Failed to release the lock.
    #[error("lock release failed: {0}")]
    ReleaseFailed(String),
    /// The lock expired (e.g. a distributed lock TTL elapsed).
    #[error("lock expired: {0}")]
    Expired(String),
    /// The handle does not belong to a lock the provider holds.
    #[error("lock not held: {0}")]
    NotHeld(String),
    /// Any other lock error.
    #[error("lock error: {0}")]
    Other(String),
}
