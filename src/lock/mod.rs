//! Named locks and the lock-and-load coordinator.
//!
//! A [`LockProvider`] grants mutually exclusive locks by name. The model layer
//! names a record's lock `{lock_name_prefix}{collection}_{key}` and wraps a
//! load-mutate-save cycle in it (see [`Locked`]).

mod coordinator;
mod error;
mod in_memory;
mod provider;

pub use coordinator::{LockGuard, LockState, Locked};
pub use error::LockError;
pub use in_memory::InMemoryLockProvider;
pub use provider::{LockHandle, LockProvider};
