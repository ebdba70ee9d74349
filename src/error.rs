//! Error taxonomy shared by every model, cursor, graph and lock operation.

use thiserror::Error;

use crate::driver::{DriverError, StorageFault};
use crate::lock::LockError;

/// Errors surfaced by every model, cursor and lock operation.
///
/// Storage faults are translated into these kinds exactly once, where the
/// driver is called (see [`crate::translate`]). Lock provider and transport
/// failures are carried through unchanged.
#[derive(Debug, Error)]
pub enum ArangodanticError {
    /// The referenced collection (or index) does not exist.
    #[error("data source not found: {0}")]
    DataSourceNotFound(String),

    /// The named graph does not exist.
    #[error("graph not found: {0}")]
    GraphNotFound(String),

    /// The referenced document or edge does not exist.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// More than one document matched where at most one was expected.
    #[error("multiple models found: {0}")]
    MultipleModelsFound(String),

    /// A unique index rejected the write.
    #[error("unique constraint violated: {message}")]
    UniqueConstraint {
        message: String,
        /// Indexed fields involved in the collision, when storage reports them.
        fields: Vec<String>,
    },

    /// The stored revision differs from the one the caller last read.
    #[error("revision mismatch for {id}: {message}")]
    RevisionMismatch { id: String, message: String },

    /// A record could not be encoded to, or decoded from, a storage document.
    #[error("validation failed at `{path}`: {message}")]
    Validation { path: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("cursor error: {0}")]
    Cursor(String),

    #[error("cursor not found: {0}")]
    CursorNotFound(String),

    /// Failure raised by the configured lock provider.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Connection or timeout failure raised by the storage driver.
    #[error(transparent)]
    Transport(DriverError),

    /// Any storage fault without a dedicated kind.
    #[error("storage fault: {0}")]
    Storage(#[source] StorageFault),
}

impl ArangodanticError {
    /// Build a validation error for a field path.
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        ArangodanticError::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ArangodanticError::ModelNotFound(_)
                | ArangodanticError::DataSourceNotFound(_)
                | ArangodanticError::GraphNotFound(_)
        )
    }

    /// Revision mismatches can be retried after reloading the record.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ArangodanticError::RevisionMismatch { .. })
    }
}

pub type Result<T, E = ArangodanticError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_names_the_path() {
        let err = ArangodanticError::validation("sub.text", "invalid type: integer `5`");
        assert_eq!(
            err.to_string(),
            "validation failed at `sub.text`: invalid type: integer `5`"
        );
    }

    #[test]
    fn only_revision_mismatch_is_retryable() {
        let conflict = ArangodanticError::RevisionMismatch {
            id: "identities/1".into(),
            message: "conflict".into(),
        };
        assert!(conflict.is_retryable());
        assert!(!ArangodanticError::ModelNotFound("x".into()).is_retryable());
        assert!(ArangodanticError::ModelNotFound("x".into()).is_not_found());
        assert!(ArangodanticError::GraphNotFound("g".into()).is_not_found());
        assert!(!ArangodanticError::GraphNotFound("g".into()).is_retryable());
    }

    #[test]
    fn lock_errors_pass_through_unchanged() {
        let err: ArangodanticError = LockError::Timeout("identities_1".into()).into();
        assert_eq!(err.to_string(), LockError::Timeout("identities_1".into()).to_string());
    }
}
