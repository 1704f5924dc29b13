use quantrack_store::StorageError;
use thiserror::Error;

/// Result type for lifecycle and aggregation operations.
pub type QuantrackResult<T> = Result<T, QuantrackError>;

/// Domain errors surfaced by the managers.
///
/// None of these are fatal; every variant maps to a client-visible response.
#[derive(Debug, Error)]
pub enum QuantrackError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[source] StorageError),
}

impl QuantrackError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{kind} {id} not found"))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Store-level uniqueness and guarded-transition failures become domain conflicts.
impl From<StorageError> for QuantrackError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => Self::NotFound(msg),
            StorageError::Conflict(msg) | StorageError::InvariantViolation(msg) => {
                Self::Conflict(msg)
            }
            StorageError::InvalidInput(msg) => Self::Validation(msg),
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_onto_domain_variants() {
        assert!(matches!(
            QuantrackError::from(StorageError::Conflict("dup".into())),
            QuantrackError::Conflict(_)
        ));
        assert!(matches!(
            QuantrackError::from(StorageError::InvariantViolation("stale".into())),
            QuantrackError::Conflict(_)
        ));
        assert!(matches!(
            QuantrackError::from(StorageError::NotFound("gone".into())),
            QuantrackError::NotFound(_)
        ));
        assert!(matches!(
            QuantrackError::from(StorageError::InvalidInput("neg".into())),
            QuantrackError::Validation(_)
        ));
        assert!(matches!(
            QuantrackError::from(StorageError::Backend("down".into())),
            QuantrackError::Storage(_)
        ));
    }
}
