use anyhow::Context as _;
use thiserror::Error;

/// Failures raised by the club core. Every variant leaves the target entity unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClubError {
    /// Malformed input, duplicate unique key or reference to a missing participant
    #[error("validation failed: {0}")]
    Validation(String),

    /// Command not allowed in the entity's current lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Attempt to delete or deactivate a core rule
    #[error("protected resource: {0}")]
    ProtectedResource(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

pub type ClubResult<T> = Result<T, ClubError>;

impl ClubError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClubError::Validation(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ClubError::InvalidState(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ClubError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Collapse a list of validation messages; `Ok` when the list is empty.
    pub fn from_violations(violations: Vec<String>) -> ClubResult<()> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ClubError::Validation(violations.join(", ")))
        }
    }
}

/// Add context to storage errors
pub fn storage_context(operation: &str, key: &str) -> String {
    format!("Failed to {} collection: {}", operation, key)
}

/// Add context to record conversion errors
pub fn record_context(entity: &str) -> String {
    format!("Failed to convert {} record", entity)
}

/// Wrap result with storage context
pub fn with_storage_context<T, E>(result: Result<T, E>, operation: &str, key: &str) -> anyhow::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    result.context(storage_context(operation, key))
}
