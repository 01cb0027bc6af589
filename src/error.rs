use thiserror::Error;

pub type Result<T, E = CoachError> = std::result::Result<T, E>;

/// Everything the library can fail with.
///
/// `NotFound` and `Validation` are caller mistakes and are never retried.
/// `Persistence` and `Io` come from the store and are recoverable: the caller
/// may try the same operation again. A document that failed to serialize or a
/// migration that failed will fail the same way on retry.
#[derive(Debug, Error)]
pub enum CoachError {
    #[error("{entity} not found (id: {id})")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("migration failure: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CoachError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for failures worth a retry prompt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Io(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("plan `{0}` has no exercises")]
    EmptyPlan(String),

    #[error("exercise `{0}` has no target sets")]
    NoSets(String),

    #[error("session is still in progress")]
    InProgress,

    #[error("session was abandoned")]
    Abandoned,

    #[error("session log was already saved (id: {0})")]
    AlreadyFinalized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_failures_are_retried() {
        assert!(CoachError::from(std::io::Error::other("disk full")).is_recoverable());
        assert!(CoachError::from(sqlx::Error::PoolTimedOut).is_recoverable());

        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!CoachError::from(bad_json).is_recoverable());
        assert!(!CoachError::validation("reps").is_recoverable());
        assert!(!CoachError::not_found("log", "x").is_recoverable());
        assert!(!CoachError::from(SessionError::InProgress).is_recoverable());
    }
}
