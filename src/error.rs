use thiserror::Error;

/// Failure reported by the auth provider or the data service.
///
/// Carries the service-provided message verbatim; it is what the user sees
/// in the toast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub(crate) struct ServiceError {
    pub(crate) message: String,
}

impl ServiceError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(e: rusqlite::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("invalid stored value: {e}"))
    }
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    /// Locally detected; blocks submission. One entry per violated rule.
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The operation referred to something no longer in the authoritative set.
    #[error("{0}")]
    State(String),

    /// A batched update stopped partway. Rows in `saved` are committed.
    #[error("saved {} change(s) before expense {failed} failed: {source}", .saved.len())]
    PartialSave {
        saved: Vec<i64>,
        failed: i64,
        source: ServiceError,
    },

    /// A rename cascade failed and the compensating rename failed too.
    #[error("rename of '{old}' left inconsistent: {cascade}; rollback failed: {rollback}")]
    RenameInconsistent {
        old: String,
        cascade: ServiceError,
        rollback: ServiceError,
    },
}

impl AppError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    #[cfg(test)]
    pub(crate) fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub(crate) type AppResult<T> = std::result::Result<T, AppError>;
