use crate::models::{IssueId, Status};

pub type Result<T> = std::result::Result<T, CivicError>;

/// Every failure the core can report. Nothing is retried or coerced here;
/// callers decide what to surface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CivicError {
    #[error("issue #{0} not found")]
    NotFound(IssueId),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid category '{0}'")]
    InvalidCategory(String),

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("invalid image reference '{0}'")]
    InvalidImageReference(String),

    /// `from` is `None` when the issue does not exist.
    #[error("{}", describe_transition(.id, .from, .to))]
    IllegalTransition {
        id: IssueId,
        from: Option<Status>,
        to: Status,
    },

    /// Transient; the caller may retry with backoff.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl CivicError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CivicError::MissingField(_)
                | CivicError::InvalidCategory(_)
                | CivicError::InvalidLocation(_)
                | CivicError::InvalidImageReference(_)
        )
    }
}

fn describe_transition(id: &IssueId, from: &Option<Status>, to: &Status) -> String {
    match from {
        Some(from) => format!(
            "illegal transition for issue #{}: {} -> {}",
            id,
            from.label(),
            to.label()
        ),
        None => format!(
            "illegal transition for issue #{}: no such issue (requested {})",
            id,
            to.label()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_transition_message_names_both_states() {
        let err = CivicError::IllegalTransition {
            id: IssueId(4),
            from: Some(Status::Pending),
            to: Status::Resolved,
        };
        assert_eq!(
            err.to_string(),
            "illegal transition for issue #4: Pending -> Resolved"
        );
    }

    #[test]
    fn test_illegal_transition_on_unknown_issue() {
        let err = CivicError::IllegalTransition {
            id: IssueId(9),
            from: None,
            to: Status::InProgress,
        };
        assert!(err.to_string().contains("no such issue"));
    }

    #[test]
    fn test_validation_classification() {
        assert!(CivicError::MissingField("title").is_validation());
        assert!(CivicError::InvalidCategory("Roads".into()).is_validation());
        assert!(!CivicError::NotFound(IssueId(1)).is_validation());
        assert!(!CivicError::StorageUnavailable("locked".into()).is_validation());
    }
}
