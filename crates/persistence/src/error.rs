//! Errors from multi-step workflows that combine row locks with state checks.

use domain::models::TransitionError;
use thiserror::Error;

/// Failure of a transactional workflow. The transaction is rolled back.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Emergency not found")]
    EmergencyNotFound,

    #[error("Assignment not found")]
    AssignmentNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Operator already has an active assignment")]
    AlreadyAssigned,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl WorkflowError {
    /// Short label used as the `outcome` metric tag.
    pub fn reason(&self) -> &'static str {
        match self {
            WorkflowError::EmergencyNotFound
            | WorkflowError::AssignmentNotFound
            | WorkflowError::ProfileNotFound => "not_found",
            WorkflowError::AlreadyAssigned => "already_assigned",
            WorkflowError::Transition(err) if err.is_permission() => "forbidden",
            WorkflowError::Transition(_) => "invalid_state",
            WorkflowError::Database(_) => "database_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_labels() {
        assert_eq!(WorkflowError::EmergencyNotFound.reason(), "not_found");
        assert_eq!(WorkflowError::AlreadyAssigned.reason(), "already_assigned");
        assert_eq!(
            WorkflowError::Database(sqlx::Error::RowNotFound).reason(),
            "database_error"
        );
    }
}
