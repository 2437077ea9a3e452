//! crates/feedback_visibility_core/src/error.rs
//!
//! Errors raised by the session checks.

use crate::ports::PortError;
use std::fmt;

/// The kind of access that was attempted on a session that turned out not to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOperation {
    Get,
    Update,
    Check,
    View,
}

impl fmt::Display for LookupOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            LookupOperation::Get => "get",
            LookupOperation::Update => "update",
            LookupOperation::Check => "check",
            LookupOperation::View => "view",
        };
        f.write_str(verb)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChecksError {
    #[error("Trying to {operation} a non-existent feedback session: {course_id}/{session_name}")]
    SessionNotFound {
        operation: LookupOperation,
        course_id: String,
        session_name: String,
    },

    /// A collaborator lookup failed; carried through unmodified.
    #[error(transparent)]
    Port(#[from] PortError),
}

pub type ChecksResult<T> = Result<T, ChecksError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_course_and_session() {
        let err = ChecksError::SessionNotFound {
            operation: LookupOperation::Check,
            course_id: "CS101".to_string(),
            session_name: "Week 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Trying to check a non-existent feedback session: CS101/Week 1"
        );
    }
}
