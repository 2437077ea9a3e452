//! crates/feedback_visibility_core/src/ports.rs
//!
//! Defines the collaborator contracts (traits) the visibility engine consumes.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! decision logic independent of the store that loads sessions and questions.

use async_trait::async_trait;
use crate::domain::{
    CourseMembership, FeedbackQuestion, FeedbackSession, Instructor, InstructorPrivileges,
    ParticipantType,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external stores.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Lookup Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait FeedbackSessionStore: Send + Sync {
    /// Loads a session by its name within a course, `None` if it does not exist.
    async fn get_feedback_session(
        &self,
        session_name: &str,
        course_id: &str,
    ) -> PortResult<Option<FeedbackSession>>;
}

#[async_trait]
pub trait FeedbackQuestionProvider: Send + Sync {
    /// Questions in the session answered by students.
    async fn questions_for_students(
        &self,
        session_name: &str,
        course_id: &str,
    ) -> PortResult<Vec<FeedbackQuestion>>;

    /// Questions in the session answered by the given instructor.
    async fn questions_for_instructor(
        &self,
        session_name: &str,
        course_id: &str,
        instructor_email: &str,
    ) -> PortResult<Vec<FeedbackQuestion>>;

    /// Questions answered by instructors, as seen by the session's creator.
    async fn questions_for_creator_instructor(
        &self,
        session: &FeedbackSession,
    ) -> PortResult<Vec<FeedbackQuestion>>;
}

#[async_trait]
pub trait QuestionCompletenessChecker: Send + Sync {
    /// Whether the user has given every response the question expects of them.
    async fn is_question_fully_answered_by_user(
        &self,
        question: &FeedbackQuestion,
        user_email: &str,
    ) -> PortResult<bool>;
}

#[async_trait]
pub trait CourseMembershipLookup: Send + Sync {
    /// Whether `email` is enrolled in the course, and in which capacity.
    /// Instructors win when an email appears in both lists.
    async fn course_membership(&self, course_id: &str, email: &str) -> PortResult<CourseMembership>;
}

//=========================================================================================
// Synchronous Capability Checks
//=========================================================================================

pub trait QuestionResponseVisibility: Send + Sync {
    /// Whether any response to the question can be seen by some student.
    fn is_response_visible_to_students(&self, question: &FeedbackQuestion) -> bool;
}

/// Section-scoped permission lookup for an instructor.
pub trait SectionPrivilegeChecker {
    fn is_allowed_for_privilege(&self, section: &str, session_name: &str, privilege: &str) -> bool;
}

impl SectionPrivilegeChecker for InstructorPrivileges {
    fn is_allowed_for_privilege(&self, section: &str, session_name: &str, privilege: &str) -> bool {
        InstructorPrivileges::is_allowed_for_privilege(self, section, session_name, privilege)
    }
}

impl SectionPrivilegeChecker for Instructor {
    fn is_allowed_for_privilege(&self, section: &str, session_name: &str, privilege: &str) -> bool {
        self.privileges.is_allowed_for_privilege(section, session_name, privilege)
    }
}

/// The standard rule for whether students can see responses to a question.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardResponseVisibility;

impl QuestionResponseVisibility for StandardResponseVisibility {
    fn is_response_visible_to_students(&self, question: &FeedbackQuestion) -> bool {
        if question.is_response_visible_to(ParticipantType::Students) {
            return true;
        }

        let is_student_recipient = matches!(
            question.recipient_type,
            ParticipantType::Students
                | ParticipantType::Teams
                | ParticipantType::OwnTeam
                | ParticipantType::OwnTeamMembers
                | ParticipantType::OwnTeamMembersIncludingSelf
        ) || (question.recipient_type == ParticipantType::Myself
            && question.giver_type == ParticipantType::Students);

        if is_student_recipient && question.is_response_visible_to(ParticipantType::Receiver) {
            return true;
        }

        question.giver_type == ParticipantType::Teams
            || question.is_response_visible_to(ParticipantType::OwnTeamMembers)
            || question.is_response_visible_to(ParticipantType::ReceiverTeamMembers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeedbackSession;

    fn question(giver: ParticipantType, recipient: ParticipantType) -> FeedbackQuestion {
        let session = FeedbackSession::new("Week 1", "CS101", "lead@uni.edu");
        FeedbackQuestion::new(&session, 1, giver, recipient)
    }

    #[test]
    fn instructor_question_shown_only_to_instructors_is_hidden_from_students() {
        let q = question(ParticipantType::Instructors, ParticipantType::Students)
            .visible_to([ParticipantType::Instructors]);
        assert!(!StandardResponseVisibility.is_response_visible_to_students(&q));
    }

    #[test]
    fn student_recipient_with_receiver_visibility_is_visible() {
        let q = question(ParticipantType::Instructors, ParticipantType::Students)
            .visible_to([ParticipantType::Receiver]);
        assert!(StandardResponseVisibility.is_response_visible_to_students(&q));
    }

    #[test]
    fn instructor_recipient_with_receiver_visibility_is_hidden() {
        let q = question(ParticipantType::Instructors, ParticipantType::Instructors)
            .visible_to([ParticipantType::Receiver]);
        assert!(!StandardResponseVisibility.is_response_visible_to_students(&q));
    }

    #[test]
    fn self_feedback_from_students_counts_as_student_recipient() {
        let q = question(ParticipantType::Students, ParticipantType::Myself)
            .visible_to([ParticipantType::Receiver]);
        assert!(StandardResponseVisibility.is_response_visible_to_students(&q));
    }

    #[test]
    fn team_scoped_visibility_is_visible() {
        let q = question(ParticipantType::Instructors, ParticipantType::None)
            .visible_to([ParticipantType::ReceiverTeamMembers]);
        assert!(StandardResponseVisibility.is_response_visible_to_students(&q));
    }
}
