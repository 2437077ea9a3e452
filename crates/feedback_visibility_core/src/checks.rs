//! crates/feedback_visibility_core/src/checks.rs
//!
//! Session-level checks: whether a session exists, who may view it, and whether a
//! user has completed it. All collaborator access goes through the injected ports.

use std::sync::Arc;
use tracing::debug;

use crate::domain::{FeedbackQuestion, FeedbackSession};
use crate::error::{ChecksError, ChecksResult, LookupOperation};
use crate::ports::{
    FeedbackQuestionProvider, FeedbackSessionStore, QuestionCompletenessChecker,
    QuestionResponseVisibility, StandardResponseVisibility,
};

/// Evaluates session visibility and completion against injected collaborators.
#[derive(Clone)]
pub struct FeedbackSessionChecks {
    sessions: Arc<dyn FeedbackSessionStore>,
    questions: Arc<dyn FeedbackQuestionProvider>,
    completeness: Arc<dyn QuestionCompletenessChecker>,
    response_visibility: Arc<dyn QuestionResponseVisibility>,
}

impl FeedbackSessionChecks {
    pub fn new(
        sessions: Arc<dyn FeedbackSessionStore>,
        questions: Arc<dyn FeedbackQuestionProvider>,
        completeness: Arc<dyn QuestionCompletenessChecker>,
        response_visibility: Arc<dyn QuestionResponseVisibility>,
    ) -> Self {
        Self {
            sessions,
            questions,
            completeness,
            response_visibility,
        }
    }

    /// Wires every port to a single store, using the standard student-visibility rule.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: FeedbackSessionStore + FeedbackQuestionProvider + QuestionCompletenessChecker + 'static,
    {
        Self::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(StandardResponseVisibility),
        )
    }

    //=====================================================================================
    // Existence / Lookup Guard
    //=====================================================================================

    pub async fn is_feedback_session_exists(
        &self,
        session_name: &str,
        course_id: &str,
    ) -> ChecksResult<bool> {
        Ok(self
            .sessions
            .get_feedback_session(session_name, course_id)
            .await?
            .is_some())
    }

    /// Loads the session, failing with `SessionNotFound` tagged with `operation`.
    pub async fn require_session(
        &self,
        session_name: &str,
        course_id: &str,
        operation: LookupOperation,
    ) -> ChecksResult<FeedbackSession> {
        match self.sessions.get_feedback_session(session_name, course_id).await? {
            Some(session) => Ok(session),
            None => {
                debug!(course_id, session_name, %operation, "Feedback session does not exist");
                Err(ChecksError::SessionNotFound {
                    operation,
                    course_id: course_id.to_string(),
                    session_name: session_name.to_string(),
                })
            }
        }
    }

    async fn ensure_exists(&self, session_name: &str, course_id: &str) -> ChecksResult<()> {
        self.require_session(session_name, course_id, LookupOperation::Check)
            .await
            .map(|_| ())
    }

    pub async fn is_creator_of_session(
        &self,
        session_name: &str,
        course_id: &str,
        user_email: &str,
    ) -> ChecksResult<bool> {
        let session = self
            .require_session(session_name, course_id, LookupOperation::Get)
            .await?;
        Ok(session.creator_email == user_email)
    }

    pub async fn is_feedback_session_has_question_for_students(
        &self,
        session_name: &str,
        course_id: &str,
    ) -> ChecksResult<bool> {
        self.ensure_exists(session_name, course_id).await?;
        let questions = self
            .questions
            .questions_for_students(session_name, course_id)
            .await?;
        Ok(!questions.is_empty())
    }

    //=====================================================================================
    // Session Visibility
    //=====================================================================================

    /// Private sessions are visible only to their creator; instructors of the course
    /// see every other session; everyone else falls back to the student rule.
    pub async fn is_session_viewable_to(
        &self,
        session: &FeedbackSession,
        user_email: &str,
        is_instructor_of_course: bool,
    ) -> ChecksResult<bool> {
        if session.is_private() {
            return Ok(session.creator_email == user_email);
        }
        if is_instructor_of_course {
            return Ok(true);
        }
        self.is_session_viewable_to_students(session).await
    }

    pub async fn is_session_viewable_to_students(
        &self,
        session: &FeedbackSession,
    ) -> ChecksResult<bool> {
        if !session.is_visible {
            return Ok(false);
        }
        if self.has_questions_for_students(session).await? {
            return Ok(true);
        }

        let instructor_questions = self
            .questions
            .questions_for_creator_instructor(session)
            .await?;
        Ok(instructor_questions
            .iter()
            .any(|q| self.response_visibility.is_response_visible_to_students(q)))
    }

    pub async fn is_session_for_students_to_answer(
        &self,
        session: &FeedbackSession,
    ) -> ChecksResult<bool> {
        if !session.is_visible {
            return Ok(false);
        }
        self.has_questions_for_students(session).await
    }

    async fn has_questions_for_students(&self, session: &FeedbackSession) -> ChecksResult<bool> {
        let questions = self
            .questions
            .questions_for_students(&session.name, &session.course_id)
            .await?;
        Ok(!questions.is_empty())
    }

    //=====================================================================================
    // Completion
    //=====================================================================================

    pub async fn is_session_completed_by_student(
        &self,
        session: &FeedbackSession,
        user_email: &str,
    ) -> ChecksResult<bool> {
        if session.responding_students.contains(user_email) {
            return Ok(true);
        }
        let questions = self
            .questions
            .questions_for_students(&session.name, &session.course_id)
            .await?;
        Ok(questions.is_empty())
    }

    pub async fn is_session_completed_by_instructor(
        &self,
        session: &FeedbackSession,
        user_email: &str,
    ) -> ChecksResult<bool> {
        if session.responding_instructors.contains(user_email) {
            return Ok(true);
        }
        let questions = self
            .questions
            .questions_for_instructor(&session.name, &session.course_id, user_email)
            .await?;
        Ok(questions.is_empty())
    }

    pub async fn is_session_fully_completed_by_student(
        &self,
        session_name: &str,
        course_id: &str,
        user_email: &str,
    ) -> ChecksResult<bool> {
        self.ensure_exists(session_name, course_id).await?;
        let questions = self
            .questions
            .questions_for_students(session_name, course_id)
            .await?;
        self.are_all_answered(&questions, user_email).await
    }

    pub async fn is_session_fully_completed_by_instructor(
        &self,
        session_name: &str,
        course_id: &str,
        user_email: &str,
    ) -> ChecksResult<bool> {
        self.ensure_exists(session_name, course_id).await?;
        let questions = self
            .questions
            .questions_for_instructor(session_name, course_id, user_email)
            .await?;
        self.are_all_answered(&questions, user_email).await
    }

    async fn are_all_answered(
        &self,
        questions: &[FeedbackQuestion],
        user_email: &str,
    ) -> ChecksResult<bool> {
        for question in questions {
            if !self
                .completeness
                .is_question_fully_answered_by_user(question, user_email)
                .await?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
