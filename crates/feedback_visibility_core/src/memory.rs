//! crates/feedback_visibility_core/src/memory.rs
//!
//! An in-memory store implementing every lookup port.
//!
//! Used by the test suites and by the API service when no database is configured.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    CourseMembership, FeedbackQuestion, FeedbackResponse, FeedbackSession, ParticipantType, Student,
};
use crate::ports::{
    CourseMembershipLookup, FeedbackQuestionProvider, FeedbackSessionStore, PortResult,
    QuestionCompletenessChecker,
};
use crate::roster::CourseRoster;

#[derive(Default)]
struct State {
    /// (course id, session name) -> session
    sessions: HashMap<(String, String), FeedbackSession>,
    questions: Vec<FeedbackQuestion>,
    responses: Vec<FeedbackResponse>,
    rosters: HashMap<String, CourseRoster>,
}

impl State {
    fn session(&self, session_name: &str, course_id: &str) -> Option<&FeedbackSession> {
        self.sessions
            .get(&(course_id.to_string(), session_name.to_string()))
    }

    fn questions_where(
        &self,
        session_name: &str,
        course_id: &str,
        keep: impl Fn(&FeedbackQuestion) -> bool,
    ) -> Vec<FeedbackQuestion> {
        let mut questions: Vec<FeedbackQuestion> = self
            .questions
            .iter()
            .filter(|q| q.session_name == session_name && q.course_id == course_id)
            .filter(|q| keep(q))
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.question_number);
        questions
    }
}

/// Thread-safe in-memory backing store.
#[derive(Default)]
pub struct InMemoryFeedbackStore {
    state: RwLock<State>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_session(&self, session: FeedbackSession) {
        let key = (session.course_id.clone(), session.name.clone());
        self.state.write().await.sessions.insert(key, session);
    }

    pub async fn insert_question(&self, question: FeedbackQuestion) {
        self.state.write().await.questions.push(question);
    }

    pub async fn insert_response(&self, response: FeedbackResponse) {
        self.state.write().await.responses.push(response);
    }

    pub async fn insert_student(&self, student: Student) {
        let mut state = self.state.write().await;
        state
            .rosters
            .entry(student.course_id.clone())
            .or_default()
            .students
            .push(student);
    }

    pub async fn insert_instructor(&self, course_id: &str, email: &str) {
        let mut state = self.state.write().await;
        state
            .rosters
            .entry(course_id.to_string())
            .or_default()
            .instructor_emails
            .push(email.to_string());
    }

    /// Records that a user has submitted something in the session.
    pub async fn mark_responded(&self, session_name: &str, course_id: &str, email: &str, as_instructor: bool) {
        let mut state = self.state.write().await;
        if let Some(session) = state
            .sessions
            .get_mut(&(course_id.to_string(), session_name.to_string()))
        {
            if as_instructor {
                session.responding_instructors.insert(email.to_string());
            } else {
                session.responding_students.insert(email.to_string());
            }
        }
    }
}

#[async_trait]
impl FeedbackSessionStore for InMemoryFeedbackStore {
    async fn get_feedback_session(
        &self,
        session_name: &str,
        course_id: &str,
    ) -> PortResult<Option<FeedbackSession>> {
        Ok(self.state.read().await.session(session_name, course_id).cloned())
    }
}

#[async_trait]
impl FeedbackQuestionProvider for InMemoryFeedbackStore {
    async fn questions_for_students(
        &self,
        session_name: &str,
        course_id: &str,
    ) -> PortResult<Vec<FeedbackQuestion>> {
        let state = self.state.read().await;
        Ok(state.questions_where(session_name, course_id, |q| {
            matches!(q.giver_type, ParticipantType::Students | ParticipantType::Teams)
        }))
    }

    async fn questions_for_instructor(
        &self,
        session_name: &str,
        course_id: &str,
        instructor_email: &str,
    ) -> PortResult<Vec<FeedbackQuestion>> {
        let state = self.state.read().await;
        let is_creator = state
            .session(session_name, course_id)
            .is_some_and(|s| s.creator_email == instructor_email);
        Ok(state.questions_where(session_name, course_id, |q| {
            q.giver_type == ParticipantType::Instructors
                || (is_creator && q.giver_type == ParticipantType::Myself)
        }))
    }

    async fn questions_for_creator_instructor(
        &self,
        session: &FeedbackSession,
    ) -> PortResult<Vec<FeedbackQuestion>> {
        let state = self.state.read().await;
        Ok(state.questions_where(&session.name, &session.course_id, |q| {
            matches!(q.giver_type, ParticipantType::Instructors | ParticipantType::Myself)
        }))
    }
}

#[async_trait]
impl QuestionCompletenessChecker for InMemoryFeedbackStore {
    async fn is_question_fully_answered_by_user(
        &self,
        question: &FeedbackQuestion,
        user_email: &str,
    ) -> PortResult<bool> {
        let state = self.state.read().await;
        let roster = state.rosters.get(&question.course_id).cloned().unwrap_or_default();

        // Team questions are answered on behalf of the team.
        let giver = match (question.giver_type, roster.student(user_email)) {
            (ParticipantType::Teams, Some(student)) => student.team.clone(),
            _ => user_email.to_string(),
        };

        let answered: HashSet<&str> = state
            .responses
            .iter()
            .filter(|r| r.question_id == question.id && r.giver == giver)
            .map(|r| r.recipient.as_str())
            .collect();

        Ok(answered.len() >= roster.expected_recipient_count(question, user_email))
    }
}

#[async_trait]
impl CourseMembershipLookup for InMemoryFeedbackStore {
    async fn course_membership(&self, course_id: &str, email: &str) -> PortResult<CourseMembership> {
        let state = self.state.read().await;
        Ok(state
            .rosters
            .get(course_id)
            .map(|roster| roster.membership(email))
            .unwrap_or(CourseMembership::NotMember))
    }
}
