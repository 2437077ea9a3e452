//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! lookup ports from the `core` crate. It handles all interactions with the
//! PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use feedback_visibility_core::domain::{
    CourseMembership, FeedbackQuestion, FeedbackSession, ParseDomainError, ParticipantType, Student,
};
use feedback_visibility_core::ports::{
    CourseMembershipLookup, FeedbackQuestionProvider, FeedbackSessionStore, PortError, PortResult,
    QuestionCompletenessChecker,
};
use feedback_visibility_core::CourseRoster;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeSet;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the lookup ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn roster(&self, course_id: &str) -> PortResult<CourseRoster> {
        let students = sqlx::query_as::<_, StudentRecord>(
            "SELECT course_id, email, name, team, section FROM students WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let instructor_emails = sqlx::query_scalar::<_, String>(
            "SELECT email FROM instructors WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(CourseRoster {
            students: students.into_iter().map(StudentRecord::to_domain).collect(),
            instructor_emails,
        })
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn corrupt(e: ParseDomainError) -> PortError {
    PortError::Unexpected(format!("Corrupt stored value: {}", e))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionRecord {
    course_id: String,
    session_name: String,
    session_type: String,
    creator_email: String,
    is_visible: bool,
    responding_students: Vec<String>,
    responding_instructors: Vec<String>,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<FeedbackSession> {
        Ok(FeedbackSession {
            name: self.session_name,
            course_id: self.course_id,
            session_type: self.session_type.parse().map_err(corrupt)?,
            creator_email: self.creator_email,
            is_visible: self.is_visible,
            responding_students: self.responding_students.into_iter().collect(),
            responding_instructors: self.responding_instructors.into_iter().collect(),
        })
    }
}

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    course_id: String,
    session_name: String,
    question_number: i32,
    giver_type: String,
    recipient_type: String,
    show_responses_to: Vec<String>,
    number_of_entities_to_give_feedback_to: Option<i32>,
}
impl QuestionRecord {
    fn to_domain(self) -> PortResult<FeedbackQuestion> {
        let show_responses_to: BTreeSet<ParticipantType> = self
            .show_responses_to
            .iter()
            .map(|p| p.parse::<ParticipantType>())
            .collect::<Result<_, _>>()
            .map_err(corrupt)?;
        Ok(FeedbackQuestion {
            id: self.id,
            session_name: self.session_name,
            course_id: self.course_id,
            question_number: self.question_number.max(0) as u32,
            giver_type: self.giver_type.parse().map_err(corrupt)?,
            recipient_type: self.recipient_type.parse().map_err(corrupt)?,
            show_responses_to,
            number_of_entities_to_give_feedback_to: self
                .number_of_entities_to_give_feedback_to
                .map(|n| n.max(0) as u32),
        })
    }
}

#[derive(FromRow)]
struct StudentRecord {
    course_id: String,
    email: String,
    name: String,
    team: String,
    section: String,
}
impl StudentRecord {
    fn to_domain(self) -> Student {
        Student {
            email: self.email,
            course_id: self.course_id,
            name: self.name,
            team: self.team,
            section: self.section,
        }
    }
}

const QUESTION_COLUMNS: &str = "q.id, q.course_id, q.session_name, q.question_number, q.giver_type, \
     q.recipient_type, q.show_responses_to, q.number_of_entities_to_give_feedback_to";

//=========================================================================================
// Port Trait Implementations
//=========================================================================================

#[async_trait]
impl FeedbackSessionStore for DbAdapter {
    async fn get_feedback_session(
        &self,
        session_name: &str,
        course_id: &str,
    ) -> PortResult<Option<FeedbackSession>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT course_id, session_name, session_type, creator_email, is_visible, \
             responding_students, responding_instructors \
             FROM feedback_sessions WHERE course_id = $1 AND session_name = $2",
        )
        .bind(course_id)
        .bind(session_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record.map(SessionRecord::to_domain).transpose()
    }
}

#[async_trait]
impl FeedbackQuestionProvider for DbAdapter {
    async fn questions_for_students(
        &self,
        session_name: &str,
        course_id: &str,
    ) -> PortResult<Vec<FeedbackQuestion>> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM feedback_questions q \
             WHERE q.course_id = $1 AND q.session_name = $2 \
             AND q.giver_type IN ('STUDENTS', 'TEAMS') \
             ORDER BY q.question_number"
        );
        let records = sqlx::query_as::<_, QuestionRecord>(&sql)
            .bind(course_id)
            .bind(session_name)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(QuestionRecord::to_domain).collect()
    }

    async fn questions_for_instructor(
        &self,
        session_name: &str,
        course_id: &str,
        instructor_email: &str,
    ) -> PortResult<Vec<FeedbackQuestion>> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM feedback_questions q \
             JOIN feedback_sessions s \
               ON s.course_id = q.course_id AND s.session_name = q.session_name \
             WHERE q.course_id = $1 AND q.session_name = $2 \
             AND (q.giver_type = 'INSTRUCTORS' \
                  OR (q.giver_type = 'SELF' AND s.creator_email = $3)) \
             ORDER BY q.question_number"
        );
        let records = sqlx::query_as::<_, QuestionRecord>(&sql)
            .bind(course_id)
            .bind(session_name)
            .bind(instructor_email)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(QuestionRecord::to_domain).collect()
    }

    async fn questions_for_creator_instructor(
        &self,
        session: &FeedbackSession,
    ) -> PortResult<Vec<FeedbackQuestion>> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM feedback_questions q \
             WHERE q.course_id = $1 AND q.session_name = $2 \
             AND q.giver_type IN ('INSTRUCTORS', 'SELF') \
             ORDER BY q.question_number"
        );
        let records = sqlx::query_as::<_, QuestionRecord>(&sql)
            .bind(&session.course_id)
            .bind(&session.name)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(QuestionRecord::to_domain).collect()
    }
}

#[async_trait]
impl QuestionCompletenessChecker for DbAdapter {
    async fn is_question_fully_answered_by_user(
        &self,
        question: &FeedbackQuestion,
        user_email: &str,
    ) -> PortResult<bool> {
        let roster = self.roster(&question.course_id).await?;

        // Team questions are answered on behalf of the team.
        let giver = match (question.giver_type, roster.student(user_email)) {
            (ParticipantType::Teams, Some(student)) => student.team.clone(),
            _ => user_email.to_string(),
        };

        let answered = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT recipient) FROM feedback_responses \
             WHERE question_id = $1 AND giver = $2",
        )
        .bind(question.id)
        .bind(&giver)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let expected = roster.expected_recipient_count(question, user_email);
        Ok(answered.max(0) as usize >= expected)
    }
}

#[async_trait]
impl CourseMembershipLookup for DbAdapter {
    async fn course_membership(&self, course_id: &str, email: &str) -> PortResult<CourseMembership> {
        let (is_instructor, is_student) = sqlx::query_as::<_, (bool, bool)>(
            "SELECT \
                EXISTS (SELECT 1 FROM instructors WHERE course_id = $1 AND email = $2), \
                EXISTS (SELECT 1 FROM students WHERE course_id = $1 AND email = $2)",
        )
        .bind(course_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(if is_instructor {
            CourseMembership::Instructor
        } else if is_student {
            CourseMembership::Student
        } else {
            CourseMembership::NotMember
        })
    }
}
