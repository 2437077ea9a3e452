//! crates/feedback_visibility_core/src/domain.rs
//!
//! Defines the pure, core data structures for the visibility engine.
//! These structs are loaded by external collaborators and treated as read-only
//! views for the duration of one evaluation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Privilege an instructor needs to see responses in a given section.
pub const PRIVILEGE_VIEW_SESSION_IN_SECTIONS: &str = "canviewsessioninsection";
pub const PRIVILEGE_SUBMIT_SESSION_IN_SECTIONS: &str = "cansubmitsessioninsection";
pub const PRIVILEGE_MODIFY_SESSION_COMMENT_IN_SECTIONS: &str = "canmodifysessioncommentinsection";
pub const PRIVILEGE_MODIFY_SESSION: &str = "canmodifysession";
pub const PRIVILEGE_VIEW_STUDENT_IN_SECTIONS: &str = "canviewstudentinsection";

//=========================================================================================
// Enumerations
//=========================================================================================

/// Who can give, receive or see a feedback response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantType {
    #[serde(rename = "SELF")]
    Myself,
    Students,
    Instructors,
    Teams,
    OwnTeam,
    OwnTeamMembers,
    OwnTeamMembersIncludingSelf,
    Receiver,
    ReceiverTeamMembers,
    None,
}

impl ParticipantType {
    pub const ALL: [ParticipantType; 10] = [
        ParticipantType::Myself,
        ParticipantType::Students,
        ParticipantType::Instructors,
        ParticipantType::Teams,
        ParticipantType::OwnTeam,
        ParticipantType::OwnTeamMembers,
        ParticipantType::OwnTeamMembersIncludingSelf,
        ParticipantType::Receiver,
        ParticipantType::ReceiverTeamMembers,
        ParticipantType::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantType::Myself => "SELF",
            ParticipantType::Students => "STUDENTS",
            ParticipantType::Instructors => "INSTRUCTORS",
            ParticipantType::Teams => "TEAMS",
            ParticipantType::OwnTeam => "OWN_TEAM",
            ParticipantType::OwnTeamMembers => "OWN_TEAM_MEMBERS",
            ParticipantType::OwnTeamMembersIncludingSelf => "OWN_TEAM_MEMBERS_INCLUDING_SELF",
            ParticipantType::Receiver => "RECEIVER",
            ParticipantType::ReceiverTeamMembers => "RECEIVER_TEAM_MEMBERS",
            ParticipantType::None => "NONE",
        }
    }
}

impl fmt::Display for ParticipantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored participant type, session type or role is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: '{value}'")]
pub struct ParseDomainError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for ParticipantType {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParticipantType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParseDomainError {
                kind: "participant type",
                value: s.to_string(),
            })
    }
}

/// Whether a session is open to the whole course or private to its creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    #[serde(alias = "PUBLIC")]
    Standard,
    Private,
}

impl FromStr for SessionType {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STANDARD" | "PUBLIC" => Ok(SessionType::Standard),
            "PRIVATE" => Ok(SessionType::Private),
            other => Err(ParseDomainError {
                kind: "session type",
                value: other.to_string(),
            }),
        }
    }
}

/// The role a viewer is acting in for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Instructor,
    Admin,
}

impl FromStr for UserRole {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            "instructor" => Ok(UserRole::Instructor),
            "admin" => Ok(UserRole::Admin),
            _ => Err(ParseDomainError {
                kind: "user role",
                value: s.to_string(),
            }),
        }
    }
}

/// How a user is enrolled in a course, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseMembership {
    Instructor,
    Student,
    NotMember,
}

//=========================================================================================
// Entities
//=========================================================================================

/// A feedback session, identified by its name within a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSession {
    pub name: String,
    pub course_id: String,
    pub session_type: SessionType,
    pub creator_email: String,
    /// Whether the session is open to viewers, independent of its submission window.
    pub is_visible: bool,
    #[serde(default)]
    pub responding_students: HashSet<String>,
    #[serde(default)]
    pub responding_instructors: HashSet<String>,
}

impl FeedbackSession {
    pub fn new(
        name: impl Into<String>,
        course_id: impl Into<String>,
        creator_email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            course_id: course_id.into(),
            session_type: SessionType::Standard,
            creator_email: creator_email.into(),
            is_visible: true,
            responding_students: HashSet::new(),
            responding_instructors: HashSet::new(),
        }
    }

    pub fn is_private(&self) -> bool {
        self.session_type == SessionType::Private
    }
}

/// A question within a feedback session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackQuestion {
    pub id: Uuid,
    pub session_name: String,
    pub course_id: String,
    pub question_number: u32,
    pub giver_type: ParticipantType,
    pub recipient_type: ParticipantType,
    /// Participant types allowed to see responses to this question.
    #[serde(default)]
    pub show_responses_to: BTreeSet<ParticipantType>,
    /// Upper bound on recipients a giver must answer for; `None` means unlimited.
    #[serde(default)]
    pub number_of_entities_to_give_feedback_to: Option<u32>,
}

impl FeedbackQuestion {
    pub fn new(
        session: &FeedbackSession,
        question_number: u32,
        giver_type: ParticipantType,
        recipient_type: ParticipantType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_name: session.name.clone(),
            course_id: session.course_id.clone(),
            question_number,
            giver_type,
            recipient_type,
            show_responses_to: BTreeSet::new(),
            number_of_entities_to_give_feedback_to: None,
        }
    }

    pub fn visible_to(mut self, participants: impl IntoIterator<Item = ParticipantType>) -> Self {
        self.show_responses_to.extend(participants);
        self
    }

    pub fn is_response_visible_to(&self, participant: ParticipantType) -> bool {
        self.show_responses_to.contains(&participant)
    }
}

/// A single answer given by one participant to one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub id: Uuid,
    pub question_id: Uuid,
    pub session_name: String,
    pub course_id: String,
    pub giver: String,
    pub recipient: String,
    pub giver_section: String,
    pub recipient_section: String,
}

impl FeedbackResponse {
    pub fn new(question: &FeedbackQuestion, giver: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question_id: question.id,
            session_name: question.session_name.clone(),
            course_id: question.course_id.clone(),
            giver: giver.into(),
            recipient: recipient.into(),
            giver_section: DEFAULT_SECTION.to_string(),
            recipient_section: DEFAULT_SECTION.to_string(),
        }
    }

    pub fn in_sections(mut self, giver_section: impl Into<String>, recipient_section: impl Into<String>) -> Self {
        self.giver_section = giver_section.into();
        self.recipient_section = recipient_section.into();
        self
    }
}

/// Section assigned to students enrolled without one.
pub const DEFAULT_SECTION: &str = "None";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub email: String,
    pub course_id: String,
    pub name: String,
    pub team: String,
    pub section: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    pub email: String,
    pub course_id: String,
    pub name: String,
    #[serde(default)]
    pub privileges: InstructorPrivileges,
}

//=========================================================================================
// Instructor Privileges
//=========================================================================================

/// Named boolean privileges at course, section and session-in-section granularity.
///
/// The most specific layer defining a privilege wins; a privilege defined nowhere
/// is denied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorPrivileges {
    #[serde(default)]
    pub course_level: HashMap<String, bool>,
    #[serde(default)]
    pub section_level: HashMap<String, HashMap<String, bool>>,
    /// section -> session name -> privilege -> granted
    #[serde(default)]
    pub session_level: HashMap<String, HashMap<String, HashMap<String, bool>>>,
}

impl InstructorPrivileges {
    /// The privilege set of a course co-owner: every standard course-level privilege.
    pub fn co_owner() -> Self {
        let course_level = [
            PRIVILEGE_VIEW_SESSION_IN_SECTIONS,
            PRIVILEGE_SUBMIT_SESSION_IN_SECTIONS,
            PRIVILEGE_MODIFY_SESSION_COMMENT_IN_SECTIONS,
            PRIVILEGE_MODIFY_SESSION,
            PRIVILEGE_VIEW_STUDENT_IN_SECTIONS,
        ]
        .into_iter()
        .map(|p| (p.to_string(), true))
        .collect();
        Self {
            course_level,
            ..Self::default()
        }
    }

    pub fn with_course_privilege(mut self, privilege: &str, granted: bool) -> Self {
        self.course_level.insert(privilege.to_string(), granted);
        self
    }

    pub fn with_section_privilege(mut self, section: &str, privilege: &str, granted: bool) -> Self {
        self.section_level
            .entry(section.to_string())
            .or_default()
            .insert(privilege.to_string(), granted);
        self
    }

    pub fn with_session_privilege(
        mut self,
        section: &str,
        session_name: &str,
        privilege: &str,
        granted: bool,
    ) -> Self {
        self.session_level
            .entry(section.to_string())
            .or_default()
            .entry(session_name.to_string())
            .or_default()
            .insert(privilege.to_string(), granted);
        self
    }

    pub fn is_allowed_for_privilege(&self, section: &str, session_name: &str, privilege: &str) -> bool {
        self.session_level
            .get(section)
            .and_then(|sessions| sessions.get(session_name))
            .and_then(|privileges| privileges.get(privilege))
            .or_else(|| {
                self.section_level
                    .get(section)
                    .and_then(|privileges| privileges.get(privilege))
            })
            .or_else(|| self.course_level.get(privilege))
            .copied()
            .unwrap_or(false)
    }
}
