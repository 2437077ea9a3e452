//! crates/feedback_visibility_core/src/visibility.rs
//!
//! Decides whether a single feedback response can be seen by a single viewer.

use std::collections::HashSet;
use tracing::debug;

use crate::domain::{
    FeedbackQuestion, FeedbackResponse, ParticipantType, Student, UserRole,
    PRIVILEGE_VIEW_SESSION_IN_SECTIONS,
};
use crate::ports::SectionPrivilegeChecker;

/// Everything known about the user asking to see a response.
#[derive(Clone, Copy)]
pub struct Viewer<'a> {
    pub email: &'a str,
    pub role: UserRole,
    pub student: Option<&'a Student>,
    /// Emails of the viewer's teammates; only meaningful for students.
    pub team_roster: Option<&'a HashSet<String>>,
    /// Present only when evaluating on behalf of an instructor.
    pub instructor: Option<&'a dyn SectionPrivilegeChecker>,
}

impl<'a> Viewer<'a> {
    pub fn new(email: &'a str, role: UserRole) -> Self {
        Self {
            email,
            role,
            student: None,
            team_roster: None,
            instructor: None,
        }
    }

    pub fn student(student: &'a Student, team_roster: Option<&'a HashSet<String>>) -> Self {
        Self {
            email: &student.email,
            role: UserRole::Student,
            student: Some(student),
            team_roster,
            instructor: None,
        }
    }

    pub fn instructor(email: &'a str, privileges: &'a dyn SectionPrivilegeChecker) -> Self {
        Self {
            email,
            role: UserRole::Instructor,
            student: None,
            team_roster: None,
            instructor: Some(privileges),
        }
    }
}

/// Returns true if `viewer` may see `response` to `question`.
///
/// Participant-type rules grant access first; an instructor's section privileges
/// can then only take that access away again.
pub fn is_response_visible(
    viewer: &Viewer<'_>,
    response: &FeedbackResponse,
    question: &FeedbackQuestion,
) -> bool {
    let granted = is_granted_by_participant_type(viewer, response, question)
        || is_granted_by_team(viewer, response, question);
    if !granted {
        return false;
    }

    match viewer.instructor {
        Some(instructor) => !is_restricted_by_section(instructor, response, question),
        None => true,
    }
}

fn is_granted_by_participant_type(
    viewer: &Viewer<'_>,
    response: &FeedbackResponse,
    question: &FeedbackQuestion,
) -> bool {
    (viewer.role == UserRole::Instructor
        && question.is_response_visible_to(ParticipantType::Instructors))
        || (response.recipient == viewer.email
            && question.is_response_visible_to(ParticipantType::Receiver))
        || response.giver == viewer.email
        || (viewer.role == UserRole::Student
            && question.is_response_visible_to(ParticipantType::Students))
}

fn is_granted_by_team(
    viewer: &Viewer<'_>,
    response: &FeedbackResponse,
    question: &FeedbackQuestion,
) -> bool {
    let roster = match viewer.team_roster {
        Some(roster) if viewer.role == UserRole::Student => roster,
        _ => return false,
    };

    let is_receiving_team = question.recipient_type == ParticipantType::Teams
        && question.is_response_visible_to(ParticipantType::Receiver)
        && viewer
            .student
            .is_some_and(|student| response.recipient == student.team);

    is_receiving_team
        || (question.giver_type == ParticipantType::Teams && roster.contains(&response.giver))
        || (question.is_response_visible_to(ParticipantType::OwnTeamMembers)
            && roster.contains(&response.giver))
        || (question.is_response_visible_to(ParticipantType::ReceiverTeamMembers)
            && roster.contains(&response.recipient))
}

// General questions (recipient NONE) have no recipient section to restrict.
fn is_restricted_by_section(
    instructor: &dyn SectionPrivilegeChecker,
    response: &FeedbackResponse,
    question: &FeedbackQuestion,
) -> bool {
    let giver_restricted = !instructor.is_allowed_for_privilege(
        &response.giver_section,
        &response.session_name,
        PRIVILEGE_VIEW_SESSION_IN_SECTIONS,
    );
    let recipient_restricted = question.recipient_type != ParticipantType::None
        && !instructor.is_allowed_for_privilege(
            &response.recipient_section,
            &response.session_name,
            PRIVILEGE_VIEW_SESSION_IN_SECTIONS,
        );

    if giver_restricted || recipient_restricted {
        debug!(
            response_id = %response.id,
            giver_section = %response.giver_section,
            recipient_section = %response.recipient_section,
            "Response hidden by instructor section privileges"
        );
        return true;
    }
    false
}
