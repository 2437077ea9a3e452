//! crates/feedback_visibility_core/src/roster.rs
//!
//! Course membership as seen by the completeness checks: who a giver is expected
//! to give feedback to for a given question.

use std::collections::{BTreeSet, HashSet};

use crate::domain::{CourseMembership, FeedbackQuestion, ParticipantType, Student};

#[derive(Debug, Clone, Default)]
pub struct CourseRoster {
    pub students: Vec<Student>,
    pub instructor_emails: Vec<String>,
}

impl CourseRoster {
    pub fn student(&self, email: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.email == email)
    }

    pub fn membership(&self, email: &str) -> CourseMembership {
        if self.instructor_emails.iter().any(|e| e == email) {
            CourseMembership::Instructor
        } else if self.student(email).is_some() {
            CourseMembership::Student
        } else {
            CourseMembership::NotMember
        }
    }

    /// Emails of everyone in the given team, the student themself included.
    pub fn team_roster(&self, team: &str) -> HashSet<String> {
        self.students
            .iter()
            .filter(|s| s.team == team)
            .map(|s| s.email.clone())
            .collect()
    }

    fn team_names(&self) -> BTreeSet<&str> {
        self.students.iter().map(|s| s.team.as_str()).collect()
    }

    /// Number of distinct recipients `giver_email` must answer for on `question`.
    pub fn expected_recipient_count(&self, question: &FeedbackQuestion, giver_email: &str) -> usize {
        let giver_team = self.student(giver_email).map(|s| s.team.as_str());

        let count = match question.recipient_type {
            ParticipantType::Myself | ParticipantType::None | ParticipantType::OwnTeam => 1,
            ParticipantType::Students => self
                .students
                .iter()
                .filter(|s| s.email != giver_email)
                .count(),
            ParticipantType::Instructors => self
                .instructor_emails
                .iter()
                .filter(|e| e.as_str() != giver_email)
                .count(),
            ParticipantType::Teams => self
                .team_names()
                .into_iter()
                .filter(|team| Some(*team) != giver_team)
                .count(),
            ParticipantType::OwnTeamMembers => giver_team
                .map(|team| self.team_roster(team).len().saturating_sub(1))
                .unwrap_or(0),
            ParticipantType::OwnTeamMembersIncludingSelf => giver_team
                .map(|team| self.team_roster(team).len())
                .unwrap_or(0),
            // Not valid recipient types; nothing to answer.
            ParticipantType::Receiver | ParticipantType::ReceiverTeamMembers => 0,
        };

        match question.number_of_entities_to_give_feedback_to {
            Some(limit) => count.min(limit as usize),
            None => count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeedbackSession;

    fn student(email: &str, team: &str) -> Student {
        Student {
            email: email.to_string(),
            course_id: "CS101".to_string(),
            name: email.to_string(),
            team: team.to_string(),
            section: "Section A".to_string(),
        }
    }

    fn roster() -> CourseRoster {
        CourseRoster {
            students: vec![
                student("alice@uni.edu", "Team A"),
                student("bob@uni.edu", "Team A"),
                student("carol@uni.edu", "Team B"),
            ],
            instructor_emails: vec!["lead@uni.edu".to_string()],
        }
    }

    #[test]
    fn counts_exclude_the_giver() {
        let session = FeedbackSession::new("Week 1", "CS101", "lead@uni.edu");
        let roster = roster();

        let peers = FeedbackQuestion::new(&session, 1, ParticipantType::Students, ParticipantType::Students);
        assert_eq!(roster.expected_recipient_count(&peers, "alice@uni.edu"), 2);

        let teams = FeedbackQuestion::new(&session, 2, ParticipantType::Students, ParticipantType::Teams);
        assert_eq!(roster.expected_recipient_count(&teams, "alice@uni.edu"), 1);

        let teammates =
            FeedbackQuestion::new(&session, 3, ParticipantType::Students, ParticipantType::OwnTeamMembers);
        assert_eq!(roster.expected_recipient_count(&teammates, "alice@uni.edu"), 1);
    }

    #[test]
    fn membership_prefers_instructor_role() {
        let mut roster = roster();
        roster.instructor_emails.push("alice@uni.edu".to_string());

        assert_eq!(roster.membership("alice@uni.edu"), CourseMembership::Instructor);
        assert_eq!(roster.membership("bob@uni.edu"), CourseMembership::Student);
        assert_eq!(roster.membership("stranger@other.edu"), CourseMembership::NotMember);
    }

    #[test]
    fn entity_limit_caps_the_count() {
        let session = FeedbackSession::new("Week 1", "CS101", "lead@uni.edu");
        let mut question = FeedbackQuestion::new(&session, 1, ParticipantType::Instructors, ParticipantType::Students);
        question.number_of_entities_to_give_feedback_to = Some(1);

        assert_eq!(roster().expected_recipient_count(&question, "lead@uni.edu"), 1);
    }
}
