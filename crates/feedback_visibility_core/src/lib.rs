pub mod checks;
pub mod domain;
pub mod error;
pub mod memory;
pub mod ports;
pub mod roster;
pub mod visibility;

pub use checks::FeedbackSessionChecks;
pub use domain::{
    CourseMembership, FeedbackQuestion, FeedbackResponse, FeedbackSession, Instructor, InstructorPrivileges,
    ParticipantType, SessionType, Student, UserRole,
};
pub use error::{ChecksError, ChecksResult, LookupOperation};
pub use memory::InMemoryFeedbackStore;
pub use ports::{
    CourseMembershipLookup, FeedbackQuestionProvider, FeedbackSessionStore, PortError, PortResult,
    QuestionCompletenessChecker, QuestionResponseVisibility, SectionPrivilegeChecker,
    StandardResponseVisibility,
};
pub use roster::CourseRoster;
pub use visibility::{is_response_visible, Viewer};
