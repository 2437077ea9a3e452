//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use feedback_visibility_core::{
    is_response_visible, ChecksError, CourseMembership, CourseMembershipLookup, FeedbackQuestion,
    FeedbackResponse, FeedbackSession, InstructorPrivileges, LookupOperation,
    SectionPrivilegeChecker, Student, UserRole, Viewer,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

pub const SESSION_DELETED_MESSAGE: &str =
    "The feedback session has been deleted and is no longer accessible.";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        session_access_handler,
        response_visibility_handler,
    ),
    components(
        schemas(SessionAccessResponse, ResponseVisibilityRequest, ResponseVisibilityResponse)
    ),
    tags(
        (name = "Feedback Visibility API", description = "Visibility and completion checks for feedback sessions.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// What the caller may do with a session they asked to open.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionAccessResponse {
    pub course_id: String,
    pub session_name: String,
    pub is_completed: bool,
    pub is_fully_completed: bool,
    pub has_questions_for_students: bool,
    pub is_for_students_to_answer: bool,
}

/// A loaded response and question, plus everything known about the viewer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseVisibilityRequest {
    pub viewer_email: String,
    #[schema(value_type = String, example = "student")]
    pub role: UserRole,
    #[schema(value_type = Option<Object>)]
    #[serde(default)]
    pub student: Option<Student>,
    #[schema(value_type = Option<Vec<String>>)]
    #[serde(default)]
    pub team_roster: Option<HashSet<String>>,
    #[schema(value_type = Option<Object>)]
    #[serde(default)]
    pub instructor_privileges: Option<InstructorPrivileges>,
    #[schema(value_type = Object)]
    pub response: FeedbackResponse,
    #[schema(value_type = Object)]
    pub question: FeedbackQuestion,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseVisibilityResponse {
    pub visible: bool,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn caller_identity(headers: &HeaderMap) -> Result<(String, UserRole), (StatusCode, String)> {
    let email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("{} header is required", USER_EMAIL_HEADER),
            )
        })?;

    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("{} header is required", USER_ROLE_HEADER),
            )
        })?
        .parse::<UserRole>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok((email.to_string(), role))
}

fn checks_failure(e: ChecksError) -> (StatusCode, String) {
    match e {
        ChecksError::SessionNotFound { .. } => {
            info!("{}", e);
            (StatusCode::NOT_FOUND, SESSION_DELETED_MESSAGE.to_string())
        }
        ChecksError::Port(_) => {
            error!("Session check failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to evaluate the feedback session".to_string(),
            )
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is running"))
)]
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Check whether the caller may open a feedback session, and how far they got.
///
/// The caller is identified by the `x-user-email` and `x-user-role` headers.
#[utoipa::path(
    get,
    path = "/courses/{course_id}/sessions/{session_name}/access",
    responses(
        (status = 200, description = "Session is accessible", body = SessionAccessResponse),
        (status = 400, description = "Missing or invalid caller headers"),
        (status = 403, description = "Caller is not in the course, or the session is not viewable to them"),
        (status = 404, description = "Session does not exist"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("course_id" = String, Path, description = "The course the session belongs to."),
        ("session_name" = String, Path, description = "The name of the session."),
        ("x-user-email" = String, Header, description = "The caller's email within the course."),
        ("x-user-role" = String, Header, description = "student, instructor or admin.")
    )
)]
pub async fn session_access_handler(
    State(app_state): State<Arc<AppState>>,
    Path((course_id, session_name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<SessionAccessResponse>, (StatusCode, String)> {
    let (email, role) = caller_identity(&headers)?;
    let checks = &app_state.checks;

    let session: FeedbackSession = checks
        .require_session(&session_name, &course_id, LookupOperation::View)
        .await
        .map_err(checks_failure)?;

    let is_instructor_of_course = match role {
        UserRole::Admin => true,
        UserRole::Instructor | UserRole::Student => {
            let membership = app_state
                .membership
                .course_membership(&course_id, &email)
                .await
                .map_err(|e| {
                    error!("Course membership lookup failed: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to look up course membership".to_string(),
                    )
                })?;
            match (role, membership) {
                (UserRole::Instructor, CourseMembership::Instructor) => true,
                (UserRole::Student, CourseMembership::Student) => false,
                _ => {
                    info!(
                        %course_id, %email, ?role, ?membership,
                        "Caller is not a member of the course in that role"
                    );
                    return Err((
                        StatusCode::FORBIDDEN,
                        "You are not a member of this course".to_string(),
                    ));
                }
            }
        }
    };

    if !checks
        .is_session_viewable_to(&session, &email, is_instructor_of_course)
        .await
        .map_err(checks_failure)?
    {
        info!(%course_id, %session_name, %email, "Feedback session not viewable to caller");
        return Err((
            StatusCode::FORBIDDEN,
            "You are not allowed to view this feedback session".to_string(),
        ));
    }

    let (is_completed, is_fully_completed) = if role == UserRole::Student {
        (
            checks.is_session_completed_by_student(&session, &email).await,
            checks
                .is_session_fully_completed_by_student(&session_name, &course_id, &email)
                .await,
        )
    } else {
        (
            checks.is_session_completed_by_instructor(&session, &email).await,
            checks
                .is_session_fully_completed_by_instructor(&session_name, &course_id, &email)
                .await,
        )
    };

    let response = SessionAccessResponse {
        is_completed: is_completed.map_err(checks_failure)?,
        is_fully_completed: is_fully_completed.map_err(checks_failure)?,
        has_questions_for_students: checks
            .is_feedback_session_has_question_for_students(&session_name, &course_id)
            .await
            .map_err(checks_failure)?,
        is_for_students_to_answer: checks
            .is_session_for_students_to_answer(&session)
            .await
            .map_err(checks_failure)?,
        course_id,
        session_name,
    };
    Ok(Json(response))
}

/// Decide whether a viewer may see a single, already-loaded response.
#[utoipa::path(
    post,
    path = "/visibility/response",
    request_body = ResponseVisibilityRequest,
    responses(
        (status = 200, description = "Decision made", body = ResponseVisibilityResponse),
        (status = 400, description = "Response does not belong to the question")
    )
)]
pub async fn response_visibility_handler(
    Json(req): Json<ResponseVisibilityRequest>,
) -> Result<Json<ResponseVisibilityResponse>, (StatusCode, String)> {
    if req.response.question_id != req.question.id {
        return Err((
            StatusCode::BAD_REQUEST,
            "The response does not belong to the given question".to_string(),
        ));
    }

    let viewer = Viewer {
        email: &req.viewer_email,
        role: req.role,
        student: req.student.as_ref(),
        team_roster: req.team_roster.as_ref(),
        instructor: req
            .instructor_privileges
            .as_ref()
            .map(|p| p as &dyn SectionPrivilegeChecker),
    };
    let visible = is_response_visible(&viewer, &req.response, &req.question);
    Ok(Json(ResponseVisibilityResponse { visible }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::web::router;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use feedback_visibility_core::{
        CourseMembershipLookup, FeedbackSessionChecks, InMemoryFeedbackStore, ParticipantType,
        PortError, PortResult, SessionType,
    };

    const COURSE: &str = "CS101";
    const CREATOR: &str = "lead@uni.edu";

    async fn create_test_app() -> (TestServer, FeedbackQuestion) {
        let store = Arc::new(InMemoryFeedbackStore::new());
        let open = FeedbackSession::new("Peer Review", COURSE, CREATOR);
        let private = FeedbackSession {
            session_type: SessionType::Private,
            ..FeedbackSession::new("My Notes", COURSE, CREATOR)
        };
        let draft = FeedbackSession {
            is_visible: false,
            ..FeedbackSession::new("Draft", COURSE, CREATOR)
        };
        let question = FeedbackQuestion::new(&open, 1, ParticipantType::Students, ParticipantType::Myself)
            .visible_to([ParticipantType::Instructors]);
        store.insert_session(open).await;
        store.insert_session(private).await;
        store.insert_session(draft).await;
        store.insert_question(question.clone()).await;
        store
            .insert_student(Student {
                email: "alice@uni.edu".to_string(),
                course_id: COURSE.to_string(),
                name: "Alice".to_string(),
                team: "Team A".to_string(),
                section: "Section A".to_string(),
            })
            .await;
        store.insert_instructor(COURSE, CREATOR).await;
        store.insert_instructor(COURSE, "tutor@uni.edu").await;

        let membership: Arc<dyn CourseMembershipLookup> = store.clone();
        (server_with(store, membership), question)
    }

    fn server_with(
        store: Arc<InMemoryFeedbackStore>,
        membership: Arc<dyn CourseMembershipLookup>,
    ) -> TestServer {
        let config = Config::from_lookup(|_| None).unwrap();
        let state = Arc::new(AppState {
            checks: FeedbackSessionChecks::from_store(store),
            membership,
            config: Arc::new(config),
        });
        TestServer::new(router(state)).unwrap()
    }

    struct UnreachableRoster;

    #[async_trait::async_trait]
    impl CourseMembershipLookup for UnreachableRoster {
        async fn course_membership(&self, _: &str, _: &str) -> PortResult<CourseMembership> {
            Err(PortError::Unexpected("roster service down".to_string()))
        }
    }

    fn header(name: &'static str, value: &str) -> (HeaderName, HeaderValue) {
        (HeaderName::from_static(name), HeaderValue::from_str(value).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (server, _) = create_test_app().await;
        server.get("/health").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_student_access_to_open_session() {
        let (server, _) = create_test_app().await;
        let (email_name, email_value) = header(USER_EMAIL_HEADER, "alice@uni.edu");
        let (role_name, role_value) = header(USER_ROLE_HEADER, "student");

        let response = server
            .get("/courses/CS101/sessions/Peer%20Review/access")
            .add_header(email_name, email_value)
            .add_header(role_name, role_value)
            .await;
        response.assert_status_ok();

        let body: SessionAccessResponse = response.json();
        assert_eq!(body.session_name, "Peer Review");
        assert!(!body.is_completed);
        assert!(!body.is_fully_completed);
        assert!(body.has_questions_for_students);
        assert!(body.is_for_students_to_answer);
    }

    #[tokio::test]
    async fn test_missing_session_is_not_found() {
        let (server, _) = create_test_app().await;
        let (email_name, email_value) = header(USER_EMAIL_HEADER, "alice@uni.edu");
        let (role_name, role_value) = header(USER_ROLE_HEADER, "student");

        let response = server
            .get("/courses/CS101/sessions/Gone/access")
            .add_header(email_name, email_value)
            .add_header(role_name, role_value)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.text(), SESSION_DELETED_MESSAGE);
    }

    #[tokio::test]
    async fn test_private_session_is_forbidden_to_other_instructors() {
        let (server, _) = create_test_app().await;
        let (role_name, role_value) = header(USER_ROLE_HEADER, "instructor");

        let (email_name, email_value) = header(USER_EMAIL_HEADER, "tutor@uni.edu");
        server
            .get("/courses/CS101/sessions/My%20Notes/access")
            .add_header(email_name, email_value)
            .add_header(role_name.clone(), role_value.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (email_name, email_value) = header(USER_EMAIL_HEADER, CREATOR);
        server
            .get("/courses/CS101/sessions/My%20Notes/access")
            .add_header(email_name, email_value)
            .add_header(role_name, role_value)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_missing_headers_are_rejected() {
        let (server, _) = create_test_app().await;
        let (role_name, role_value) = header(USER_ROLE_HEADER, "janitor");
        let (email_name, email_value) = header(USER_EMAIL_HEADER, "alice@uni.edu");

        server
            .get("/courses/CS101/sessions/Peer%20Review/access")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .get("/courses/CS101/sessions/Peer%20Review/access")
            .add_header(email_name, email_value)
            .add_header(role_name, role_value)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_response_visibility_decision() {
        let (server, question) = create_test_app().await;
        let response = FeedbackResponse::new(&question, "alice@uni.edu", "alice@uni.edu");

        let mut request = ResponseVisibilityRequest {
            viewer_email: "bob@uni.edu".to_string(),
            role: UserRole::Student,
            student: None,
            team_roster: None,
            instructor_privileges: None,
            response: response.clone(),
            question: question.clone(),
        };
        let body: ResponseVisibilityResponse =
            server.post("/visibility/response").json(&request).await.json();
        assert!(!body.visible);

        request.viewer_email = CREATOR.to_string();
        request.role = UserRole::Instructor;
        request.instructor_privileges = Some(InstructorPrivileges::co_owner());
        let body: ResponseVisibilityResponse =
            server.post("/visibility/response").json(&request).await.json();
        assert!(body.visible);
    }

    #[tokio::test]
    async fn test_mismatched_question_is_rejected() {
        let (server, question) = create_test_app().await;
        let other = FeedbackQuestion::new(
            &FeedbackSession::new("Peer Review", COURSE, CREATOR),
            2,
            ParticipantType::Students,
            ParticipantType::Students,
        );
        let request = ResponseVisibilityRequest {
            viewer_email: "alice@uni.edu".to_string(),
            role: UserRole::Student,
            student: None,
            team_roster: None,
            instructor_privileges: None,
            response: FeedbackResponse::new(&other, "alice@uni.edu", "bob@uni.edu"),
            question,
        };

        server
            .post("/visibility/response")
            .json(&request)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_instructor_outside_the_course_is_forbidden() {
        let (server, _) = create_test_app().await;
        let (email_name, email_value) = header(USER_EMAIL_HEADER, "stranger@other.edu");
        let (role_name, role_value) = header(USER_ROLE_HEADER, "instructor");

        let response = server
            .get("/courses/CS101/sessions/Draft/access")
            .add_header(email_name, email_value)
            .add_header(role_name, role_value)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.text(), "You are not a member of this course");
    }

    #[tokio::test]
    async fn test_hidden_session_is_open_to_course_instructors_only() {
        let (server, _) = create_test_app().await;

        let (email_name, email_value) = header(USER_EMAIL_HEADER, "tutor@uni.edu");
        let (role_name, role_value) = header(USER_ROLE_HEADER, "instructor");
        server
            .get("/courses/CS101/sessions/Draft/access")
            .add_header(email_name, email_value)
            .add_header(role_name, role_value)
            .await
            .assert_status_ok();

        let (email_name, email_value) = header(USER_EMAIL_HEADER, "alice@uni.edu");
        let (role_name, role_value) = header(USER_ROLE_HEADER, "student");
        server
            .get("/courses/CS101/sessions/Draft/access")
            .add_header(email_name, email_value)
            .add_header(role_name, role_value)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_claimed_role_must_match_enrolment() {
        let (server, _) = create_test_app().await;

        // Enrolled as a student, claiming instructor.
        let (email_name, email_value) = header(USER_EMAIL_HEADER, "alice@uni.edu");
        let (role_name, role_value) = header(USER_ROLE_HEADER, "instructor");
        server
            .get("/courses/CS101/sessions/Draft/access")
            .add_header(email_name, email_value)
            .add_header(role_name, role_value)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (email_name, email_value) = header(USER_EMAIL_HEADER, "stranger@other.edu");
        let (role_name, role_value) = header(USER_ROLE_HEADER, "student");
        server
            .get("/courses/CS101/sessions/Peer%20Review/access")
            .add_header(email_name, email_value)
            .add_header(role_name, role_value)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_skips_the_membership_lookup() {
        let store = Arc::new(InMemoryFeedbackStore::new());
        store
            .insert_session(FeedbackSession {
                is_visible: false,
                ..FeedbackSession::new("Draft", COURSE, CREATOR)
            })
            .await;
        let server = server_with(store, Arc::new(UnreachableRoster));
        let (email_name, email_value) = header(USER_EMAIL_HEADER, "admin@uni.edu");
        let (role_name, role_value) = header(USER_ROLE_HEADER, "admin");

        server
            .get("/courses/CS101/sessions/Draft/access")
            .add_header(email_name.clone(), email_value.clone())
            .add_header(role_name, role_value)
            .await
            .assert_status_ok();

        let (role_name, role_value) = header(USER_ROLE_HEADER, "instructor");
        server
            .get("/courses/CS101/sessions/Draft/access")
            .add_header(email_name, email_value)
            .add_header(role_name, role_value)
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_session_always_maps_to_deleted_message() {
        for operation in [LookupOperation::Get, LookupOperation::Check, LookupOperation::View] {
            let (status, body) = checks_failure(ChecksError::SessionNotFound {
                operation,
                course_id: COURSE.to_string(),
                session_name: "Gone".to_string(),
            });
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body, SESSION_DELETED_MESSAGE);
        }
    }
}
