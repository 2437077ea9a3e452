pub mod rest;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use rest::{health_handler, response_visibility_handler, session_access_handler};
pub use state::AppState;

/// Builds the API routes; layers such as CORS and Swagger UI are added by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/courses/{course_id}/sessions/{session_name}/access",
            get(session_access_handler),
        )
        .route("/visibility/response", post(response_visibility_handler))
        .with_state(app_state)
}
