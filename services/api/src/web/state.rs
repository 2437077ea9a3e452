//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use feedback_visibility_core::{CourseMembershipLookup, FeedbackSessionChecks};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub checks: FeedbackSessionChecks,
    pub membership: Arc<dyn CourseMembershipLookup>,
    pub config: Arc<Config>,
}
