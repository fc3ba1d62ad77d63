use std::sync::Arc;

use crate::config::Config;
use crate::interview::session::InterviewService;
use crate::interview::store::CandidateStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The session state machine; owns single-flight discipline per session.
    pub interview: Arc<InterviewService>,
    /// Direct store handle for dashboard reads (candidate + answer records).
    pub candidates: Arc<dyn CandidateStore>,
    pub config: Config,
}
