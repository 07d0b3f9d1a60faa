use axum::Router;
use std::sync::Arc;

use proctorquiz_api::config::{Config, QuizSettings};
use proctorquiz_api::create_router;
use proctorquiz_api::services::storage::{MemorySubmissionStore, SubmissionStore};
use proctorquiz_api::services::AppState;

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: "unused-in-tests".to_string(),
        question_api_url: "http://localhost:0".to_string(),
        quiz: QuizSettings::default(),
    }
}

/// Build the router against an in-memory store and hand the store back so
/// tests can assert on recorded rows.
pub fn create_test_app() -> (Router, Arc<MemorySubmissionStore>) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(MemorySubmissionStore::default());
    let app_state = Arc::new(AppState::new(
        test_config(),
        Arc::clone(&store) as Arc<dyn SubmissionStore>,
    ));
    (create_router(app_state), store)
}
