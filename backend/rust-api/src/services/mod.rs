use std::sync::Arc;

use crate::config::Config;
use storage::SubmissionStore;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SubmissionStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn SubmissionStore>) -> Self {
        Self { config, store }
    }
}

pub mod proctor_service;
pub mod question_service;
pub mod storage;
pub mod submission_service;
