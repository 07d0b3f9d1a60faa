use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::models::Question;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("question source request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("question source returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("question source returned no questions for role {role:?}")]
    Empty { role: String },
}

/// Supplier of the unordered question pool for a role. The HTTP
/// implementation talks to the external question bank; tests plug in
/// in-memory sources.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch(&self, role: &str) -> Result<Vec<Question>, FetchError>;
}

pub struct HttpQuestionSource {
    client: Client,
    base_url: String,
}

impl HttpQuestionSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn fetch(&self, role: &str) -> Result<Vec<Question>, FetchError> {
        let url = format!("{}/api/questions", self.base_url);

        tracing::debug!("Fetching questions: url={}, role={}", url, role);

        let response = self
            .client
            .get(&url)
            .query(&[("role", role)])
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let questions: Vec<Question> = response.json().await?;

        if questions.is_empty() {
            return Err(FetchError::Empty {
                role: role.to_string(),
            });
        }

        tracing::info!("Fetched {} questions for role {}", questions.len(), role);

        Ok(questions)
    }
}
