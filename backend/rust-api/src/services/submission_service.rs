use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::models::result::{SubmissionAck, SubmissionEnvelope};
use crate::utils::retry::{retry_async_with_config, RetryConfig};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("submission request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("persistence endpoint rejected submission with status {status}: {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
}

/// Destination for the final result record. The state machine calls this at
/// most once per attempt; a failure is surfaced to the caller but does not
/// roll back the locally finalized attempt.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn submit(&self, envelope: &SubmissionEnvelope) -> Result<SubmissionAck, SubmissionError>;
}

pub struct HttpResultSink {
    client: Client,
    endpoint: String,
    retry: RetryConfig,
}

impl HttpResultSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn post_once(
        &self,
        envelope: &SubmissionEnvelope,
    ) -> Result<SubmissionAck, SubmissionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(envelope)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SubmissionError::Rejected { status, message });
        }

        let ack: SubmissionAck = response.json().await?;
        Ok(ack)
    }
}

#[async_trait]
impl ResultSink for HttpResultSink {
    async fn submit(&self, envelope: &SubmissionEnvelope) -> Result<SubmissionAck, SubmissionError> {
        tracing::info!(
            "Submitting quiz result: user_id={}, status={:?}",
            envelope.user_id,
            envelope.json_data.status
        );

        retry_async_with_config(self.retry.clone(), || async {
            self.post_once(envelope).await
        })
        .await
    }
}
