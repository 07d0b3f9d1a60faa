use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Terminal outcome of an attempt. Serialized in SCREAMING case to match
/// the `status` tag the persistence rows already contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizOutcome {
    Passed,
    Failed,
    Disqualified,
}

impl QuizOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            QuizOutcome::Passed => "passed",
            QuizOutcome::Failed => "failed",
            QuizOutcome::Disqualified => "disqualified",
        }
    }
}

/// Per-question line of the final breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResult {
    #[serde(rename = "questionId")]
    pub question_id: i64,
    pub question: String,
    /// `None` when the question was never answered.
    #[serde(rename = "selectedOption")]
    pub selected_option: Option<String>,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
}

/// The opaque result record stored as `json_data` in the persistence row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    #[serde(rename = "attemptId")]
    pub attempt_id: String,
    pub status: QuizOutcome,
    /// Percentage formatted to one decimal; absent for disqualified attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    /// Disqualification reason; absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "warningCount")]
    pub warning_count: u32,
    pub questions: Vec<QuestionResult>,
}

/// Wire body for `POST /api/save-quiz`, exactly one row per submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEnvelope {
    #[serde(rename = "UserName")]
    pub user_name: String,
    #[serde(rename = "UserID")]
    pub user_id: String,
    pub json_data: QuizResult,
}

/// Acknowledgement returned by the persistence endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionAck {
    pub message: String,
}

/// Server-side view of the save-quiz body. `json_data` stays opaque: any
/// valid JSON is accepted and stored as text.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveQuizRequest {
    #[serde(rename = "UserName")]
    #[validate(length(min = 1, message = "UserName must not be empty"))]
    pub user_name: String,
    #[serde(rename = "UserID")]
    #[validate(length(min = 1, message = "UserID must not be empty"))]
    pub user_id: String,
    pub json_data: Value,
}

#[derive(Debug, Serialize)]
pub struct SaveQuizResponse {
    pub message: String,
}
