use serde::{Deserialize, Serialize};

/// One multiple-choice question as served by the question bank API.
/// Immutable for the duration of an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub question: String,
    #[serde(rename = "optionA")]
    pub option_a: String,
    #[serde(rename = "optionB")]
    pub option_b: String,
    #[serde(rename = "optionC")]
    pub option_c: String,
    #[serde(rename = "optionD")]
    pub option_d: String,
    #[serde(rename = "correctOption")]
    pub correct_option: String,
    pub role: QuestionRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRole {
    pub id: i64,
    pub name: String,
}

/// Label of one of the four answer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }

    /// The option text this label points at within a question.
    pub fn text<'a>(&self, question: &'a Question) -> &'a str {
        match self {
            OptionLabel::A => &question.option_a,
            OptionLabel::B => &question.option_b,
            OptionLabel::C => &question.option_c,
            OptionLabel::D => &question.option_d,
        }
    }
}

impl std::fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded selection for one question. At most one per question id;
/// re-selecting replaces the record in place (last write wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: i64,
    pub selected_option: String,
    pub is_correct: bool,
    /// Denormalized prompt text so the review table does not re-join.
    pub question: String,
}

/// Opaque caller-supplied identity. No verification is performed; the
/// fallbacks mirror what the client uses when its local storage is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_name: String,
    pub user_id: String,
}

impl Identity {
    pub fn new(user_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            user_id: user_id.into(),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            user_name: "Anonymous".to_string(),
            user_id: "default-user".to_string(),
        }
    }
}

pub mod result;
