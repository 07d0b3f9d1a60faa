use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::result::{QuestionResult, QuizOutcome, QuizResult};
use crate::models::{Answer, OptionLabel, Question};
use crate::quiz::monitor::{ViolationKind, Warning};
use crate::quiz::scorer;

/// Scoring and escalation rules for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct QuizRules {
    pub passing_percent: f64,
    pub max_warnings: u32,
}

impl Default for QuizRules {
    fn default() -> Self {
        Self {
            passing_percent: 0.0,
            max_warnings: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    InProgress,
    AwaitingReview,
    Finalized,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error("cannot start an attempt with no questions")]
    NoQuestions,
    #[error("attempt is already finalized")]
    Finalized,
    #[error("question position {position} out of range (length {length})")]
    PositionOutOfRange { position: usize, length: usize },
    #[error("attempt is not awaiting review")]
    NotAwaitingReview,
}

/// One complete run through a sampled question set by one test-taker.
///
/// The attempt is a closed state machine: `InProgress -> AwaitingReview ->
/// Finalized`, with disqualification forcing `Finalized` from anywhere.
/// Every mutation checks the phase first; once finalized the state is
/// immutable and the result envelope can be taken exactly once.
#[derive(Debug)]
pub struct Attempt {
    id: String,
    questions: Vec<Question>,
    position: usize,
    answers: Vec<Answer>,
    warning_count: u32,
    last_warning_reason: Option<&'static str>,
    disqualified: bool,
    phase: AttemptPhase,
    rules: QuizRules,
    result_taken: bool,
}

impl Attempt {
    /// An empty sample means the fetch failed upstream; refuse to start.
    pub fn new(questions: Vec<Question>, rules: QuizRules) -> Result<Self, AttemptError> {
        if questions.is_empty() {
            return Err(AttemptError::NoQuestions);
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            questions,
            position: 0,
            answers: Vec::new(),
            warning_count: 0,
            last_warning_reason: None,
            disqualified: false,
            phase: AttemptPhase::InProgress,
            rules,
            result_taken: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.position]
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn answer_for(&self, question_id: i64) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    pub fn is_disqualified(&self) -> bool {
        self.disqualified
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == AttemptPhase::Finalized
    }

    /// Record (or overwrite, last write wins) the answer for the question at
    /// `position`. Correctness is derived at selection time. The current
    /// position does not move.
    pub fn select_option(
        &mut self,
        position: usize,
        label: OptionLabel,
    ) -> Result<(), AttemptError> {
        self.ensure_in_progress()?;
        let question = self
            .questions
            .get(position)
            .ok_or(AttemptError::PositionOutOfRange {
                position,
                length: self.questions.len(),
            })?;

        let answer = Answer {
            question_id: question.id,
            selected_option: label.as_str().to_string(),
            is_correct: question.correct_option == label.as_str(),
            question: question.question.clone(),
        };

        match self
            .answers
            .iter_mut()
            .find(|a| a.question_id == answer.question_id)
        {
            Some(existing) => *existing = answer,
            None => self.answers.push(answer),
        }
        Ok(())
    }

    /// Move forward one question; at the last question this transitions to
    /// review instead of moving.
    pub fn advance(&mut self) -> Result<AttemptPhase, AttemptError> {
        self.ensure_in_progress()?;
        if self.position + 1 < self.questions.len() {
            self.position += 1;
        } else {
            self.phase = AttemptPhase::AwaitingReview;
        }
        Ok(self.phase)
    }

    /// Move back one question; no-op at position 0.
    pub fn retreat(&mut self) -> Result<(), AttemptError> {
        self.ensure_in_progress()?;
        self.position = self.position.saturating_sub(1);
        Ok(())
    }

    /// Countdown hit zero. Returns true only on the single firing transition
    /// out of `InProgress`; late or duplicate expirations are ignored.
    pub fn time_expired(&mut self) -> bool {
        if self.phase == AttemptPhase::InProgress {
            self.phase = AttemptPhase::AwaitingReview;
            true
        } else {
            false
        }
    }

    /// Explicit submission from the review screen.
    pub fn submit(&mut self) -> Result<(), AttemptError> {
        match self.phase {
            AttemptPhase::AwaitingReview => {
                self.phase = AttemptPhase::Finalized;
                Ok(())
            }
            AttemptPhase::Finalized => Err(AttemptError::Finalized),
            AttemptPhase::InProgress => Err(AttemptError::NotAwaitingReview),
        }
    }

    /// Convert one detected violation into exactly one warning. At the
    /// configured maximum the attempt is disqualified and finalized; the
    /// finalized check doubles as the latch, so violations arriving after
    /// that produce no warning and no further side effects.
    pub fn record_violation(&mut self, kind: ViolationKind) -> Option<Warning> {
        if self.is_finalized() {
            return None;
        }
        self.warning_count += 1;
        self.last_warning_reason = Some(kind.reason());
        let warning = Warning {
            sequence: self.warning_count,
            kind,
            reason: kind.reason(),
        };
        if self.warning_count >= self.rules.max_warnings {
            self.disqualified = true;
            self.phase = AttemptPhase::Finalized;
        }
        Some(warning)
    }

    pub fn score(&self) -> f64 {
        scorer::effective_score(&self.answers, self.questions.len(), self.disqualified)
    }

    pub fn passed(&self) -> bool {
        scorer::passed(self.score(), self.rules.passing_percent, self.disqualified)
    }

    pub fn outcome(&self) -> QuizOutcome {
        if self.disqualified {
            QuizOutcome::Disqualified
        } else if self.passed() {
            QuizOutcome::Passed
        } else {
            QuizOutcome::Failed
        }
    }

    /// Build the result record, at most once per attempt. The take-once
    /// semantics are the submission latch: whoever gets `Some` owns the one
    /// allowed call to the persistence endpoint.
    pub fn take_result(&mut self) -> Option<QuizResult> {
        if !self.is_finalized() || self.result_taken {
            return None;
        }
        self.result_taken = true;

        let questions = self
            .questions
            .iter()
            .map(|q| {
                let answer = self.answers.iter().find(|a| a.question_id == q.id);
                QuestionResult {
                    question_id: q.id,
                    question: q.question.clone(),
                    selected_option: answer.map(|a| a.selected_option.clone()),
                    // Disqualification voids recorded correctness.
                    is_correct: !self.disqualified
                        && answer.map(|a| a.is_correct).unwrap_or(false),
                }
            })
            .collect();

        let reason = self.disqualified.then(|| {
            format!(
                "Disqualified after {} warnings. Last warning: {}",
                self.rules.max_warnings,
                self.last_warning_reason.unwrap_or("policy violation")
            )
        });

        Some(QuizResult {
            attempt_id: self.id.clone(),
            status: self.outcome(),
            score: (!self.disqualified).then(|| format!("{:.1}", self.score())),
            reason,
            timestamp: Utc::now(),
            warning_count: self.warning_count,
            questions,
        })
    }

    fn ensure_in_progress(&self) -> Result<(), AttemptError> {
        match self.phase {
            AttemptPhase::InProgress => Ok(()),
            _ => Err(AttemptError::Finalized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionRole;

    fn questions(n: i64) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: i,
                question: format!("Question {}", i),
                option_a: "first".into(),
                option_b: "second".into(),
                option_c: "third".into(),
                option_d: "fourth".into(),
                correct_option: "A".into(),
                role: QuestionRole {
                    id: 1,
                    name: "FullStack (Web)".into(),
                },
            })
            .collect()
    }

    #[test]
    fn empty_question_list_is_rejected() {
        assert_eq!(
            Attempt::new(vec![], QuizRules::default()).unwrap_err(),
            AttemptError::NoQuestions
        );
    }

    #[test]
    fn retreat_is_a_no_op_at_the_first_question() {
        let mut attempt = Attempt::new(questions(3), QuizRules::default()).unwrap();
        attempt.retreat().unwrap();
        assert_eq!(attempt.position(), 0);
    }

    #[test]
    fn advance_at_last_question_starts_review() {
        let mut attempt = Attempt::new(questions(2), QuizRules::default()).unwrap();
        assert_eq!(attempt.advance().unwrap(), AttemptPhase::InProgress);
        assert_eq!(attempt.position(), 1);
        assert_eq!(attempt.advance().unwrap(), AttemptPhase::AwaitingReview);
        assert_eq!(attempt.position(), 1);
    }

    #[test]
    fn time_expiry_fires_once() {
        let mut attempt = Attempt::new(questions(2), QuizRules::default()).unwrap();
        assert!(attempt.time_expired());
        assert!(!attempt.time_expired());
        assert_eq!(attempt.phase(), AttemptPhase::AwaitingReview);
    }

    #[test]
    fn submit_requires_review_and_is_terminal() {
        let mut attempt = Attempt::new(questions(1), QuizRules::default()).unwrap();
        assert_eq!(attempt.submit().unwrap_err(), AttemptError::NotAwaitingReview);
        attempt.advance().unwrap();
        attempt.submit().unwrap();
        assert_eq!(attempt.submit().unwrap_err(), AttemptError::Finalized);
        assert_eq!(
            attempt.select_option(0, OptionLabel::A).unwrap_err(),
            AttemptError::Finalized
        );
    }

    #[test]
    fn third_warning_disqualifies_and_latches() {
        let mut attempt = Attempt::new(questions(2), QuizRules::default()).unwrap();
        let w1 = attempt.record_violation(ViolationKind::FocusLoss).unwrap();
        let w2 = attempt.record_violation(ViolationKind::ContextMenu).unwrap();
        let w3 = attempt.record_violation(ViolationKind::Clipboard).unwrap();
        assert_eq!((w1.sequence, w2.sequence, w3.sequence), (1, 2, 3));
        assert!(attempt.is_disqualified());
        assert!(attempt.is_finalized());

        // Latched: later violations emit nothing and move no counters.
        assert!(attempt.record_violation(ViolationKind::DevTools).is_none());
        assert_eq!(attempt.warning_count(), 3);
    }

    #[test]
    fn result_can_be_taken_exactly_once() {
        let mut attempt = Attempt::new(questions(1), QuizRules::default()).unwrap();
        attempt.advance().unwrap();
        attempt.submit().unwrap();
        assert!(attempt.take_result().is_some());
        assert!(attempt.take_result().is_none());
    }

    #[test]
    fn result_is_unavailable_before_finalization() {
        let mut attempt = Attempt::new(questions(1), QuizRules::default()).unwrap();
        assert!(attempt.take_result().is_none());
        attempt.advance().unwrap();
        assert!(attempt.take_result().is_none());
    }

    #[test]
    fn warning_banner_message_includes_sequence_and_limit() {
        let mut attempt = Attempt::new(questions(2), QuizRules::default()).unwrap();
        let warning = attempt.record_violation(ViolationKind::FocusLoss).unwrap();
        assert_eq!(
            warning.banner_message(3),
            "Warning 1/3: Switching tabs is not allowed during the quiz"
        );
    }
}
