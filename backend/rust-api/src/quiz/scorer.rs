use crate::models::Answer;

/// Percentage of correct answers over the full sampled set, in [0, 100].
/// `total` must be non-zero; the attempt constructor rejects empty question
/// lists so this precondition holds for every live attempt.
pub fn percentage(answers: &[Answer], total: usize) -> f64 {
    let correct = answers.iter().filter(|a| a.is_correct).count();
    (correct as f64 / total as f64) * 100.0
}

/// A disqualified attempt scores zero no matter what was answered.
pub fn effective_score(answers: &[Answer], total: usize, disqualified: bool) -> f64 {
    if disqualified {
        0.0
    } else {
        percentage(answers, total)
    }
}

pub fn passed(score: f64, passing_percent: f64, disqualified: bool) -> bool {
    !disqualified && score >= passing_percent
}
