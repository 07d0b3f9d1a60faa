use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use proctorquiz_api::config::QuizSettings;
use proctorquiz_api::models::result::{QuizOutcome, SubmissionAck, SubmissionEnvelope};
use proctorquiz_api::models::{Identity, OptionLabel, Question, QuestionRole};
use proctorquiz_api::quiz::monitor::ViolationKind;
use proctorquiz_api::services::proctor_service::{
    ProctorService, SessionCommand, SessionHandle, SessionNotice,
};
use proctorquiz_api::services::question_service::{FetchError, QuestionSource};
use proctorquiz_api::services::submission_service::{ResultSink, SubmissionError};

struct FixedSource {
    pool: Vec<Question>,
}

impl FixedSource {
    fn with_questions(n: usize) -> Self {
        let pool = (1..=n as i64)
            .map(|id| Question {
                id,
                question: format!("Question {id}?"),
                option_a: "alpha".to_string(),
                option_b: "beta".to_string(),
                option_c: "gamma".to_string(),
                option_d: "delta".to_string(),
                correct_option: "A".to_string(),
                role: QuestionRole {
                    id: 1,
                    name: "FullStack (Web)".to_string(),
                },
            })
            .collect();
        Self { pool }
    }

    fn empty() -> Self {
        Self { pool: Vec::new() }
    }
}

#[async_trait]
impl QuestionSource for FixedSource {
    async fn fetch(&self, role: &str) -> Result<Vec<Question>, FetchError> {
        if self.pool.is_empty() {
            return Err(FetchError::Empty {
                role: role.to_string(),
            });
        }
        Ok(self.pool.clone())
    }
}

#[derive(Default)]
struct CountingSink {
    calls: AtomicUsize,
    last: Mutex<Option<SubmissionEnvelope>>,
}

impl CountingSink {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last(&self) -> Option<SubmissionEnvelope> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for CountingSink {
    async fn submit(&self, envelope: &SubmissionEnvelope) -> Result<SubmissionAck, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(envelope.clone());
        Ok(SubmissionAck {
            message: "Quiz data saved successfully".to_string(),
        })
    }
}

struct RejectingSink {
    calls: AtomicUsize,
}

#[async_trait]
impl ResultSink for RejectingSink {
    async fn submit(
        &self,
        _envelope: &SubmissionEnvelope,
    ) -> Result<SubmissionAck, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SubmissionError::Rejected {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            message: "Error saving quiz data to database".to_string(),
        })
    }
}

fn settings(total_seconds: u32, question_count: usize) -> QuizSettings {
    QuizSettings {
        total_seconds,
        question_count,
        ..QuizSettings::default()
    }
}

fn service(
    settings: QuizSettings,
    source: Arc<dyn QuestionSource>,
    sink: Arc<dyn ResultSink>,
) -> ProctorService {
    ProctorService::new(settings, source, sink)
}

/// Drain notices until the session ends, returning everything it emitted.
async fn drain(mut handle: SessionHandle) -> Vec<SessionNotice> {
    let mut notices = Vec::new();
    while let Some(notice) = handle.next_notice().await {
        notices.push(notice);
    }
    notices
}

#[tokio::test(start_paused = true)]
async fn rapid_violations_disqualify_with_exactly_one_submission() {
    let sink = Arc::new(CountingSink::default());
    let svc = service(
        settings(120, 5),
        Arc::new(FixedSource::with_questions(8)),
        Arc::clone(&sink) as Arc<dyn ResultSink>,
    );

    let handle = svc.start(Identity::default(), None).await.unwrap();

    // Fire a burst past the threshold before the worker can drain any of it.
    for kind in [
        ViolationKind::FocusLoss,
        ViolationKind::FullscreenExit,
        ViolationKind::ContextMenu,
        ViolationKind::DevTools,
    ] {
        handle.command(SessionCommand::Violation(kind)).await;
    }

    let notices = drain(handle).await;

    let warnings: Vec<_> = notices
        .iter()
        .filter(|n| matches!(n, SessionNotice::Warning { .. }))
        .collect();
    assert_eq!(warnings.len(), 3);
    assert!(matches!(
        warnings[2],
        SessionNotice::Warning { sequence: 3, max_warnings: 3, .. }
    ));

    let finalized: Vec<_> = notices
        .iter()
        .filter_map(|n| match n {
            SessionNotice::Finalized {
                outcome,
                score,
                warning_count,
            } => Some((*outcome, *score, *warning_count)),
            _ => None,
        })
        .collect();
    assert_eq!(finalized, vec![(QuizOutcome::Disqualified, 0.0, 3)]);

    assert_eq!(sink.calls(), 1);
    let envelope = sink.last().unwrap();
    assert_eq!(envelope.user_name, "Anonymous");
    assert_eq!(envelope.user_id, "default-user");
    assert_eq!(envelope.json_data.status, QuizOutcome::Disqualified);
    assert_eq!(envelope.json_data.warning_count, 3);
    assert_eq!(envelope.json_data.score, None);
    assert!(envelope
        .json_data
        .reason
        .as_deref()
        .unwrap()
        .starts_with("Disqualified after 3 warnings."));
}

#[tokio::test(start_paused = true)]
async fn answer_flow_submits_once_even_with_duplicate_submit_commands() {
    let sink = Arc::new(CountingSink::default());
    let svc = service(
        settings(120, 5),
        Arc::new(FixedSource::with_questions(8)),
        Arc::clone(&sink) as Arc<dyn ResultSink>,
    );

    let handle = svc
        .start(Identity::new("Ada", "user-7"), Some("FullStack (Web)"))
        .await
        .unwrap();

    for position in 0..5 {
        handle
            .command(SessionCommand::SelectOption {
                position,
                label: OptionLabel::A,
            })
            .await;
        handle.command(SessionCommand::Advance).await;
    }
    handle.command(SessionCommand::Submit).await;
    // The session finalizes on the first submit; a duplicate is either
    // queued and never read or rejected outright.
    handle.command(SessionCommand::Submit).await;

    let notices = drain(handle).await;

    assert!(notices
        .iter()
        .any(|n| matches!(n, SessionNotice::ReviewStarted { timed_out: false })));
    assert!(notices.iter().any(|n| matches!(
        n,
        SessionNotice::Finalized {
            outcome: QuizOutcome::Passed,
            ..
        }
    )));

    assert_eq!(sink.calls(), 1);
    let envelope = sink.last().unwrap();
    assert_eq!(envelope.user_name, "Ada");
    assert_eq!(envelope.json_data.status, QuizOutcome::Passed);
    assert_eq!(envelope.json_data.score.as_deref(), Some("100.0"));
    assert_eq!(envelope.json_data.questions.len(), 5);
    assert!(envelope.json_data.questions.iter().all(|q| q.is_correct));
}

#[tokio::test(start_paused = true)]
async fn sampler_caps_the_attempt_at_the_configured_question_count() {
    let sink = Arc::new(CountingSink::default());
    let svc = service(
        settings(120, 5),
        Arc::new(FixedSource::with_questions(20)),
        Arc::clone(&sink) as Arc<dyn ResultSink>,
    );

    let mut handle = svc.start(Identity::default(), None).await.unwrap();

    match handle.next_notice().await.unwrap() {
        SessionNotice::Started {
            question_count,
            total_seconds,
            ..
        } => {
            assert_eq!(question_count, 5);
            assert_eq!(total_seconds, 120);
        }
        other => panic!("expected Started, got {other:?}"),
    }

    handle.finished().await;
}

#[tokio::test(start_paused = true)]
async fn timer_expiry_forces_review_exactly_once() {
    let sink = Arc::new(CountingSink::default());
    let svc = service(
        settings(3, 2),
        Arc::new(FixedSource::with_questions(2)),
        Arc::clone(&sink) as Arc<dyn ResultSink>,
    );

    let mut handle = svc.start(Identity::default(), None).await.unwrap();

    let mut ticks = Vec::new();
    loop {
        match handle.next_notice().await.unwrap() {
            SessionNotice::Started { total_seconds, .. } => {
                assert_eq!(total_seconds, 3);
            }
            SessionNotice::Tick {
                remaining_seconds, ..
            } => ticks.push(remaining_seconds),
            SessionNotice::ReviewStarted { timed_out } => {
                assert!(timed_out);
                break;
            }
            other => panic!("unexpected notice before expiry: {other:?}"),
        }
    }
    assert_eq!(ticks, vec![2, 1, 0]);

    handle.command(SessionCommand::Submit).await;
    let notices = drain(handle).await;

    // No ticks after review, and the attempt finalizes with no answers on
    // the permissive passing threshold.
    assert!(!notices
        .iter()
        .any(|n| matches!(n, SessionNotice::Tick { .. })));
    assert!(notices.iter().any(|n| matches!(
        n,
        SessionNotice::Finalized {
            outcome: QuizOutcome::Passed,
            ..
        }
    )));
    assert_eq!(sink.calls(), 1);
    assert_eq!(sink.last().unwrap().json_data.score.as_deref(), Some("0.0"));
}

#[tokio::test(start_paused = true)]
async fn tick_clock_renders_minutes_and_seconds() {
    let sink = Arc::new(CountingSink::default());
    let svc = service(
        settings(65, 1),
        Arc::new(FixedSource::with_questions(1)),
        Arc::clone(&sink) as Arc<dyn ResultSink>,
    );

    let mut handle = svc.start(Identity::default(), None).await.unwrap();

    // Started, then the first tick lands at 64 seconds remaining.
    assert!(matches!(
        handle.next_notice().await.unwrap(),
        SessionNotice::Started { .. }
    ));
    match handle.next_notice().await.unwrap() {
        SessionNotice::Tick {
            remaining_seconds,
            clock,
        } => {
            assert_eq!(remaining_seconds, 64);
            assert_eq!(clock, "1:04");
        }
        other => panic!("expected Tick, got {other:?}"),
    }

    handle.finished().await;
}

#[tokio::test(start_paused = true)]
async fn banner_expiry_is_noticed_after_review_starts() {
    let sink = Arc::new(CountingSink::default());
    let svc = service(
        settings(120, 2),
        Arc::new(FixedSource::with_questions(2)),
        Arc::clone(&sink) as Arc<dyn ResultSink>,
    );

    let mut handle = svc.start(Identity::default(), None).await.unwrap();

    // One warning, then straight to review: the per-second tick loop stops
    // there, so the banner can only be swept on later commands.
    handle
        .command(SessionCommand::Violation(ViolationKind::FocusLoss))
        .await;
    handle.command(SessionCommand::Advance).await;
    handle.command(SessionCommand::Advance).await;

    loop {
        match handle.next_notice().await.unwrap() {
            SessionNotice::ReviewStarted { timed_out } => {
                assert!(!timed_out);
                break;
            }
            SessionNotice::WarningHidden => panic!("banner hidden before its window lapsed"),
            _ => {}
        }
    }

    // Let the banner's visible window lapse with no ticks running.
    tokio::time::sleep(Duration::from_secs(4)).await;
    handle.command(SessionCommand::Submit).await;

    let notices = drain(handle).await;
    let hidden = notices
        .iter()
        .position(|n| matches!(n, SessionNotice::WarningHidden));
    let finalized = notices
        .iter()
        .position(|n| matches!(n, SessionNotice::Finalized { .. }));
    assert!(hidden.is_some());
    assert!(hidden < finalized);
    assert_eq!(sink.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_persistence_surfaces_a_notice_but_keeps_the_outcome() {
    let sink = Arc::new(RejectingSink {
        calls: AtomicUsize::new(0),
    });
    let svc = service(
        settings(120, 2),
        Arc::new(FixedSource::with_questions(2)),
        Arc::clone(&sink) as Arc<dyn ResultSink>,
    );

    let handle = svc.start(Identity::default(), None).await.unwrap();

    handle.command(SessionCommand::Advance).await;
    handle.command(SessionCommand::Advance).await;
    handle.command(SessionCommand::Submit).await;

    let notices = drain(handle).await;

    assert!(notices
        .iter()
        .any(|n| matches!(n, SessionNotice::Finalized { .. })));
    assert!(notices
        .iter()
        .any(|n| matches!(n, SessionNotice::SubmissionFailed { .. })));
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_question_pool_refuses_to_start() {
    let sink = Arc::new(CountingSink::default());
    let svc = service(
        settings(120, 5),
        Arc::new(FixedSource::empty()),
        Arc::clone(&sink) as Arc<dyn ResultSink>,
    );

    match svc.start(Identity::default(), None).await {
        Ok(_) => panic!("attempt started from an empty question pool"),
        Err(err) => assert!(matches!(err, FetchError::Empty { .. })),
    }
    assert_eq!(sink.calls(), 0);
}
