use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::QuizSettings;
use crate::metrics::{QUIZ_ATTEMPTS_TOTAL, QUIZ_SUBMISSIONS_TOTAL, QUIZ_VIOLATIONS_TOTAL};
use crate::models::result::{QuizOutcome, SubmissionEnvelope};
use crate::models::{Identity, OptionLabel};
use crate::quiz::attempt::{Attempt, AttemptPhase, QuizRules};
use crate::quiz::monitor::{ViolationKind, WarningBanner};
use crate::quiz::sampler::sample_questions;
use crate::services::question_service::{FetchError, QuestionSource};
use crate::services::submission_service::ResultSink;
use crate::utils::time::format_clock;

/// Commands the presentation layer sends into a running session.
#[derive(Debug, Clone, Copy)]
pub enum SessionCommand {
    SelectOption { position: usize, label: OptionLabel },
    Advance,
    Retreat,
    Submit,
    Violation(ViolationKind),
}

/// Notices the session emits for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    Started {
        attempt_id: String,
        question_count: usize,
        total_seconds: u32,
    },
    Tick {
        remaining_seconds: u32,
        clock: String,
    },
    Warning {
        sequence: u32,
        max_warnings: u32,
        message: String,
        visible_for_seconds: u64,
    },
    WarningHidden,
    ReviewStarted {
        timed_out: bool,
    },
    Finalized {
        outcome: QuizOutcome,
        score: f64,
        warning_count: u32,
    },
    SubmissionFailed {
        error: String,
    },
}

/// Handle held by the presentation layer. Dropping it (or awaiting
/// `finished`) lets the worker drain and exit.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    notices: mpsc::UnboundedReceiver<SessionNotice>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Returns false once the session has finalized and stopped listening.
    pub async fn command(&self, command: SessionCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub async fn next_notice(&mut self) -> Option<SessionNotice> {
        self.notices.recv().await
    }

    pub async fn finished(self) {
        drop(self.commands);
        let _ = self.task.await;
    }
}

/// Orchestrates one proctored attempt: fetch, sample, then run the attempt
/// behind a single mailbox so user input, timer ticks and violation signals
/// never mutate shared state concurrently.
pub struct ProctorService {
    settings: QuizSettings,
    source: Arc<dyn QuestionSource>,
    sink: Arc<dyn ResultSink>,
}

impl ProctorService {
    pub fn new(
        settings: QuizSettings,
        source: Arc<dyn QuestionSource>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            settings,
            source,
            sink,
        }
    }

    /// Fetch and sample the question set, then spawn the session worker.
    /// A fetch failure (including an empty pool) halts attempt start; no
    /// partial attempt is created.
    pub async fn start(
        &self,
        identity: Identity,
        role: Option<&str>,
    ) -> Result<SessionHandle, FetchError> {
        let role = role.unwrap_or(&self.settings.default_role).to_string();
        let pool = self.source.fetch(&role).await?;
        let sampled = sample_questions(&mut rand::rng(), pool, self.settings.question_count);

        let rules = QuizRules {
            passing_percent: self.settings.passing_percent,
            max_warnings: self.settings.max_warnings,
        };
        let attempt =
            Attempt::new(sampled, rules).map_err(|_| FetchError::Empty { role: role.clone() })?;

        tracing::info!(
            "Attempt {} started: role={}, questions={}, total_seconds={}",
            attempt.id(),
            role,
            attempt.len(),
            self.settings.total_seconds
        );
        QUIZ_ATTEMPTS_TOTAL.with_label_values(&["started"]).inc();

        let (command_tx, command_rx) = mpsc::channel(64);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let worker = SessionWorker {
            attempt,
            identity,
            settings: self.settings.clone(),
            sink: Arc::clone(&self.sink),
            notices: notice_tx,
            banner: WarningBanner::default(),
            banner_visible: false,
        };
        let task = tokio::spawn(worker.run(command_rx));

        Ok(SessionHandle {
            commands: command_tx,
            notices: notice_rx,
            task,
        })
    }
}

struct SessionWorker {
    attempt: Attempt,
    identity: Identity,
    settings: QuizSettings,
    sink: Arc<dyn ResultSink>,
    notices: mpsc::UnboundedSender<SessionNotice>,
    banner: WarningBanner,
    banner_visible: bool,
}

impl SessionWorker {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; consume it so the countdown
        // starts one full second from now.
        interval.tick().await;

        let mut remaining = self.settings.total_seconds;

        self.notify(SessionNotice::Started {
            attempt_id: self.attempt.id().to_string(),
            question_count: self.attempt.len(),
            total_seconds: remaining,
        });

        loop {
            tokio::select! {
                _ = interval.tick(), if self.attempt.phase() == AttemptPhase::InProgress && remaining > 0 => {
                    remaining -= 1;
                    self.notify(SessionNotice::Tick {
                        remaining_seconds: remaining,
                        clock: format_clock(remaining),
                    });
                    self.sweep_banner();
                    if remaining == 0 && self.attempt.time_expired() {
                        tracing::info!("Attempt {} timed out, forcing review", self.attempt.id());
                        self.notify(SessionNotice::ReviewStarted { timed_out: true });
                    }
                }
                command = commands.recv() => {
                    match command {
                        None => break,
                        Some(command) => {
                            // Ticks stop outside InProgress, so an expired
                            // banner must also be swept here.
                            self.sweep_banner();
                            if self.handle(command).await {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Apply one command. Returns true once the attempt is finalized and the
    /// session should stop (which also drops the timer and all listeners).
    async fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::SelectOption { position, label } => {
                if let Err(e) = self.attempt.select_option(position, label) {
                    tracing::warn!("Ignoring selection: {}", e);
                }
            }
            SessionCommand::Advance => match self.attempt.advance() {
                Ok(AttemptPhase::AwaitingReview) => {
                    self.notify(SessionNotice::ReviewStarted { timed_out: false });
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Ignoring advance: {}", e),
            },
            SessionCommand::Retreat => {
                if let Err(e) = self.attempt.retreat() {
                    tracing::warn!("Ignoring retreat: {}", e);
                }
            }
            SessionCommand::Submit => match self.attempt.submit() {
                Ok(()) => {
                    self.finalize().await;
                    return true;
                }
                Err(e) => tracing::warn!("Ignoring submit: {}", e),
            },
            SessionCommand::Violation(kind) => {
                if let Some(warning) = self.attempt.record_violation(kind) {
                    QUIZ_VIOLATIONS_TOTAL
                        .with_label_values(&[kind.as_label()])
                        .inc();
                    tracing::warn!(
                        "Violation detected: attempt={}, kind={}, warning {}/{}",
                        self.attempt.id(),
                        kind.as_label(),
                        warning.sequence,
                        self.settings.max_warnings
                    );
                    let message = warning.banner_message(self.settings.max_warnings);
                    self.banner.show(
                        warning,
                        Instant::now(),
                        Duration::from_secs(self.settings.warning_visible_seconds),
                    );
                    self.banner_visible = true;
                    self.notify(SessionNotice::Warning {
                        sequence: self.attempt.warning_count(),
                        max_warnings: self.settings.max_warnings,
                        message,
                        visible_for_seconds: self.settings.warning_visible_seconds,
                    });
                    if self.attempt.is_finalized() {
                        self.finalize().await;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Report the outcome and hand the result to the sink. `take_result`
    /// yields at most once, so no path can double-submit.
    async fn finalize(&mut self) {
        let outcome = self.attempt.outcome();
        let score = self.attempt.score();

        QUIZ_ATTEMPTS_TOTAL
            .with_label_values(&["finalized"])
            .inc();
        self.notify(SessionNotice::Finalized {
            outcome,
            score,
            warning_count: self.attempt.warning_count(),
        });

        let Some(result) = self.attempt.take_result() else {
            return;
        };
        let envelope = SubmissionEnvelope {
            user_name: self.identity.user_name.clone(),
            user_id: self.identity.user_id.clone(),
            json_data: result,
        };

        match self.sink.submit(&envelope).await {
            Ok(ack) => {
                QUIZ_SUBMISSIONS_TOTAL
                    .with_label_values(&[outcome.as_label(), "ok"])
                    .inc();
                tracing::info!(
                    "Attempt {} submitted: outcome={:?}, ack={}",
                    self.attempt.id(),
                    outcome,
                    ack.message
                );
            }
            Err(e) => {
                // Local finalization stands even when remote persistence fails.
                QUIZ_SUBMISSIONS_TOTAL
                    .with_label_values(&[outcome.as_label(), "error"])
                    .inc();
                tracing::error!("Attempt {} submission failed: {}", self.attempt.id(), e);
                self.notify(SessionNotice::SubmissionFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    fn sweep_banner(&mut self) {
        if self.banner_visible && self.banner.visible(Instant::now()).is_none() {
            self.banner_visible = false;
            self.notify(SessionNotice::WarningHidden);
        }
    }

    fn notify(&self, notice: SessionNotice) {
        // The receiver may have been dropped by a disinterested caller.
        let _ = self.notices.send(notice);
    }
}
