//! Debounced draft saver.
//!
//! One [`DraftSaver`] is bound to one form. It owns the quiet-period
//! countdown, the in-flight flag and the form accessor, and runs as a single
//! tokio task:
//!
//! ```text
//! field_changed() ──► Command::FieldChanged ──► countdown.arm()
//!                                                    │ quiet period
//!                                                    ▼
//!                                   in flight? ── yes ──► drop trigger
//!                                        │ no
//!                                        ▼
//!                      snapshot ──► spawn endpoint.save() ──► Completion
//!                                                                 │
//! submit(intent) ──► Command::Submit ──► countdown.cancel()       ▼
//!                 │                                        SaveReport channel
//!                 ├─ idle:      issue immediately
//!                 └─ in flight: issue as soon as the current request completes
//! ```
//!
//! At most one request is in flight, and every snapshot is captured when its
//! request is issued, so requests reach the endpoint in increasing recency.
//! A save task that panics is reported as a network failure so the saver
//! never stays stuck in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn, Instrument};

use crate::countdown::Countdown;
use crate::endpoint::SaveEndpoint;
use crate::error::SaveError;
use crate::form::FormSource;
use crate::request::{FormId, SaveKind, SaveOutcome, SaveReport, SaveRequest, SubmitIntent};
use crate::validate;

/// Editing surface a form lives on. Each has its own default quiet period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Editor review screens
    Editor,
    /// Publisher authoring screens
    #[default]
    Publisher,
}

impl Surface {
    pub fn default_quiet_period(self) -> Duration {
        match self {
            Surface::Editor => Duration::from_secs(3),
            Surface::Publisher => Duration::from_secs(5),
        }
    }
}

/// Configuration for a single saver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaverConfig {
    /// Time without edits before an auto-save is issued
    pub quiet_period: Duration,

    /// Run the submit checks before sending an explicit submit
    pub validate_on_submit: bool,
}

impl SaverConfig {
    pub fn for_surface(surface: Surface) -> Self {
        Self {
            quiet_period: surface.default_quiet_period(),
            validate_on_submit: false,
        }
    }

    pub fn with_quiet_period(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            validate_on_submit: false,
        }
    }
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self::for_surface(Surface::default())
    }
}

/// Point-in-time counters for a saver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaverStats {
    /// Requests handed to the endpoint
    pub issued: u64,
    /// Quiet periods that elapsed while a request was in flight
    pub suppressed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    issued: AtomicU64,
    suppressed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn load(&self) -> SaverStats {
        SaverStats {
            issued: self.issued.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    FieldChanged,
    Submit(SubmitIntent),
}

/// Returned by the save task when the endpoint answers.
struct Completion {
    seq: u64,
    kind: SaveKind,
    outcome: SaveOutcome,
}

/// Receiving side of a saver's outcome notifications.
pub type SaveReports = mpsc::UnboundedReceiver<SaveReport>;

/// Handle to a running saver.
///
/// Dropping the handle stops the saver once any in-flight request completes.
pub struct DraftSaver {
    form_id: FormId,
    commands: mpsc::UnboundedSender<Command>,
    counters: Arc<Counters>,
    in_flight: Arc<AtomicBool>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl DraftSaver {
    /// Spawn a saver for one form.
    ///
    /// Returns the handle and the channel on which every save outcome is
    /// reported. `shutdown` stops the saver along with anything else bound to
    /// the same token.
    pub fn spawn<S, E>(
        source: S,
        endpoint: Arc<E>,
        config: SaverConfig,
        shutdown: CancellationToken,
    ) -> (Self, SaveReports)
    where
        S: FormSource,
        E: SaveEndpoint + 'static,
    {
        let form_id = FormId::new();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let in_flight = Arc::new(AtomicBool::new(false));
        let shutdown = shutdown.child_token();

        let worker = SaverTask {
            form_id,
            source,
            endpoint,
            countdown: Countdown::new(config.quiet_period),
            config,
            commands: commands_rx,
            reports: reports_tx,
            saves: JoinSet::new(),
            current: None,
            submit_pending: None,
            next_seq: 1,
            counters: counters.clone(),
            in_flight: in_flight.clone(),
        };

        let task = tokio::spawn(worker.run(shutdown.clone()));

        let saver = Self {
            form_id,
            commands: commands_tx,
            counters,
            in_flight,
            shutdown,
            task,
        };

        (saver, reports_rx)
    }

    pub fn form_id(&self) -> FormId {
        self.form_id
    }

    /// Record an edit. Restarts the quiet period.
    pub fn field_changed(&self) {
        self.send(Command::FieldChanged);
    }

    /// Save now, superseding any scheduled auto-save.
    pub fn submit(&self, intent: SubmitIntent) {
        self.send(Command::Submit(intent));
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SaverStats {
        self.counters.load()
    }

    /// Stop the saver, waiting for any in-flight request to be reported.
    ///
    /// A scheduled auto-save that has not fired yet is discarded.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!(form_id = %self.form_id, error = %e, "Saver task ended abnormally");
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!(form_id = %self.form_id, ?command, "Saver is no longer running, ignoring event");
        }
    }
}

/// The request currently awaiting an answer.
struct InFlight {
    seq: u64,
    kind: SaveKind,
    issued_at: tokio::time::Instant,
}

struct SaverTask<S, E> {
    form_id: FormId,
    source: S,
    endpoint: Arc<E>,
    config: SaverConfig,
    countdown: Countdown,
    commands: mpsc::UnboundedReceiver<Command>,
    reports: mpsc::UnboundedSender<SaveReport>,
    /// Holds the in-flight save task, if any
    saves: JoinSet<Completion>,
    current: Option<InFlight>,
    /// Latest submit received while a save was in flight
    submit_pending: Option<SubmitIntent>,
    next_seq: u64,
    counters: Arc<Counters>,
    in_flight: Arc<AtomicBool>,
}

impl<S, E> SaverTask<S, E>
where
    S: FormSource,
    E: SaveEndpoint + 'static,
{
    #[tracing::instrument(skip_all, fields(form_id = %self.form_id))]
    async fn run(mut self, shutdown: CancellationToken) {
        info!(quiet_period = ?self.config.quiet_period, "Draft saver started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Shutdown requested");
                    break;
                }

                Some(joined) = self.saves.join_next() => self.joined(joined),

                command = self.commands.recv() => match command {
                    Some(Command::FieldChanged) => {
                        trace!("Field changed, restarting quiet period");
                        self.countdown.arm();
                    }
                    Some(Command::Submit(intent)) => self.submit(intent),
                    None => {
                        debug!("Saver handle dropped");
                        break;
                    }
                },

                _ = self.countdown.elapsed(), if self.countdown.is_armed() => self.quiet_period_elapsed(),
            }
        }

        if self.countdown.cancel() {
            debug!("Discarding scheduled auto-save on shutdown");
        }

        // Completing may issue a deferred submit, so keep going until idle.
        while let Some(joined) = self.saves.join_next().await {
            self.joined(joined);
        }

        info!(stats = ?self.counters.load(), "Draft saver stopped");
    }

    fn quiet_period_elapsed(&mut self) {
        if let Some(current) = &self.current {
            self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
            debug!(in_flight_seq = current.seq, "Quiet period elapsed while a save is in flight, dropping auto-save");
            return;
        }

        self.issue(SaveKind::AutoSave);
    }

    fn submit(&mut self, intent: SubmitIntent) {
        if self.countdown.cancel() {
            debug!("Explicit submit supersedes scheduled auto-save");
        }

        if let Some(current) = &self.current {
            debug!(in_flight_seq = current.seq, ?intent, "Save in flight, submit will follow its completion");
            self.submit_pending = Some(intent);
            return;
        }

        self.issue(SaveKind::Submit(intent));
    }

    fn issue(&mut self, kind: SaveKind) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let snapshot = self.source.snapshot();

        if !kind.is_auto_save() && self.config.validate_on_submit {
            if let Err(errors) = validate::validate_for_submit(&snapshot) {
                debug!(seq, invalid_fields = errors.len(), "Submit refused by form checks");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                self.report(seq, kind, Err(SaveError::Invalid(errors)));
                return;
            }
        }

        let request = SaveRequest {
            form_id: self.form_id,
            seq,
            kind,
            snapshot,
        };

        self.current = Some(InFlight {
            seq,
            kind,
            issued_at: tokio::time::Instant::now(),
        });
        self.in_flight.store(true, Ordering::Release);
        self.counters.issued.fetch_add(1, Ordering::Relaxed);

        info!(seq, %kind, fields = request.snapshot.len(), "Issuing save");

        let endpoint = self.endpoint.clone();
        let span = tracing::info_span!("save", seq, %kind);
        self.saves.spawn(
            async move {
                let outcome = endpoint.save(&request).await;
                Completion {
                    seq: request.seq,
                    kind: request.kind,
                    outcome,
                }
            }
            .instrument(span),
        );
    }

    /// Turn a finished save task into a completion, even if it panicked.
    fn joined(&mut self, joined: Result<Completion, JoinError>) {
        let done = match joined {
            Ok(done) => done,
            Err(e) => {
                let Some(current) = &self.current else {
                    warn!(error = %e, "Save task failed with nothing in flight");
                    return;
                };
                warn!(seq = current.seq, error = %e, "Save task failed before the endpoint answered");
                Completion {
                    seq: current.seq,
                    kind: current.kind,
                    outcome: Err(SaveError::NetworkFailure {
                        message: format!("Save task failed: {e}"),
                    }),
                }
            }
        };
        self.complete(done);
    }

    fn complete(&mut self, done: Completion) {
        match self.current.take() {
            Some(current) if current.seq == done.seq => {
                debug!(
                    seq = done.seq,
                    kind = %current.kind,
                    elapsed_ms = current.issued_at.elapsed().as_millis() as u64,
                    "Save completed"
                );
            }
            other => {
                warn!(seq = done.seq, "Completion does not match the in-flight request");
                self.current = other;
                return;
            }
        }
        self.in_flight.store(false, Ordering::Release);

        match &done.outcome {
            Ok(ack) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                info!(seq = done.seq, saved_at = %ack.saved_at, "Draft saved");
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(seq = done.seq, error = %e, "Draft save failed");
            }
        }

        self.report(done.seq, done.kind, done.outcome);

        if let Some(intent) = self.submit_pending.take() {
            // The submit's snapshot covers any edits made while waiting.
            if self.countdown.cancel() {
                debug!("Deferred submit supersedes scheduled auto-save");
            }
            self.issue(SaveKind::Submit(intent));
        }
    }

    fn report(&self, seq: u64, kind: SaveKind, outcome: SaveOutcome) {
        let report = SaveReport {
            form_id: self.form_id,
            seq,
            kind,
            outcome,
        };
        if self.reports.send(report).is_err() {
            trace!(seq, "No one is listening for save reports");
        }
    }
}
