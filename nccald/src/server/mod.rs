/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Poll scheduler: the repeating query → estimate → render → publish cycle.
//!
//! ```text
//!  PollScheduler (Idle)
//!       │ start()
//!       ▼
//!  RunningScheduler (Running) ── spawned loop: first poll ─► first-poll marker
//!       │                                      │
//!       │                                      └─► tick … tick … (one cycle at a time)
//!       │ stop()
//!       ▼
//!  (Stopping) ── loop leaves at its next wait point ─► (Stopped)
//! ```
//!
//! # Lifecycle decisions
//!
//! | Topic | Behaviour |
//! |---|---|
//! | Stop signal | `CancellationToken`, observed between cycles only |
//! | First poll marker | `oneshot`, consumed by at most one waiter |
//! | Double stop | impossible: `stop(self)` consumes the handle |
//! | Slow cycle | next tick is delayed, never overlapped (`MissedTickBehavior::Delay`) |
//! | Run once | `start` → wait for first poll → `stop`; same loop as the daemon |

pub mod error;

pub use error::ServerError;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::calendar::{build_events, render, CalendarMetadata};
use crate::config::{CalendarConfig, Config};
use crate::estimator::{compute_extra_info, EstimatePolicy};
use crate::publish::{
    CalDavClient, Credentials, FileTarget, PublishFailures, Publisher, RemoteTarget,
};
use crate::registry::{NameRegistry, NamecoinRpcClient};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Intervals below this are treated as misconfiguration.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Interval used instead of a rejected one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10 * 60);

// ── Types ─────────────────────────────────────────────────────────────────────

/// Static scheduler settings; read-only once the scheduler exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub policy: EstimatePolicy,
    pub interval: Duration,
    pub calendar_name: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&CalendarConfig::default())
    }
}

impl From<&CalendarConfig> for PollConfig {
    fn from(cfg: &CalendarConfig) -> Self {
        Self {
            policy: EstimatePolicy {
                margin: cfg.margin,
                quantum: cfg.quantum,
            },
            interval: cfg.query_interval,
            calendar_name: cfg.name.clone(),
        }
    }
}

/// Where the scheduler is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// What one poll cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The registry query failed; nothing was computed or published.
    QueryFailed,
    /// The calendar could not be rendered; nothing was published.
    RenderFailed,
    /// Every configured sink accepted the calendar (or none is configured).
    Published { names: usize },
    /// At least one sink failed.
    PublishFailed {
        names: usize,
        failures: PublishFailures,
    },
}

// ── PollScheduler ─────────────────────────────────────────────────────────────

/// An idle scheduler, ready to [`start`](Self::start).
pub struct PollScheduler {
    config: PollConfig,
    registry: Arc<dyn NameRegistry>,
    publisher: Arc<Publisher>,
    state: Arc<watch::Sender<SchedulerState>>,
    span: Span,
}

impl PollScheduler {
    /// Create an idle scheduler.
    ///
    /// An interval below [`MIN_POLL_INTERVAL`] is replaced by
    /// [`DEFAULT_POLL_INTERVAL`].
    pub fn new(
        mut config: PollConfig,
        registry: Arc<dyn NameRegistry>,
        publisher: Arc<Publisher>,
    ) -> Self {
        if config.interval < MIN_POLL_INTERVAL {
            warn!(
                configured = ?config.interval,
                "query interval too short, using {:?}",
                DEFAULT_POLL_INTERVAL
            );
            config.interval = DEFAULT_POLL_INTERVAL;
        }

        let (state, _) = watch::channel(SchedulerState::Idle);

        debug!("server instantiated");
        Self {
            config,
            registry,
            publisher,
            state: Arc::new(state),
            span: Span::none(),
        }
    }

    /// Build the production scheduler: JSON-RPC registry client plus the
    /// sinks named in `config`.
    ///
    /// # Errors
    /// Construction failures only; nothing is contacted yet.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let registry = NamecoinRpcClient::new(&config.rpc)?;

        let cal = &config.calendar;
        let mut publisher = Publisher::new(Arc::new(CalDavClient::new()?))
            .with_span(info_span!("publish"));

        if let Some(path) = &cal.ics_path {
            publisher = publisher.with_file(FileTarget::new(path));
        }
        if let Some(url) = &cal.caldav_url {
            let credentials = (!cal.caldav_username.is_empty()).then(|| Credentials {
                username: cal.caldav_username.clone(),
                password: cal.caldav_password.clone(),
            });
            publisher = publisher.with_remote(RemoteTarget {
                url: url.clone(),
                credentials,
            });
        }

        Ok(Self::new(
            PollConfig::from(cal),
            Arc::new(registry),
            Arc::new(publisher),
        )
        .with_span(info_span!("server")))
    }

    /// Span the poll loop runs under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Effective poll interval after the minimum-interval check.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Spawn the poll loop and return at once.
    ///
    /// The loop polls immediately, signals the first-poll marker, then polls
    /// on every tick until stopped.  Must be called inside a Tokio runtime.
    pub fn start(self) -> RunningScheduler {
        debug!("starting server...");

        let shutdown = CancellationToken::new();
        let (first_tx, first_rx) = oneshot::channel();
        let state = Arc::clone(&self.state);
        state.send_replace(SchedulerState::Running);

        let span = self.span.clone();
        let handle = tokio::spawn(self.poll_loop(shutdown.clone(), first_tx).instrument(span));

        RunningScheduler {
            shutdown,
            first_poll: Some(first_rx),
            state,
            handle,
        }
    }

    async fn poll_loop(self, shutdown: CancellationToken, first_poll: oneshot::Sender<()>) {
        debug!("performing initial poll...");
        self.poll_cycle().await;
        // Nobody waiting is fine.
        let _ = first_poll.send(());

        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.config.interval,
            self.config.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("shutting down poll loop");
                    break;
                }
                _ = ticker.tick() => {
                    debug!("poll interval expired, polling...");
                    self.poll_cycle().await;
                }
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
    }

    /// Run one cycle stamped with the current time.
    pub async fn poll_cycle(&self) -> CycleOutcome {
        self.poll_cycle_at(Utc::now()).await
    }

    /// Run one cycle: query, estimate, render, publish.
    ///
    /// Failures are logged here and returned as a [`CycleOutcome`]; they never
    /// stop the loop.
    pub async fn poll_cycle_at(&self, now: DateTime<Utc>) -> CycleOutcome {
        debug!("polling: retrieving names...");
        let records = match self.registry.list_names().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "could not list names");
                return CycleOutcome::QueryFailed;
            }
        };

        debug!(count = records.len(), "polling: checking names...");
        let extra = compute_extra_info(now, &records, &self.config.policy);
        let events = build_events(now, &records, &extra);

        let meta = CalendarMetadata::new(now).with_name(self.config.calendar_name.as_str());
        let artifact = match render(&events, &meta) {
            Ok(artifact) => artifact,
            Err(e) => {
                error!(error = %e, "could not render calendar");
                return CycleOutcome::RenderFailed;
            }
        };

        let names = records.len();
        match self.publisher.publish(now, &artifact).await {
            Ok(()) => {
                debug!(names, "polling completed");
                CycleOutcome::Published { names }
            }
            Err(failures) => {
                if let Some(e) = &failures.file {
                    error!(error = %e, "could not update ICS file");
                }
                if let Some(e) = &failures.remote {
                    error!(error = %e, "could not update CalDAV resources");
                }
                CycleOutcome::PublishFailed { names, failures }
            }
        }
    }
}

// ── RunningScheduler ──────────────────────────────────────────────────────────

/// Handle to a started scheduler.
pub struct RunningScheduler {
    shutdown: CancellationToken,
    first_poll: Option<oneshot::Receiver<()>>,
    state: Arc<watch::Sender<SchedulerState>>,
    handle: JoinHandle<()>,
}

impl RunningScheduler {
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver that follows state changes, including the final `Stopped`.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Resolve once the first poll cycle (including publishing) has finished.
    ///
    /// # Errors
    /// [`ServerError::FirstPollAlreadyAwaited`] on a second call;
    /// [`ServerError::FirstPollLost`] if the loop died before signalling.
    pub async fn wait_first_poll(&mut self) -> Result<(), ServerError> {
        let rx = self
            .first_poll
            .take()
            .ok_or(ServerError::FirstPollAlreadyAwaited)?;
        rx.await.map_err(|_| ServerError::FirstPollLost)
    }

    /// Signal the loop to exit and wait until it has.
    ///
    /// A cycle already in progress runs to completion first.
    pub async fn stop(self) -> Result<(), ServerError> {
        debug!("processing request to stop server...");
        self.state.send_replace(SchedulerState::Stopping);
        self.shutdown.cancel();

        let result = self.handle.await;
        self.state.send_replace(SchedulerState::Stopped);
        result?;

        info!("server stopped");
        Ok(())
    }
}

/// Publish exactly once and return.
///
/// Uses the ordinary loop: start, wait for the first poll, stop.
pub async fn run_once(scheduler: PollScheduler) -> Result<(), ServerError> {
    debug!("running one time only...");
    let mut running = scheduler.start();

    debug!("waiting for first poll to be completed...");
    running.wait_first_poll().await?;

    debug!("stopping...");
    running.stop().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::caldav::MockCalendarPut;
    use crate::publish::SinkError;
    use crate::registry::{MockNameRegistry, NameRecord, RegistryError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    // ── Test helpers ──────────────────────────────────────────────────────────

    fn sample_records() -> Vec<NameRecord> {
        vec![
            NameRecord::new("d/alpha", 500_000, 30_000, false),
            NameRecord::new("d/Beta", 480_000, 10_000, false),
        ]
    }

    /// Publisher with only a remote sink whose PUTs are counted.
    fn counting_publisher(puts: Arc<AtomicUsize>) -> Arc<Publisher> {
        let mut client = MockCalendarPut::new();
        client.expect_put().returning(move |_, _, _, _| {
            puts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        Arc::new(Publisher::new(Arc::new(client)).with_remote(RemoteTarget {
            url: "https://dav.example/cal.ics".into(),
            credentials: None,
        }))
    }

    fn config_with_interval(interval: Duration) -> PollConfig {
        PollConfig {
            interval,
            ..PollConfig::default()
        }
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn sub_second_interval_is_replaced() {
        let registry = Arc::new(MockNameRegistry::new());
        let publisher = counting_publisher(Arc::default());
        let s = PollScheduler::new(
            config_with_interval(Duration::from_millis(500)),
            registry,
            publisher,
        );
        assert_eq!(s.interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn one_second_interval_is_kept() {
        let s = PollScheduler::new(
            config_with_interval(Duration::from_secs(1)),
            Arc::new(MockNameRegistry::new()),
            counting_publisher(Arc::default()),
        );
        assert_eq!(s.interval(), Duration::from_secs(1));
    }

    // ── poll_cycle ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn query_failure_skips_publishing() {
        let mut registry = MockNameRegistry::new();
        registry
            .expect_list_names()
            .times(1)
            .returning(|| Err(RegistryError::EmptyResponse));
        let puts = Arc::new(AtomicUsize::new(0));

        let s = PollScheduler::new(
            PollConfig::default(),
            Arc::new(registry),
            counting_publisher(puts.clone()),
        );

        assert!(matches!(s.poll_cycle().await, CycleOutcome::QueryFailed));
        assert_eq!(puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn render_failure_skips_publishing() {
        let mut registry = MockNameRegistry::new();
        registry
            .expect_list_names()
            .returning(|| Ok(sample_records()));
        let puts = Arc::new(AtomicUsize::new(0));

        let config = PollConfig {
            calendar_name: "bad\u{1}name".into(),
            ..PollConfig::default()
        };
        let s = PollScheduler::new(config, Arc::new(registry), counting_publisher(puts.clone()));

        assert!(matches!(s.poll_cycle().await, CycleOutcome::RenderFailed));
        assert_eq!(puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn published_calendar_contains_every_name_in_order() {
        let mut registry = MockNameRegistry::new();
        registry
            .expect_list_names()
            .returning(|| Ok(sample_records()));

        let seen = Arc::new(std::sync::Mutex::new(String::new()));
        let sink = seen.clone();
        let mut client = MockCalendarPut::new();
        client.expect_put().times(1).returning(move |_, _, _, artifact| {
            *sink.lock().unwrap() = artifact.to_string();
            Ok(())
        });
        let publisher = Arc::new(Publisher::new(Arc::new(client)).with_remote(RemoteTarget {
            url: "https://dav.example/cal.ics".into(),
            credentials: None,
        }));

        let s = PollScheduler::new(PollConfig::default(), Arc::new(registry), publisher);
        let outcome = s.poll_cycle().await;

        assert!(matches!(outcome, CycleOutcome::Published { names: 2 }));
        let ics = seen.lock().unwrap().clone();
        let a = ics.find("UID:d_2falpha@nccald").unwrap();
        let b = ics.find("UID:d_2f_42eta@nccald").unwrap();
        assert!(a < b);
    }

    #[tokio::test]
    async fn sink_failure_is_reported_not_propagated() {
        let mut registry = MockNameRegistry::new();
        registry
            .expect_list_names()
            .returning(|| Ok(sample_records()));
        let mut client = MockCalendarPut::new();
        client
            .expect_put()
            .returning(|_, _, _, _| Err(SinkError::Status { status: 500 }));
        let publisher = Arc::new(Publisher::new(Arc::new(client)).with_remote(RemoteTarget {
            url: "https://dav.example/cal.ics".into(),
            credentials: None,
        }));

        let s = PollScheduler::new(PollConfig::default(), Arc::new(registry), publisher);
        match s.poll_cycle().await {
            CycleOutcome::PublishFailed { names, failures } => {
                assert_eq!(names, 2);
                assert!(failures.remote.is_some());
            }
            other => panic!("expected PublishFailed, got {other:?}"),
        }
    }

    // ── Loop lifecycle ────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn failed_query_on_second_tick_publishes_twice_in_three_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = MockNameRegistry::new();
        registry.expect_list_names().returning(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = tx.send(n);
            if n == 2 {
                Err(RegistryError::EmptyResponse)
            } else {
                Ok(sample_records())
            }
        });
        let puts = Arc::new(AtomicUsize::new(0));

        let s = PollScheduler::new(
            config_with_interval(Duration::from_secs(60)),
            Arc::new(registry),
            counting_publisher(puts.clone()),
        );
        let mut running = s.start();
        running.wait_first_poll().await.unwrap();

        while let Some(n) = rx.recv().await {
            if n == 3 {
                break;
            }
        }
        running.stop().await.unwrap();

        assert_eq!(puts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_once_completes_exactly_one_cycle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = MockNameRegistry::new();
        registry.expect_list_names().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(sample_records())
        });
        let puts = Arc::new(AtomicUsize::new(0));

        let s = PollScheduler::new(
            config_with_interval(Duration::from_secs(1)),
            Arc::new(registry),
            counting_publisher(puts.clone()),
        );
        run_once(s).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn state_moves_through_running_stopping_stopped() {
        let mut registry = MockNameRegistry::new();
        registry.expect_list_names().returning(|| Ok(Vec::new()));

        let s = PollScheduler::new(
            PollConfig::default(),
            Arc::new(registry),
            counting_publisher(Arc::default()),
        );
        let mut running = s.start();
        assert_eq!(running.state(), SchedulerState::Running);

        let watcher = running.subscribe();
        running.wait_first_poll().await.unwrap();
        running.stop().await.unwrap();

        assert_eq!(*watcher.borrow(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_marker_has_a_single_waiter() {
        let mut registry = MockNameRegistry::new();
        registry.expect_list_names().returning(|| Ok(Vec::new()));

        let s = PollScheduler::new(
            PollConfig::default(),
            Arc::new(registry),
            counting_publisher(Arc::default()),
        );
        let mut running = s.start();
        running.wait_first_poll().await.unwrap();
        assert!(matches!(
            running.wait_first_poll().await,
            Err(ServerError::FirstPollAlreadyAwaited)
        ));
        running.stop().await.unwrap();
    }
}
