use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use super::clock::Clock;
use crate::capabilities::{AudioCues, CueScheduler, RunStore};
use crate::storage::{Config, PersistedRunConfig};
use crate::timer::{Cue, RunEngine, RunSnapshot, RunState, TickOutcome, Timeline};

/// External collaborators a controller drives.
#[derive(Clone)]
pub struct Collaborators {
    pub audio: Arc<dyn AudioCues>,
    pub scheduler: Arc<dyn CueScheduler>,
    pub store: Arc<dyn RunStore>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub tick_interval: Duration,
    pub ongoing_text: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            ongoing_text: config.notifications.ongoing_text.clone(),
        }
    }
}

/// What to do with the ticker task when a run stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TickerExit {
    Abort,
    /// The ticker itself observed completion and exits on its own.
    Detach,
}

pub(super) struct Inner {
    pub(super) engine: RunEngine,
    pub(super) ticker: Option<JoinHandle<()>>,
    /// Bumped for every spawned ticker; a ticker whose epoch is stale exits.
    pub(super) ticker_epoch: u64,
    /// Ticking handed off to the notification scheduler.
    pub(super) suspended: bool,
}

pub(super) struct Shared {
    pub(super) state: Mutex<Inner>,
    pub(super) collaborators: Collaborators,
    pub(super) settings: ControllerSettings,
    pub(super) snapshots: watch::Sender<RunSnapshot>,
}

/// Owns the run state and the periodic ticker.
///
/// Every operation takes the same async mutex, so start, tick, stop and the
/// lifecycle transitions never interleave. Cloning is cheap and yields a
/// handle to the same run.
#[derive(Clone)]
pub struct RunController {
    pub(super) shared: Arc<Shared>,
}

impl RunController {
    pub fn new(
        timeline: Arc<Timeline>,
        collaborators: Collaborators,
        settings: ControllerSettings,
    ) -> Self {
        let engine = RunEngine::new(timeline);
        let (snapshots, _) = watch::channel(engine.snapshot());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Inner {
                    engine,
                    ticker: None,
                    ticker_epoch: 0,
                    suspended: false,
                }),
                collaborators,
                settings,
                snapshots,
            }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> RunSnapshot {
        self.shared.state.lock().await.engine.snapshot()
    }

    pub async fn state(&self) -> RunState {
        self.shared.state.lock().await.engine.state().clone()
    }

    pub async fn is_running(&self) -> bool {
        self.shared.state.lock().await.engine.is_running()
    }

    /// Whether the local ticker is currently handed off to the scheduler.
    pub async fn is_suspended(&self) -> bool {
        self.shared.state.lock().await.suspended
    }

    /// Receives a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.shared.snapshots.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a run. A no-op returning the current snapshot when a run is
    /// already in progress.
    pub async fn start(&self) -> RunSnapshot {
        let mut inner = self.shared.state.lock().await;
        let now = self.shared.collaborators.clock.now();

        let Some(cue) = inner.engine.start(now) else {
            debug!("start ignored: run already in progress");
            return inner.engine.snapshot();
        };
        info!(started_at = %now, "run started");

        let config = PersistedRunConfig::new(now, inner.engine.timeline());
        if let Err(e) = self.shared.collaborators.store.save(&config).await {
            warn!("failed to persist run: {e}");
        }

        self.dispatch(cue);
        self.spawn_ticker(&mut inner);
        self.publish(&inner);
        inner.engine.snapshot()
    }

    /// Re-evaluate the run against the clock and fire any due cues.
    ///
    /// Called by the ticker; also safe to call directly.
    pub async fn tick(&self) -> TickOutcome {
        self.tick_from(None).await
    }

    /// Stop the run and clear everything it left behind. Idempotent.
    pub async fn stop(&self) {
        let mut inner = self.shared.state.lock().await;
        self.stop_locked(&mut inner, TickerExit::Abort).await;
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// `epoch` is set when the call comes from the ticker task itself.
    async fn tick_from(&self, epoch: Option<u64>) -> TickOutcome {
        let mut inner = self.shared.state.lock().await;
        if inner.suspended {
            return TickOutcome::Idle;
        }
        let own_ticker = match epoch {
            Some(epoch) if epoch != inner.ticker_epoch => return TickOutcome::Idle,
            Some(_) => true,
            None => false,
        };
        let now = self.shared.collaborators.clock.now();
        let outcome = inner.engine.tick(now);

        match &outcome {
            TickOutcome::Idle => {}
            TickOutcome::Finished => {
                info!("run completed");
                let exit = if own_ticker {
                    TickerExit::Detach
                } else {
                    TickerExit::Abort
                };
                self.stop_locked(&mut inner, exit).await;
            }
            TickOutcome::Progress(cues) => {
                for cue in cues {
                    self.dispatch(*cue);
                }
                self.publish(&inner);
            }
        }
        outcome
    }

    pub(super) async fn stop_locked(&self, inner: &mut Inner, exit: TickerExit) {
        if let Some(handle) = inner.ticker.take() {
            if exit == TickerExit::Abort {
                handle.abort();
            }
        }
        inner.suspended = false;
        if inner.engine.stop() {
            info!("run stopped");
        }

        let collaborators = &self.shared.collaborators;
        if let Err(e) = collaborators.store.clear().await {
            warn!("failed to clear persisted run: {e}");
        }
        if let Err(e) = collaborators.scheduler.cancel_all().await {
            warn!("failed to cancel scheduled cues: {e}");
        }
        if let Err(e) = collaborators.scheduler.hide_ongoing().await {
            warn!("failed to hide ongoing indicator: {e}");
        }
        self.publish(inner);
    }

    pub(super) fn spawn_ticker(&self, inner: &mut Inner) {
        if let Some(handle) = inner.ticker.take() {
            handle.abort();
        }

        inner.ticker_epoch += 1;
        let epoch = inner.ticker_epoch;
        let controller = self.clone();
        let period = self.shared.settings.tick_interval;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match controller.tick_from(Some(epoch)).await {
                    TickOutcome::Progress(_) => {}
                    TickOutcome::Idle | TickOutcome::Finished => break,
                }
            }
            debug!("ticker exited");
        });
        inner.ticker = Some(handle);
    }

    pub(super) fn publish(&self, inner: &Inner) {
        self.shared.snapshots.send_replace(inner.engine.snapshot());
    }

    /// Play a cue on a detached task; failures are logged and dropped.
    fn dispatch(&self, cue: Cue) {
        debug!(?cue, "cue");
        let audio = self.shared.collaborators.audio.clone();
        tokio::spawn(async move {
            let result = match cue {
                Cue::SegmentStart { .. } => audio.play_segment_start().await,
                Cue::CountdownBeep { .. } => audio.play_countdown_beep().await,
            };
            if let Err(e) = result {
                warn!(?cue, "audio cue failed: {e}");
            }
        });
    }
}
