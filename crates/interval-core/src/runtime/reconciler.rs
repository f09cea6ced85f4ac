//! Foreground/background reconciliation.
//!
//! While the process is backgrounded the local ticker cannot be trusted to
//! run, so every remaining cue is handed to the notification scheduler as an
//! absolute instant. On return to the foreground those are cancelled and the
//! run is re-resolved from its start timestamp. The schedule is always
//! regenerated from scratch, never patched.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::controller::{RunController, TickerExit};
use crate::capabilities::{AppPhase, ScheduledCue};
use crate::timer::{ResyncOutcome, Timeline, BEEP_WINDOW_SECS};

/// A cue with the wall-clock instant it should sound at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCue {
    pub at: DateTime<Utc>,
    pub cue: ScheduledCue,
}

/// Every cue still ahead of `now` for a run that started at `started_at`.
///
/// Segment 0's start cue is never included; it sounds live when the run
/// starts. Beeps that would land on or before their segment's start are
/// skipped for segments shorter than the beep window.
pub fn plan_background_cues(
    timeline: &Timeline,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<PlannedCue> {
    let mut plan = Vec::new();
    let mut segment_start = started_at;

    for (index, segment) in timeline.segments().iter().enumerate() {
        let segment_end = segment_start + Duration::seconds(segment.duration_secs as i64);

        if index > 0 && segment_start > now {
            plan.push(PlannedCue {
                at: segment_start,
                cue: ScheduledCue::SegmentStart {
                    segment_index: index,
                    segment_kind: segment.kind,
                },
            });
        }

        for seconds_before in (1..=BEEP_WINDOW_SECS).rev() {
            let at = segment_end - Duration::seconds(seconds_before as i64);
            if at > now && at > segment_start {
                plan.push(PlannedCue {
                    at,
                    cue: ScheduledCue::CountdownBeep {
                        segment_index: index,
                        seconds_before,
                    },
                });
            }
        }

        segment_start = segment_end;
    }

    plan
}

impl RunController {
    /// Suspend local ticking and hand the remaining cues to the scheduler.
    ///
    /// The run stays logically running. Returns how many cues were planned;
    /// zero when idle.
    pub async fn enter_background(&self) -> usize {
        let mut inner = self.shared.state.lock().await;
        if !inner.engine.is_running() {
            return 0;
        }
        let Some(started_at) = inner.engine.started_at() else {
            return 0;
        };

        if let Some(handle) = inner.ticker.take() {
            handle.abort();
        }

        let scheduler = &self.shared.collaborators.scheduler;
        if inner.suspended {
            // Already handed off; replace the old schedule rather than add to it.
            if let Err(e) = scheduler.cancel_all().await {
                warn!("failed to cancel previous background cues: {e}");
            }
        }
        inner.suspended = true;

        let now = self.shared.collaborators.clock.now();
        let plan = plan_background_cues(inner.engine.timeline(), started_at, now);
        for planned in &plan {
            if let Err(e) = scheduler.schedule_cue(planned.at, planned.cue).await {
                warn!(cue = ?planned.cue, at = %planned.at, "failed to schedule cue: {e}");
            }
        }
        if let Err(e) = scheduler
            .show_ongoing(&self.shared.settings.ongoing_text)
            .await
        {
            warn!("failed to show ongoing indicator: {e}");
        }

        info!(scheduled = plan.len(), "ticking suspended for background");
        plan.len()
    }

    /// Cancel background cues, re-resolve from the start timestamp and
    /// resume ticking.
    pub async fn enter_foreground(&self) -> ResyncOutcome {
        let mut inner = self.shared.state.lock().await;
        if !inner.engine.is_running() {
            return ResyncOutcome::Idle;
        }

        let scheduler = &self.shared.collaborators.scheduler;
        if let Err(e) = scheduler.cancel_all().await {
            warn!("failed to cancel background cues: {e}");
        }
        if let Err(e) = scheduler.hide_ongoing().await {
            warn!("failed to hide ongoing indicator: {e}");
        }

        let now = self.shared.collaborators.clock.now();
        let outcome = inner.engine.resync(now);
        match outcome {
            ResyncOutcome::Finished => {
                info!("run finished while in background");
                self.stop_locked(&mut inner, TickerExit::Abort).await;
            }
            ResyncOutcome::Resumed {
                index,
                seconds_remaining,
            } => {
                info!(index, seconds_remaining, "resumed in foreground");
                inner.suspended = false;
                self.spawn_ticker(&mut inner);
                self.publish(&inner);
            }
            ResyncOutcome::Idle => {}
        }
        outcome
    }
}

/// Result of feeding one app phase to the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Ignored,
    Backgrounded { scheduled: usize },
    Foregrounded(ResyncOutcome),
}

/// Watches app phase changes for the lifetime of the process.
pub struct LifecycleReconciler {
    controller: RunController,
    previous: AppPhase,
}

impl LifecycleReconciler {
    pub fn new(controller: RunController, initial: AppPhase) -> Self {
        Self {
            controller,
            previous: initial,
        }
    }

    pub fn phase(&self) -> AppPhase {
        self.previous
    }

    /// Process one phase report.
    ///
    /// The phase is always recorded, but nothing happens while the
    /// controller is idle. Repeated `Active` reports resume only once.
    pub async fn handle(&mut self, next: AppPhase) -> Reconciliation {
        let previous = std::mem::replace(&mut self.previous, next);
        if !self.controller.is_running().await {
            return Reconciliation::Ignored;
        }

        match next {
            AppPhase::Background => Reconciliation::Backgrounded {
                scheduled: self.controller.enter_background().await,
            },
            AppPhase::Active if previous != AppPhase::Active => {
                Reconciliation::Foregrounded(self.controller.enter_foreground().await)
            }
            _ => Reconciliation::Ignored,
        }
    }

    /// Consume phase reports until the sender is dropped.
    pub async fn run(mut self, mut phases: mpsc::Receiver<AppPhase>) {
        while let Some(phase) = phases.recv().await {
            let result = self.handle(phase).await;
            debug!(?phase, ?result, "app phase");
        }
        debug!("lifecycle source closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn secs(s: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(s)
    }

    #[test]
    fn plan_from_start_covers_whole_run() {
        let timeline = Timeline::standard().unwrap();
        let plan = plan_background_cues(&timeline, t0(), t0());
        let starts = plan
            .iter()
            .filter(|p| matches!(p.cue, ScheduledCue::SegmentStart { .. }))
            .count();
        let beeps = plan.len() - starts;
        assert_eq!(starts, 11);
        assert_eq!(beeps, 36);
        assert!(plan.iter().all(|p| p.at > t0()));
    }

    #[test]
    fn plan_skips_past_cues() {
        let timeline = Timeline::standard().unwrap();
        // 8.5s in: beep at 9s (1 before end of segment 0) is still ahead.
        let now = t0() + Duration::milliseconds(8_500);
        let plan = plan_background_cues(&timeline, t0(), now);
        assert_eq!(
            plan[0],
            PlannedCue {
                at: secs(9),
                cue: ScheduledCue::CountdownBeep {
                    segment_index: 0,
                    seconds_before: 1
                }
            }
        );
        assert_eq!(plan[1].at, secs(10));
        assert!(matches!(
            plan[1].cue,
            ScheduledCue::SegmentStart {
                segment_index: 1,
                ..
            }
        ));
    }

    #[test]
    fn plan_is_time_ordered() {
        let timeline = Timeline::standard().unwrap();
        let plan = plan_background_cues(&timeline, t0(), secs(42));
        assert!(plan.windows(2).all(|w| w[0].at < w[1].at));
    }

    #[test]
    fn short_segments_only_beep_inside_themselves() {
        let timeline = Timeline::build(2, 1, 1, 1).unwrap();
        let plan = plan_background_cues(&timeline, t0(), t0());
        let beeps: Vec<_> = plan
            .iter()
            .filter_map(|p| match p.cue {
                ScheduledCue::CountdownBeep {
                    segment_index,
                    seconds_before,
                } => Some((segment_index, seconds_before)),
                _ => None,
            })
            .collect();
        // Work 0..2 only has room for the 1s-before beep; the rest segment
        // 2..3 has room for none.
        assert_eq!(beeps, vec![(0, 1)]);
    }

    #[test]
    fn plan_after_end_is_empty() {
        let timeline = Timeline::standard().unwrap();
        assert!(plan_background_cues(&timeline, t0(), secs(180)).is_empty());
    }
}
