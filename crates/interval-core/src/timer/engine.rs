//! Run engine.
//!
//! The run engine is a wall-clock-based state machine. It does not use
//! internal threads or perform I/O - every operation takes `now` and returns
//! the cues the caller has to fire. [`crate::runtime::RunController`] drives
//! it and performs the side effects.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle
//! ```
//!
//! Segment index and seconds remaining are outputs of
//! [`Timeline::resolve`], not states of their own.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = RunEngine::new(Arc::new(Timeline::standard()?));
//! let first_cue = engine.start(Utc::now());
//! // In a loop:
//! match engine.tick(Utc::now()) { ... }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::{Resolution, SegmentKind, Timeline};

/// Countdown beeps fire while this many seconds or fewer remain.
pub const BEEP_WINDOW_SECS: u64 = 3;

/// Mutable state of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub segment_index: usize,
    pub seconds_remaining: u64,
    /// Segment whose start cue already fired.
    pub last_announced_segment: Option<usize>,
    /// Remaining-seconds value whose beep already fired in this segment.
    pub last_announced_beep: Option<u64>,
}

impl RunState {
    pub fn idle(timeline: &Timeline) -> Self {
        Self {
            running: false,
            started_at: None,
            segment_index: 0,
            seconds_remaining: timeline.first_duration_secs(),
            last_announced_segment: None,
            last_announced_beep: None,
        }
    }
}

/// A cue the caller must play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cue {
    SegmentStart { index: usize, kind: SegmentKind },
    CountdownBeep { index: usize, seconds_remaining: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, or no start timestamp to measure from.
    Idle,
    /// Elapsed time passed the end of the timeline; the caller must stop.
    Finished,
    Progress(Vec<Cue>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    Idle,
    Finished,
    Resumed {
        index: usize,
        seconds_remaining: u64,
    },
}

/// Render-ready view of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub running: bool,
    pub segment_index: usize,
    pub segment_kind: SegmentKind,
    pub seconds_remaining: u64,
    pub set_number: u32,
    pub total_sets: u32,
    pub rep_number: u32,
    pub total_reps: u32,
    pub total_segments: usize,
    pub started_at: Option<DateTime<Utc>>,
}

impl RunSnapshot {
    /// `m:ss`, e.g. `1:15`.
    pub fn clock_display(&self) -> String {
        format_clock(self.seconds_remaining)
    }

    pub fn phase_label(&self) -> &'static str {
        self.segment_kind.label()
    }
}

pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Seconds between `start` and `now`, with millisecond precision.
pub fn elapsed_secs(start: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - start).num_milliseconds() as f64 / 1000.0
}

/// Core run state machine.
#[derive(Debug, Clone)]
pub struct RunEngine {
    timeline: Arc<Timeline>,
    state: RunState,
}

impl RunEngine {
    pub fn new(timeline: Arc<Timeline>) -> Self {
        let state = RunState::idle(&timeline);
        Self { timeline, state }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.state.started_at
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let index = self.state.segment_index;
        let kind = self
            .timeline
            .segment(index)
            .map(|s| s.kind)
            .unwrap_or(SegmentKind::Work);
        RunSnapshot {
            running: self.state.running,
            segment_index: index,
            segment_kind: kind,
            seconds_remaining: self.state.seconds_remaining,
            set_number: self.timeline.set_number(index),
            total_sets: self.timeline.sets(),
            rep_number: self.timeline.rep_number(index),
            total_reps: self.timeline.reps(),
            total_segments: self.timeline.len(),
            started_at: self.state.started_at,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a run at `now`. Returns the start cue for segment 0, or `None`
    /// when a run is already in progress.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Cue> {
        if self.state.running {
            return None;
        }
        let first = *self.timeline.segment(0)?;
        self.state = RunState {
            running: true,
            started_at: Some(now),
            segment_index: 0,
            seconds_remaining: first.duration_secs,
            last_announced_segment: Some(0),
            last_announced_beep: None,
        };
        Some(Cue::SegmentStart {
            index: 0,
            kind: first.kind,
        })
    }

    /// Re-evaluate the run at `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if !self.state.running {
            return TickOutcome::Idle;
        }
        let Some(started_at) = self.state.started_at else {
            return TickOutcome::Idle;
        };

        let (index, remaining) = match self.timeline.resolve(elapsed_secs(started_at, now)) {
            Resolution::Done => return TickOutcome::Finished,
            Resolution::Active {
                index,
                seconds_remaining,
            } => (index, seconds_remaining),
        };

        self.state.segment_index = index;
        self.state.seconds_remaining = remaining;

        let mut cues = Vec::new();

        if self.state.last_announced_segment != Some(index) {
            self.state.last_announced_segment = Some(index);
            self.state.last_announced_beep = None;
            let kind = self
                .timeline
                .segment(index)
                .map(|s| s.kind)
                .unwrap_or(SegmentKind::Work);
            cues.push(Cue::SegmentStart { index, kind });
        }

        if (1..=BEEP_WINDOW_SECS).contains(&remaining) {
            if self.state.last_announced_beep != Some(remaining) {
                self.state.last_announced_beep = Some(remaining);
                cues.push(Cue::CountdownBeep {
                    index,
                    seconds_remaining: remaining,
                });
            }
        } else if remaining > BEEP_WINDOW_SECS {
            self.state.last_announced_beep = None;
        }

        TickOutcome::Progress(cues)
    }

    /// Recompute position after a gap in ticking (e.g. the app was
    /// suspended). The resolved segment counts as already announced and the
    /// beep tracker is cleared, so nothing stale fires on the next tick.
    pub fn resync(&mut self, now: DateTime<Utc>) -> ResyncOutcome {
        if !self.state.running {
            return ResyncOutcome::Idle;
        }
        let Some(started_at) = self.state.started_at else {
            return ResyncOutcome::Idle;
        };

        match self.timeline.resolve(elapsed_secs(started_at, now)) {
            Resolution::Done => ResyncOutcome::Finished,
            Resolution::Active {
                index,
                seconds_remaining,
            } => {
                self.state.segment_index = index;
                self.state.seconds_remaining = seconds_remaining;
                self.state.last_announced_segment = Some(index);
                self.state.last_announced_beep = None;
                ResyncOutcome::Resumed {
                    index,
                    seconds_remaining,
                }
            }
        }
    }

    /// Reset to idle. Returns whether a run was in progress.
    pub fn stop(&mut self) -> bool {
        let was_running = self.state.running;
        self.state = RunState::idle(&self.timeline);
        was_running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn engine() -> RunEngine {
        RunEngine::new(Arc::new(Timeline::standard().unwrap()))
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn at(secs: f64) -> DateTime<Utc> {
        t0() + Duration::milliseconds((secs * 1000.0) as i64)
    }

    fn cues(outcome: TickOutcome) -> Vec<Cue> {
        match outcome {
            TickOutcome::Progress(cues) => cues,
            other => panic!("expected progress, got {other:?}"),
        }
    }

    #[test]
    fn idle_state_shows_first_segment() {
        let e = engine();
        assert!(!e.is_running());
        assert_eq!(e.state().segment_index, 0);
        assert_eq!(e.state().seconds_remaining, 10);
        assert_eq!(e.state().last_announced_segment, None);
    }

    #[test]
    fn start_announces_segment_zero_once() {
        let mut e = engine();
        let cue = e.start(t0());
        assert_eq!(
            cue,
            Some(Cue::SegmentStart {
                index: 0,
                kind: SegmentKind::Work
            })
        );
        assert!(cues(e.tick(at(0.5))).is_empty());
        assert!(e.start(at(1.0)).is_none());
    }

    #[test]
    fn tick_when_idle_is_noop() {
        let mut e = engine();
        assert_eq!(e.tick(at(3.0)), TickOutcome::Idle);
    }

    #[test]
    fn tick_without_start_timestamp_is_noop() {
        let mut e = engine();
        e.start(t0());
        e.state.started_at = None;
        assert_eq!(e.tick(at(3.0)), TickOutcome::Idle);
        assert_eq!(e.resync(at(3.0)), ResyncOutcome::Idle);
    }

    #[test]
    fn beeps_fire_once_per_value() {
        let mut e = engine();
        e.start(t0());
        assert!(cues(e.tick(at(6.5))).is_empty());
        assert_eq!(
            cues(e.tick(at(7.0))),
            vec![Cue::CountdownBeep {
                index: 0,
                seconds_remaining: 3
            }]
        );
        assert!(cues(e.tick(at(7.5))).is_empty());
        assert_eq!(cues(e.tick(at(8.0))).len(), 1);
        assert!(cues(e.tick(at(8.5))).is_empty());
        assert_eq!(cues(e.tick(at(9.0))).len(), 1);
        assert!(cues(e.tick(at(9.5))).is_empty());
    }

    #[test]
    fn new_segment_announces_and_resets_beeps() {
        let mut e = engine();
        e.start(t0());
        e.tick(at(9.5));
        assert_eq!(e.state().last_announced_beep, Some(1));
        assert_eq!(
            cues(e.tick(at(10.0))),
            vec![Cue::SegmentStart {
                index: 1,
                kind: SegmentKind::Rest
            }]
        );
        assert_eq!(e.state().last_announced_beep, None);
        assert_eq!(e.state().seconds_remaining, 20);
    }

    #[test]
    fn tick_past_the_end_reports_finished() {
        let mut e = engine();
        e.start(t0());
        assert_eq!(e.tick(at(180.0)), TickOutcome::Finished);
    }

    #[test]
    fn resync_adopts_segment_without_cues() {
        let mut e = engine();
        e.start(t0());
        let outcome = e.resync(at(38.2));
        assert_eq!(
            outcome,
            ResyncOutcome::Resumed {
                index: 2,
                seconds_remaining: 2
            }
        );
        assert_eq!(e.state().last_announced_segment, Some(2));
        assert_eq!(e.state().last_announced_beep, None);
        assert_eq!(e.resync(at(200.0)), ResyncOutcome::Finished);
    }

    #[test]
    fn stop_resets_to_idle() {
        let mut e = engine();
        e.start(t0());
        e.tick(at(45.0));
        assert!(e.stop());
        assert_eq!(e.state(), &RunState::idle(e.timeline()));
        assert!(!e.stop());
    }

    #[test]
    fn snapshot_reports_position() {
        let mut e = engine();
        e.start(t0());
        e.tick(at(95.0));
        let snap = e.snapshot();
        assert_eq!(snap.segment_index, 6);
        assert_eq!(snap.segment_kind, SegmentKind::Work);
        assert_eq!(snap.set_number, 2);
        assert_eq!(snap.rep_number, 1);
        assert_eq!(snap.clock_display(), "0:05");
        assert_eq!(snap.phase_label(), "WORK");
    }

    #[test]
    fn format_clock_pads_seconds() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(75), "1:15");
        assert_eq!(format_clock(600), "10:00");
    }
}
