//! In-memory collaborators.
//!
//! They record every call so tests can assert on cue traffic, and they back
//! the CLI's `simulate` command. Each can be switched into a failing mode to
//! exercise the controller's error swallowing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::capabilities::{AudioCues, CueScheduler, ScheduledCue};
use crate::error::{CoreError, Result};
use crate::runtime::{Clock, Collaborators, ManualClock};
use crate::storage::MemoryRunStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    SegmentStart,
    CountdownBeep,
}

#[derive(Debug, Default)]
pub struct RecordingAudio {
    played: Mutex<Vec<AudioEvent>>,
    failing: AtomicBool,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn played(&self) -> Vec<AudioEvent> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn count(&self, event: AudioEvent) -> usize {
        self.played().iter().filter(|e| **e == event).count()
    }

    fn record(&self, event: AudioEvent) -> Result<()> {
        if let Ok(mut played) = self.played.lock() {
            played.push(event);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::Playback(format!("{event:?} unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl AudioCues for RecordingAudio {
    async fn play_segment_start(&self) -> Result<()> {
        self.record(AudioEvent::SegmentStart)
    }

    async fn play_countdown_beep(&self) -> Result<()> {
        self.record(AudioEvent::CountdownBeep)
    }
}

#[derive(Debug, Default)]
struct SchedulerLog {
    pending: Vec<(DateTime<Utc>, ScheduledCue)>,
    total_scheduled: usize,
    cancel_calls: usize,
    ongoing: Option<String>,
}

#[derive(Debug, Default)]
pub struct RecordingScheduler {
    log: Mutex<SchedulerLog>,
    failing: AtomicBool,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Cues scheduled since the last cancel.
    pub fn pending(&self) -> Vec<(DateTime<Utc>, ScheduledCue)> {
        self.log.lock().map(|l| l.pending.clone()).unwrap_or_default()
    }

    pub fn total_scheduled(&self) -> usize {
        self.log.lock().map(|l| l.total_scheduled).unwrap_or(0)
    }

    pub fn cancel_calls(&self) -> usize {
        self.log.lock().map(|l| l.cancel_calls).unwrap_or(0)
    }

    pub fn ongoing(&self) -> Option<String> {
        self.log.lock().ok().and_then(|l| l.ongoing.clone())
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::Scheduling(format!("{what} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl CueScheduler for RecordingScheduler {
    async fn schedule_cue(&self, at: DateTime<Utc>, cue: ScheduledCue) -> Result<()> {
        self.check("schedule")?;
        if let Ok(mut log) = self.log.lock() {
            log.pending.push((at, cue));
            log.total_scheduled += 1;
        }
        Ok(())
    }

    async fn cancel_all(&self) -> Result<()> {
        if let Ok(mut log) = self.log.lock() {
            log.cancel_calls += 1;
        }
        self.check("cancel")?;
        if let Ok(mut log) = self.log.lock() {
            log.pending.clear();
        }
        Ok(())
    }

    async fn show_ongoing(&self, text: &str) -> Result<()> {
        self.check("show ongoing")?;
        if let Ok(mut log) = self.log.lock() {
            log.ongoing = Some(text.to_string());
        }
        Ok(())
    }

    async fn hide_ongoing(&self) -> Result<()> {
        self.check("hide ongoing")?;
        if let Ok(mut log) = self.log.lock() {
            log.ongoing = None;
        }
        Ok(())
    }
}

/// A full set of recording collaborators sharing one manual clock.
pub struct Harness {
    pub audio: Arc<RecordingAudio>,
    pub scheduler: Arc<RecordingScheduler>,
    pub store: Arc<MemoryRunStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            audio: Arc::new(RecordingAudio::new()),
            scheduler: Arc::new(RecordingScheduler::new()),
            store: Arc::new(MemoryRunStore::new()),
            clock: Arc::new(ManualClock::new(start)),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            audio: self.audio.clone(),
            scheduler: self.scheduler.clone(),
            store: self.store.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
