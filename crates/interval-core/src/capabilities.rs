//! Collaborator contracts the core consumes.
//!
//! Audio playback, OS notification scheduling and durable storage live
//! outside the core. Implementations report failures through
//! [`CoreError`](crate::error::CoreError); the run controller logs and
//! discards them so the countdown keeps running.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::PersistedRunConfig;
use crate::timer::SegmentKind;

/// Notification channel for segment-start sounds.
pub const START_CHANNEL_ID: &str = "timer-start";
/// Notification channel for countdown beeps.
pub const BEEP_CHANNEL_ID: &str = "timer-beeps";
/// Notification channel for the low-priority "timer running" indicator.
pub const ONGOING_CHANNEL_ID: &str = "timer-ongoing";

/// OS-level app state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppPhase {
    Active,
    Background,
    Inactive,
}

/// A cue handed to the notification scheduler while the app is backgrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduledCue {
    SegmentStart {
        segment_index: usize,
        segment_kind: SegmentKind,
    },
    CountdownBeep {
        segment_index: usize,
        seconds_before: u64,
    },
}

impl ScheduledCue {
    pub fn channel_id(&self) -> &'static str {
        match self {
            ScheduledCue::SegmentStart { .. } => START_CHANNEL_ID,
            ScheduledCue::CountdownBeep { .. } => BEEP_CHANNEL_ID,
        }
    }

    /// Beeps are sound-only; segment starts may show a banner.
    pub fn is_silent_banner(&self) -> bool {
        matches!(self, ScheduledCue::CountdownBeep { .. })
    }
}

/// Short audio cues played while the app is in the foreground.
///
/// Calls must be cheap to repeat; the controller never awaits them on the
/// tick path.
#[async_trait]
pub trait AudioCues: Send + Sync {
    async fn play_segment_start(&self) -> Result<()>;

    async fn play_countdown_beep(&self) -> Result<()>;
}

/// Absolute-time notifications that keep cues sounding while the process
/// is suspended.
#[async_trait]
pub trait CueScheduler: Send + Sync {
    async fn schedule_cue(&self, at: DateTime<Utc>, cue: ScheduledCue) -> Result<()>;

    async fn cancel_all(&self) -> Result<()>;

    async fn show_ongoing(&self, text: &str) -> Result<()>;

    async fn hide_ongoing(&self) -> Result<()>;
}

/// Durable home of the running timer's start instant.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn save(&self, config: &PersistedRunConfig) -> Result<()>;

    async fn load(&self) -> Result<Option<PersistedRunConfig>>;

    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_channels() {
        let start = ScheduledCue::SegmentStart {
            segment_index: 1,
            segment_kind: SegmentKind::Rest,
        };
        let beep = ScheduledCue::CountdownBeep {
            segment_index: 1,
            seconds_before: 2,
        };
        assert_eq!(start.channel_id(), "timer-start");
        assert_eq!(beep.channel_id(), "timer-beeps");
        assert!(beep.is_silent_banner());
        assert!(!start.is_silent_banner());
    }

    #[test]
    fn scheduled_cue_metadata_is_tagged() {
        let beep = ScheduledCue::CountdownBeep {
            segment_index: 4,
            seconds_before: 3,
        };
        let value = serde_json::to_value(beep).unwrap();
        assert_eq!(value["type"], "countdown_beep");
        assert_eq!(value["seconds_before"], 3);
    }
}
