//! Terminal-backed collaborators for the live `run` command.

use std::io::Write;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interval_core::error::Result;
use interval_core::{AudioCues, CoreError, CueScheduler, ScheduledCue};
use tracing::{debug, info};

/// Rings the terminal bell: once for a segment start, once per beep.
pub struct TerminalAudio;

impl TerminalAudio {
    fn bell(times: usize) -> Result<()> {
        let mut stderr = std::io::stderr().lock();
        for _ in 0..times {
            stderr
                .write_all(b"\x07")
                .map_err(|e| CoreError::Playback(e.to_string()))?;
        }
        stderr
            .flush()
            .map_err(|e| CoreError::Playback(e.to_string()))
    }
}

#[async_trait]
impl AudioCues for TerminalAudio {
    async fn play_segment_start(&self) -> Result<()> {
        Self::bell(2)
    }

    async fn play_countdown_beep(&self) -> Result<()> {
        Self::bell(1)
    }
}

/// Stands in for the OS notification service: logs what would be scheduled.
pub struct LoggingScheduler;

#[async_trait]
impl CueScheduler for LoggingScheduler {
    async fn schedule_cue(&self, at: DateTime<Utc>, cue: ScheduledCue) -> Result<()> {
        debug!(
            %at,
            channel = cue.channel_id(),
            silent = cue.is_silent_banner(),
            ?cue,
            "notification scheduled"
        );
        Ok(())
    }

    async fn cancel_all(&self) -> Result<()> {
        debug!("scheduled notifications cancelled");
        Ok(())
    }

    async fn show_ongoing(&self, text: &str) -> Result<()> {
        info!("ongoing: {text}");
        Ok(())
    }

    async fn hide_ongoing(&self) -> Result<()> {
        debug!("ongoing indicator hidden");
        Ok(())
    }
}
