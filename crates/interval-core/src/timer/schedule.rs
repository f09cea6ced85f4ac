//! Segment timeline.
//!
//! A [`Timeline`] is the flat list of work/rest segments for a whole run,
//! built from four fixed constants. [`Timeline::resolve`] is the only place
//! elapsed time is turned into "which segment, how much remains".

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Work segment length in seconds.
pub const WORK_DURATION_SECS: u64 = 10;
/// Rest segment length in seconds.
pub const REST_DURATION_SECS: u64 = 20;
/// Work/rest pairs per set.
pub const REPS: u32 = 3;
/// Number of sets in a run.
pub const SETS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Work,
    Rest,
}

impl SegmentKind {
    pub fn label(&self) -> &'static str {
        match self {
            SegmentKind::Work => "WORK",
            SegmentKind::Rest => "REST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    /// Duration in seconds.
    #[serde(rename = "duration")]
    pub duration_secs: u64,
}

/// Where a given elapsed time falls on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Active {
        index: usize,
        /// Whole seconds left, rounded up.
        seconds_remaining: u64,
    },
    /// Elapsed time reached the end of the last segment.
    Done,
}

impl Resolution {
    pub fn is_done(&self) -> bool {
        matches!(self, Resolution::Done)
    }
}

/// Ordered, non-empty segment list for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    segments: Vec<Segment>,
    reps: u32,
    sets: u32,
}

impl Timeline {
    /// Build `sets * reps` work/rest pairs.
    ///
    /// Every parameter must be positive; a zero is reported as
    /// [`CoreError::InvalidConfig`] naming the offending field.
    pub fn build(work_secs: u64, rest_secs: u64, reps: u32, sets: u32) -> Result<Self> {
        let checks: [(&'static str, u64); 4] = [
            ("work_duration", work_secs),
            ("rest_duration", rest_secs),
            ("reps", u64::from(reps)),
            ("sets", u64::from(sets)),
        ];
        if let Some(&(field, value)) = checks.iter().find(|(_, v)| *v == 0) {
            return Err(CoreError::InvalidConfig { field, value });
        }

        let mut segments = Vec::with_capacity(sets as usize * reps as usize * 2);
        for _ in 0..sets {
            for _ in 0..reps {
                segments.push(Segment {
                    kind: SegmentKind::Work,
                    duration_secs: work_secs,
                });
                segments.push(Segment {
                    kind: SegmentKind::Rest,
                    duration_secs: rest_secs,
                });
            }
        }

        Ok(Self {
            segments,
            reps,
            sets,
        })
    }

    /// The timeline every run uses.
    pub fn standard() -> Result<Self> {
        Self::build(WORK_DURATION_SECS, REST_DURATION_SECS, REPS, SETS)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; construction rejects empty timelines.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    pub fn sets(&self) -> u32 {
        self.sets
    }

    /// Duration of the first segment, i.e. what an idle display shows.
    pub fn first_duration_secs(&self) -> u64 {
        self.segments.first().map(|s| s.duration_secs).unwrap_or(0)
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.segments.iter().map(|s| s.duration_secs).sum()
    }

    /// Cumulative seconds before `index` starts.
    pub fn segment_start_offset(&self, index: usize) -> u64 {
        self.segments
            .iter()
            .take(index)
            .map(|s| s.duration_secs)
            .sum()
    }

    /// 1-based set number containing `index`.
    pub fn set_number(&self, index: usize) -> u32 {
        let per_set = self.reps as usize * 2;
        (index / per_set) as u32 + 1
    }

    /// 1-based rep number within its set.
    pub fn rep_number(&self, index: usize) -> u32 {
        let per_set = self.reps as usize * 2;
        ((index % per_set) / 2) as u32 + 1
    }

    /// Resolve elapsed seconds since the run started.
    ///
    /// Negative or NaN input is clamped to zero so a clock that stepped
    /// backwards still lands on the first segment.
    pub fn resolve(&self, elapsed_secs: f64) -> Resolution {
        let elapsed = if elapsed_secs.is_nan() {
            0.0
        } else {
            elapsed_secs.max(0.0)
        };

        let mut segment_end = 0u64;
        for (index, segment) in self.segments.iter().enumerate() {
            segment_end += segment.duration_secs;
            if elapsed < segment_end as f64 {
                let seconds_remaining = (segment_end as f64 - elapsed).ceil() as u64;
                return Resolution::Active {
                    index,
                    seconds_remaining,
                };
            }
        }
        Resolution::Done
    }
}
