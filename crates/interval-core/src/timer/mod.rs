mod engine;
mod schedule;

pub use engine::{
    elapsed_secs, format_clock, Cue, ResyncOutcome, RunEngine, RunSnapshot, RunState,
    TickOutcome, BEEP_WINDOW_SECS,
};
pub use schedule::{
    Resolution, Segment, SegmentKind, Timeline, REPS, REST_DURATION_SECS, SETS,
    WORK_DURATION_SECS,
};
