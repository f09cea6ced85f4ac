//! # Interval Timer Core Library
//!
//! This library provides the core logic for a work/rest interval timer that
//! keeps its countdown and cues consistent while the host app moves between
//! foreground and background.
//!
//! ## Architecture
//!
//! - **Segment Model**: the fixed work/rest [`Timeline`] and the single
//!   time-to-state function [`Timeline::resolve`]
//! - **Run Engine**: a wall-clock-based state machine; the caller supplies
//!   `now` and plays the cues it returns
//! - **Run Controller**: async owner of the engine, the ticker task and the
//!   side effects
//! - **Lifecycle Reconciler**: hands cues to the notification scheduler on
//!   backgrounding and resynchronizes on return
//!
//! ## Key Components
//!
//! - [`RunController`]: start/tick/stop and background/foreground handling
//! - [`LifecycleReconciler`]: app phase subscriber
//! - [`AudioCues`], [`CueScheduler`], [`RunStore`]: collaborator contracts
//! - [`Config`]: host configuration

pub mod capabilities;
pub mod error;
pub mod runtime;
pub mod storage;
pub mod testing;
pub mod timer;

pub use capabilities::{AppPhase, AudioCues, CueScheduler, RunStore, ScheduledCue};
pub use error::{ConfigError, CoreError};
pub use runtime::{
    plan_background_cues, Clock, Collaborators, ControllerSettings, LifecycleReconciler,
    ManualClock, PlannedCue, Reconciliation, RunController, SystemClock,
};
pub use storage::{Config, JsonFileRunStore, MemoryRunStore, PersistedRunConfig};
pub use timer::{
    Cue, Resolution, ResyncOutcome, RunEngine, RunSnapshot, RunState, Segment, SegmentKind,
    TickOutcome, Timeline,
};
