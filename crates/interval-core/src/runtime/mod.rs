mod clock;
mod controller;
mod reconciler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{Collaborators, ControllerSettings, RunController};
pub use reconciler::{plan_background_cues, LifecycleReconciler, PlannedCue, Reconciliation};
