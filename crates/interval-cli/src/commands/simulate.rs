use std::sync::Arc;
use std::time::Duration as StdDuration;

use clap::Args;
use interval_core::testing::Harness;
use interval_core::timer::{elapsed_secs, format_clock};
use interval_core::{
    AppPhase, Config, ControllerSettings, Cue, LifecycleReconciler, Reconciliation,
    RunController, TickOutcome, Timeline,
};
use serde_json::json;

/// Far longer than any simulated run; ticks are driven by the loop below.
const MANUAL_TICK_INTERVAL: StdDuration = StdDuration::from_secs(24 * 60 * 60);

#[derive(Args)]
pub struct SimulateArgs {
    /// Simulated milliseconds between ticks
    #[arg(long, default_value_t = 500)]
    pub step_ms: u64,
    /// Background the app this many seconds into the run
    #[arg(long)]
    pub background_at: Option<f64>,
    /// Foreground the app again this many seconds into the run
    #[arg(long)]
    pub foreground_at: Option<f64>,
}

pub fn run(args: SimulateArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if args.step_ms == 0 {
        return Err("--step-ms must be greater than zero".into());
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(simulate(args, config))
}

async fn simulate(args: SimulateArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let timeline = Arc::new(Timeline::standard()?);
    let start = chrono::Utc::now();
    let harness = Harness::new(start);
    let settings = ControllerSettings {
        tick_interval: MANUAL_TICK_INTERVAL,
        ..ControllerSettings::from(config)
    };
    let controller = RunController::new(timeline.clone(), harness.collaborators(), settings);
    let mut reconciler = LifecycleReconciler::new(controller.clone(), AppPhase::Active);

    let snap = controller.start().await;
    println!("{:>7.1}s  start  {} {}", 0.0, snap.phase_label(), snap.clock_display());

    let mut background_at = args.background_at;
    let mut foreground_at = args.foreground_at;
    // Stop well past the end in case the run is left suspended.
    let horizon = timeline.total_duration_secs() as f64 + 60.0;

    loop {
        harness
            .clock
            .advance(chrono::Duration::milliseconds(args.step_ms as i64));
        let elapsed = elapsed_secs(start, harness.now());

        if background_at.is_some_and(|at| elapsed >= at) {
            background_at = None;
            if let Reconciliation::Backgrounded { scheduled } =
                reconciler.handle(AppPhase::Background).await
            {
                println!("{elapsed:>7.1}s  background  {scheduled} cues handed off");
                for (at, cue) in harness.scheduler.pending() {
                    let offset = elapsed_secs(start, at);
                    println!("          scheduled +{offset:.1}s  {}  {cue:?}", cue.channel_id());
                }
            }
        }
        if foreground_at.is_some_and(|at| elapsed >= at) {
            foreground_at = None;
            if let Reconciliation::Foregrounded(outcome) =
                reconciler.handle(AppPhase::Active).await
            {
                println!("{elapsed:>7.1}s  foreground  {outcome:?}");
            }
        }

        match controller.tick().await {
            TickOutcome::Progress(cues) => {
                for cue in cues {
                    println!("{elapsed:>7.1}s  {}", describe(&timeline, cue));
                }
            }
            TickOutcome::Finished => {
                println!("{elapsed:>7.1}s  finished");
                break;
            }
            TickOutcome::Idle => {}
        }
        if !controller.is_running().await || elapsed > horizon {
            break;
        }
    }

    // Let detached audio tasks land before reading the tallies.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let summary = json!({
        "audio_cues": harness.audio.played().len(),
        "notifications_scheduled": harness.scheduler.total_scheduled(),
        "running": controller.is_running().await,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn describe(timeline: &Timeline, cue: Cue) -> String {
    match cue {
        Cue::SegmentStart { index, kind } => {
            let duration = timeline.segment(index).map_or(0, |s| s.duration_secs);
            format!(
                "segment {}/{}  {}  {}",
                index + 1,
                timeline.len(),
                kind.label(),
                format_clock(duration)
            )
        }
        Cue::CountdownBeep {
            index,
            seconds_remaining,
        } => format!("beep  segment {}  {seconds_remaining}", index + 1),
    }
}
