use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use interval_core::{
    AppPhase, Collaborators, Config, ControllerSettings, JsonFileRunStore, LifecycleReconciler,
    RunController, RunSnapshot, SystemClock, Timeline,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::terminal::{LoggingScheduler, TerminalAudio};

#[derive(Args)]
pub struct RunArgs {
    /// Report the app as backgrounded this many seconds after start
    #[arg(long)]
    pub background_at: Option<f64>,
    /// Report the app as foregrounded this many seconds after start
    #[arg(long)]
    pub foreground_at: Option<f64>,
}

pub fn run(args: RunArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let background_at = args.background_at.map(delay).transpose()?;
    let foreground_at = args.foreground_at.map(delay).transpose()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(live(config, background_at, foreground_at))
}

fn delay(secs: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    Duration::try_from_secs_f64(secs).map_err(|_| format!("invalid offset: {secs}").into())
}

async fn live(
    config: &Config,
    background_at: Option<Duration>,
    foreground_at: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    let collaborators = Collaborators {
        audio: Arc::new(TerminalAudio),
        scheduler: Arc::new(LoggingScheduler),
        store: Arc::new(JsonFileRunStore::open_default()?),
        clock: Arc::new(SystemClock),
    };
    let controller = RunController::new(
        Arc::new(Timeline::standard()?),
        collaborators,
        ControllerSettings::from(config),
    );

    let (phases, rx) = mpsc::channel(8);
    let reconciler =
        tokio::spawn(LifecycleReconciler::new(controller.clone(), AppPhase::Active).run(rx));

    let mut snapshots = controller.subscribe();
    let first = controller.start().await;
    snapshots.borrow_and_update();
    render(&first);

    for (after, phase) in [
        (background_at, AppPhase::Background),
        (foreground_at, AppPhase::Active),
    ] {
        if let Some(after) = after {
            let phases = phases.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let _ = phases.send(phase).await;
            });
        }
    }

    println!("commands: bg, fg, inactive, stop");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last = (first.segment_index, first.seconds_remaining);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = snapshots.borrow_and_update().clone();
                if !snap.running {
                    break;
                }
                if (snap.segment_index, snap.seconds_remaining) != last {
                    last = (snap.segment_index, snap.seconds_remaining);
                    render(&snap);
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match line.trim() {
                    "bg" | "background" => { let _ = phases.send(AppPhase::Background).await; }
                    "fg" | "foreground" => { let _ = phases.send(AppPhase::Active).await; }
                    "inactive" => { let _ = phases.send(AppPhase::Inactive).await; }
                    "stop" | "q" => controller.stop().await,
                    "" => {}
                    other => warn!("unknown command: {other}"),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("stdin closed: {e}");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                controller.stop().await;
            }
        }
    }

    reconciler.abort();
    println!("done");
    Ok(())
}

fn render(snap: &RunSnapshot) {
    println!(
        "Set {}/{}  Rep {}/{}  {} {}  (segment {}/{})",
        snap.set_number,
        snap.total_sets,
        snap.rep_number,
        snap.total_reps,
        snap.phase_label(),
        snap.clock_display(),
        snap.segment_index + 1,
        snap.total_segments,
    );
}
