use chrono::Utc;
use interval_core::timer::elapsed_secs;
use interval_core::{JsonFileRunStore, RunStore, Timeline};
use serde_json::json;
use tracing::warn;

use super::timeline::position_json;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let store = JsonFileRunStore::open_default()?;
    let saved = runtime.block_on(store.load())?;

    let Some(saved) = saved else {
        println!("{}", json!({ "running": false }));
        return Ok(());
    };

    let timeline = Timeline::standard()?;
    if !saved.matches(&timeline) {
        warn!("persisted segments differ from the current timeline; resolving against the current one");
    }

    let elapsed = elapsed_secs(saved.start_time, Utc::now());
    let out = json!({
        "running": true,
        "started_at": saved.start_time,
        "store": store.path(),
        "position": position_json(&timeline, elapsed),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
