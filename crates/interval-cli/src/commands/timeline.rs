use interval_core::{Resolution, Timeline};
use serde_json::json;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let timeline = Timeline::standard()?;
    let out = json!({
        "segments": timeline.segments(),
        "reps": timeline.reps(),
        "sets": timeline.sets(),
        "total_segments": timeline.len(),
        "total_duration_secs": timeline.total_duration_secs(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub fn resolve(elapsed: f64) -> Result<(), Box<dyn std::error::Error>> {
    let timeline = Timeline::standard()?;
    let out = position_json(&timeline, elapsed);
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// JSON view of where `elapsed` falls; shared with `status`.
pub fn position_json(timeline: &Timeline, elapsed: f64) -> serde_json::Value {
    match timeline.resolve(elapsed) {
        Resolution::Done => json!({
            "elapsed": elapsed,
            "done": true,
        }),
        Resolution::Active {
            index,
            seconds_remaining,
        } => {
            let kind = timeline.segment(index).map(|s| s.kind);
            json!({
                "elapsed": elapsed,
                "done": false,
                "segment_index": index,
                "segment_kind": kind,
                "seconds_remaining": seconds_remaining,
                "set": timeline.set_number(index),
                "rep": timeline.rep_number(index),
                "display": interval_core::timer::format_clock(seconds_remaining),
            })
        }
    }
}
