// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Plaintext rendering of command results.

use std::time::Duration;

use chrono::{Local, TimeDelta};

use crate::store::{Interval, Timestamp};
use crate::tracker::{Listing, Status};

/// Local-time format used for every printed timestamp.
const TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Z %Y";

/// Human duration truncated to whole seconds (e.g. `1h 5m 3s`).
pub fn format_elapsed(d: TimeDelta) -> String {
    let secs = u64::try_from(d.num_seconds()).unwrap_or(0);
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}

fn format_local(t: &Timestamp) -> String {
    t.with_timezone(&Local).format(TIME_FORMAT).to_string()
}

pub fn started(mission: &str, at: &Timestamp) -> String {
    format!("Started: {} at {}\n", mission, format_local(at))
}

pub fn resumed(mission: &str, at: &Timestamp) -> String {
    format!("Resumed: {} at {}\n", mission, format_local(at))
}

pub fn stopped(closed: &Interval) -> String {
    let end = closed.end.unwrap_or(closed.start);
    format!(
        "Stopped: {} at {}, worked {}\n",
        closed.mission,
        format_local(&end),
        format_elapsed(closed.elapsed(end))
    )
}

pub fn status(status: &Status) -> String {
    match status {
        Status::Idle => "Idle: no mission running.\n".to_string(),
        Status::Running {
            mission,
            start,
            elapsed,
        } => format!(
            "Current mission: {}, started {}, elapsed {}\n",
            mission,
            format_local(start),
            format_elapsed(*elapsed)
        ),
    }
}

/// One row per mission (share of total, duration, name), then the total.
pub fn listing(listing: &Listing) -> String {
    if listing.missions.is_empty() {
        return "No missions recorded.\n".to_string();
    }
    let total_ns = listing.total.num_nanoseconds().unwrap_or(i64::MAX) as f64;
    let width = listing
        .missions
        .iter()
        .map(|m| format_elapsed(m.elapsed).len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for row in &listing.missions {
        let pct = if total_ns > 0.0 {
            100.0 * row.elapsed.num_nanoseconds().unwrap_or(i64::MAX) as f64 / total_ns
        } else {
            0.0
        };
        let marker = if row.running { "  (running)" } else { "" };
        out.push_str(&format!(
            "{:>5.1}%  {:<width$}  {}{}\n",
            pct,
            format_elapsed(row.elapsed),
            row.mission,
            marker,
            width = width
        ));
    }
    out.push_str(&format!("Total  {}\n", format_elapsed(listing.total)));
    out
}
