// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Mission state machine over the interval log.
//!
//! Nothing here touches storage. Transitions take the loaded sequence and return the
//! sequence to save; queries are pure functions of the sequence and an evaluation time.
//! The session state (idle or running) is always derived by scanning, never cached.

use std::collections::HashMap;

use chrono::TimeDelta;
use tracing::{debug, warn};

use crate::error::{Result, TempoError};
use crate::store::{Interval, Timestamp};

/// Derived state of the log: either nothing is running or exactly one mission is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running { mission: String, start: Timestamp },
}

/// Result of `status`: the running mission with its live elapsed time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running {
        mission: String,
        start: Timestamp,
        elapsed: TimeDelta,
    },
}

/// One row of the `ls` listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissionTotal {
    pub mission: String,
    pub elapsed: TimeDelta,
    pub running: bool,
}

/// Per-mission totals in first-seen order, plus the grand total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub missions: Vec<MissionTotal>,
    pub total: TimeDelta,
}

/// Position of the running interval, if any.
fn open_index(intervals: &[Interval]) -> Option<usize> {
    intervals.iter().rposition(Interval::is_open)
}

pub fn current_state(intervals: &[Interval]) -> SessionState {
    match open_index(intervals) {
        Some(i) => SessionState::Running {
            mission: intervals[i].mission.clone(),
            start: intervals[i].start,
        },
        None => SessionState::Idle,
    }
}

/// Latest end among stopped intervals.
fn latest_end(intervals: &[Interval]) -> Option<Timestamp> {
    intervals.iter().filter_map(|i| i.end).max()
}

fn require_idle(intervals: &[Interval]) -> Result<()> {
    match current_state(intervals) {
        SessionState::Idle => Ok(()),
        SessionState::Running { mission, .. } => Err(TempoError::AlreadyRunning { mission }),
    }
}

/// New intervals may not begin before anything already recorded has ended.
fn require_after_history(intervals: &[Interval], now: Timestamp) -> Result<()> {
    match latest_end(intervals) {
        Some(end) if now < end => Err(TempoError::InvalidTimestamp {
            at: now,
            reason: format!("earlier than the last recorded stop at {}", end),
        }),
        _ => Ok(()),
    }
}

/// Trims the name and rejects names the log cannot hold.
fn validate_mission(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TempoError::InvalidMission {
            name: name.to_string(),
            reason: "name is empty",
        });
    }
    if trimmed.contains(['\n', '\r']) {
        return Err(TempoError::InvalidMission {
            name: name.to_string(),
            reason: "name spans more than one line",
        });
    }
    Ok(trimmed.to_string())
}

/// Starts `name` at `now`. Fails while any mission (including `name` itself) is running.
pub fn start(intervals: &[Interval], name: &str, now: Timestamp) -> Result<Vec<Interval>> {
    require_idle(intervals)?;
    let mission = validate_mission(name)?;
    require_after_history(intervals, now)?;
    debug!(%mission, start = %now, "starting mission");
    let mut next = intervals.to_vec();
    next.push(Interval::open(mission, now));
    Ok(next)
}

/// Stops the running mission at `now`; returns the new sequence and the interval just closed.
pub fn stop(intervals: &[Interval], now: Timestamp) -> Result<(Vec<Interval>, Interval)> {
    let i = open_index(intervals).ok_or(TempoError::NothingRunning)?;
    let running = &intervals[i];
    if now < running.start {
        return Err(TempoError::InvalidTimestamp {
            at: now,
            reason: format!(
                "earlier than the start of \"{}\" at {}",
                running.mission, running.start
            ),
        });
    }
    let closed = Interval::closed(running.mission.clone(), running.start, now);
    let mut next = intervals.to_vec();
    next[i] = closed.clone();
    debug!(mission = %closed.mission, end = %now, "stopped mission");
    Ok((next, closed))
}

/// The most recently stopped interval: latest end, then latest start, then latest position.
fn last_stopped(intervals: &[Interval]) -> Option<&Interval> {
    intervals
        .iter()
        .enumerate()
        .filter_map(|(pos, i)| i.end.map(|end| (end, i.start, pos)))
        .max()
        .map(|(_, _, pos)| &intervals[pos])
}

/// Starts a new interval at `now` for the most recently stopped mission.
/// The interval being revived is left as it was.
pub fn resume(intervals: &[Interval], now: Timestamp) -> Result<Vec<Interval>> {
    require_idle(intervals)?;
    let prior = last_stopped(intervals).ok_or(TempoError::NoPriorMission)?;
    require_after_history(intervals, now)?;
    debug!(mission = %prior.mission, start = %now, "resuming mission");
    let mut next = intervals.to_vec();
    next.push(Interval::open(prior.mission.clone(), now));
    Ok(next)
}

pub fn status(intervals: &[Interval], now: Timestamp) -> Status {
    match open_index(intervals) {
        Some(i) => {
            let running = &intervals[i];
            if now < running.start {
                warn!(start = %running.start, now = %now, "clock is behind the running mission's start");
            }
            Status::Running {
                mission: running.mission.clone(),
                start: running.start,
                elapsed: running.elapsed(now),
            }
        }
        None => Status::Idle,
    }
}

/// Sums every mission's intervals; the running one is measured up to `now`.
pub fn list(intervals: &[Interval], now: Timestamp) -> Listing {
    let mut missions: Vec<MissionTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for interval in intervals {
        let slot = *index.entry(interval.mission.as_str()).or_insert_with(|| {
            missions.push(MissionTotal {
                mission: interval.mission.clone(),
                elapsed: TimeDelta::zero(),
                running: false,
            });
            missions.len() - 1
        });
        let row = &mut missions[slot];
        row.elapsed += interval.elapsed(now);
        row.running |= interval.is_open();
    }
    let total = missions
        .iter()
        .fold(TimeDelta::zero(), |acc, row| acc + row.elapsed);
    Listing { missions, total }
}
