// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Log location and time-argument parsing.

use std::env;
use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::{Result, TempoError};
use crate::store::Timestamp;

/// Default path segment under `$HOME` for the mission log.
const DEFAULT_LOG: &str = ".tempo/missions.log";

/// Returns the default log path: `$HOME/.tempo/missions.log`, or `./.tempo/missions.log` if `HOME` is unset.
pub fn default_log_path() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_LOG)
}

/// Picks the log path. An explicit path (flag or `TEMPO_LOG`) is used as given; the default
/// location's directory is created on first use.
pub fn resolve_log_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let path = default_log_path();
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent).map_err(|source| TempoError::StoreUnavailable {
            path: path.clone(),
            action: "create directory",
            source,
        })?;
    }
    Ok(path)
}

/// Parses a user-supplied time (e.g. RFC 3339, `%Y-%m-%d %H:%M`, `%H:%M`, `%I:%M %p`).
/// Times without a date are taken as today in `now`'s local calendar.
pub fn parse_time(s: &str, now: DateTime<Local>) -> Option<Timestamp> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Local.from_local_datetime(&dt).earliest().map(|l| l.with_timezone(&Utc));
        }
    }
    let time_formats = ["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M%p"];
    let today = now.date_naive();
    for fmt in time_formats {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Local
                .from_local_datetime(&today.and_time(t))
                .earliest()
                .map(|l| l.with_timezone(&Utc));
        }
    }
    None
}

/// The moment a transition is recorded at: `now`, or a past time given with `--at`.
pub fn resolve_at(at: Option<&str>, now: Timestamp) -> Result<Timestamp> {
    let Some(input) = at else {
        return Ok(now);
    };
    let when = parse_time(input, now.with_timezone(&Local)).ok_or_else(|| {
        TempoError::InvalidTime {
            input: input.to_string(),
        }
    })?;
    if when > now {
        return Err(TempoError::InvalidTimestamp {
            at: when,
            reason: "in the future".to_string(),
        });
    }
    Ok(when)
}
