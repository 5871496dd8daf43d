// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Durable interval log.
//!
//! ## Log format
//!
//! One interval per line, in append order:
//!
//! - `start|end|mission` for a stopped interval
//! - `start|-|mission` for the running one
//!
//! Timestamps are RFC 3339 in UTC with as many fractional digits as needed to be exact.
//! The mission name is the rest of the line and may itself contain `|`.
//!
//! The whole file is replaced on every save (temp file in the same directory, then rename),
//! so a reader never observes a half-written log.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, TempoError};

pub type Timestamp = DateTime<Utc>;

/// Marker written in the end column of the running interval.
const OPEN_MARKER: &str = "-";

/// One contiguous span of tracked time for a mission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    pub mission: String,
    pub start: Timestamp,
    /// `None` while the interval is still running.
    pub end: Option<Timestamp>,
}

impl Interval {
    pub fn open(mission: impl Into<String>, start: Timestamp) -> Self {
        Self {
            mission: mission.into(),
            start,
            end: None,
        }
    }

    pub fn closed(mission: impl Into<String>, start: Timestamp, end: Timestamp) -> Self {
        Self {
            mission: mission.into(),
            start,
            end: Some(end),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Time covered by this interval; a running interval is measured up to `now`.
    /// Never negative: a `now` before the start counts as zero.
    pub fn elapsed(&self, now: Timestamp) -> TimeDelta {
        let end = self.end.unwrap_or(now);
        (end - self.start).max(TimeDelta::zero())
    }
}

fn format_timestamp(t: &Timestamp) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(s: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Serializes an interval as one log line (no trailing newline).
fn format_line(interval: &Interval) -> String {
    let end = match &interval.end {
        Some(end) => format_timestamp(end),
        None => OPEN_MARKER.to_string(),
    };
    format!(
        "{}|{}|{}",
        format_timestamp(&interval.start),
        end,
        interval.mission
    )
}

/// Parses one non-blank log line; the error is a reason suitable for `CorruptRecord`.
fn parse_line(s: &str) -> std::result::Result<Interval, String> {
    let mut parts = s.splitn(3, '|');
    let start = parts.next().unwrap_or("");
    let end = parts.next().ok_or("missing end field")?;
    let mission = parts.next().ok_or("missing mission name")?;
    let start = parse_timestamp(start).ok_or_else(|| format!("bad start timestamp {:?}", start))?;
    let end = if end == OPEN_MARKER {
        None
    } else {
        Some(parse_timestamp(end).ok_or_else(|| format!("bad end timestamp {:?}", end))?)
    };
    if mission.trim().is_empty() {
        return Err("empty mission name".to_string());
    }
    Ok(Interval {
        mission: mission.to_string(),
        start,
        end,
    })
}

/// File-backed, ordered sequence of intervals.
#[derive(Clone, Debug)]
pub struct IntervalStore {
    path: PathBuf,
}

impl IntervalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, action: &'static str, source: io::Error) -> TempoError {
        TempoError::StoreUnavailable {
            path: self.path.clone(),
            action,
            source,
        }
    }

    fn corrupt(&self, line: usize, reason: impl Into<String>) -> TempoError {
        TempoError::CorruptRecord {
            path: self.path.clone(),
            line,
            reason: reason.into(),
        }
    }

    /// Reads the full history in append order. A missing log is an empty history.
    pub fn load(&self) -> Result<Vec<Interval>> {
        let bytes = match fs_err::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no mission log yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.unavailable("read", e)),
        };
        let content = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
            self.corrupt(line, "invalid UTF-8")
        })?;
        let mut records: Vec<(usize, Interval)> = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let interval = parse_line(line).map_err(|reason| self.corrupt(i + 1, reason))?;
            records.push((i + 1, interval));
        }
        self.check_invariants(&records)?;
        debug!(path = %self.path.display(), intervals = records.len(), "loaded mission log");
        Ok(records.into_iter().map(|(_, interval)| interval).collect())
    }

    /// At most one open interval, no interval ending before it starts, no overlaps.
    fn check_invariants(&self, records: &[(usize, Interval)]) -> Result<()> {
        let mut open_line: Option<usize> = None;
        for (line, interval) in records {
            match interval.end {
                None => {
                    if let Some(first) = open_line {
                        return Err(self.corrupt(
                            *line,
                            format!("second running interval (first on line {})", first),
                        ));
                    }
                    open_line = Some(*line);
                }
                Some(end) if end < interval.start => {
                    return Err(self.corrupt(*line, "interval ends before it starts"));
                }
                Some(_) => {}
            }
        }

        let mut by_start: Vec<&(usize, Interval)> = records.iter().collect();
        by_start.sort_by_key(|(_, interval)| {
            (interval.start, interval.end.is_none(), interval.end)
        });
        for pair in by_start.windows(2) {
            let (prev_line, prev) = pair[0];
            let (line, next) = pair[1];
            let overlaps = match prev.end {
                Some(end) => next.start < end,
                None => true,
            };
            if overlaps {
                return Err(self.corrupt(
                    *line,
                    format!("interval overlaps the one on line {}", prev_line),
                ));
            }
        }
        Ok(())
    }

    /// Replaces the whole history. Either the old or the new content survives a crash.
    pub fn save(&self, intervals: &[Interval]) -> Result<()> {
        let mut content = String::new();
        for interval in intervals {
            content.push_str(&format_line(interval));
            content.push('\n');
        }
        let target = self.resolve_target()?;
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp_file =
            NamedTempFile::new_in(dir).map_err(|e| self.unavailable("create temp file", e))?;
        if let Ok(meta) = fs_err::metadata(&target) {
            temp_file
                .as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| self.unavailable("copy permissions", e))?;
        }
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| self.unavailable("write", e))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| self.unavailable("sync", e))?;
        temp_file
            .persist(&target)
            .map_err(|e| self.unavailable("replace", e.error))?;
        debug!(path = %target.display(), intervals = intervals.len(), "saved mission log");
        Ok(())
    }

    /// The file a save must replace: the log path itself, or what it links to.
    fn resolve_target(&self) -> Result<PathBuf> {
        match fs_err::symlink_metadata(&self.path) {
            Ok(meta) if meta.file_type().is_symlink() => {}
            _ => return Ok(self.path.clone()),
        }
        match fs_err::canonicalize(&self.path) {
            Ok(resolved) => Ok(resolved),
            // dangling link: write where it points so the link survives
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let link = fs_err::read_link(&self.path)
                    .map_err(|e| self.unavailable("read link", e))?;
                Ok(match self.path.parent() {
                    Some(parent) if link.is_relative() => parent.join(link),
                    _ => link,
                })
            }
            Err(e) => Err(self.unavailable("resolve link", e)),
        }
    }
}
