// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! # tempo — mission time tracker
//!
//! Starts, stops and resumes named missions and reports time spent on each.
//! The log lives at `$HOME/.tempo/missions.log` by default (`--log` or `TEMPO_LOG` override it).
//! See [`store`] for the log format.
//!
//! ## Subcommands
//!
//! | Command          | Description |
//! |------------------|-------------|
//! | `start <name>`   | Start a mission now (or `--at` a past time); fails if one is already running. |
//! | `stop`           | Stop the running mission and show the span it covered. |
//! | `resume`         | Start a new interval for the most recently stopped mission. |
//! | `status`         | Show the running mission and its elapsed time, or idle. |
//! | `ls` / `list`    | Total time per mission in first-seen order, with share of the grand total. |
//!
//! Every invocation loads the whole log, computes, and (for transitions) replaces the log
//! atomically. Two invocations racing on the same log are not guarded against.

mod config;
mod error;
mod report;
mod store;
mod tracker;

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, TempoError};
use crate::store::{IntervalStore, Timestamp};

#[derive(Parser, Debug)]
#[command(name = "tempo")]
#[command(about = "Personal mission time tracker")]
#[command(version)]
struct Cli {
    /// Mission log file (default: $HOME/.tempo/missions.log)
    #[arg(long, global = true, env = "TEMPO_LOG", value_name = "PATH")]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a new mission
    Start {
        /// Mission name; several words are joined with spaces
        #[arg(required = true, num_args = 1.., value_name = "NAME")]
        name: Vec<String>,

        /// Record the start at this past time instead of now
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
    },

    /// Stop the running mission
    Stop {
        /// Record the stop at this past time instead of now
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
    },

    /// Resume the most recently stopped mission
    Resume {
        /// Record the resume at this past time instead of now
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
    },

    /// Show the running mission and its elapsed time
    Status,

    /// List missions with their accumulated time
    #[command(visible_alias = "list")]
    Ls,
}

fn cmd_start(store: &IntervalStore, name: &str, at: Option<&str>, now: Timestamp) -> Result<String> {
    let when = config::resolve_at(at, now)?;
    let intervals = store.load()?;
    let next = tracker::start(&intervals, name, when)?;
    store.save(&next)?;
    let started = next.last().map(|i| i.mission.as_str()).unwrap_or(name);
    Ok(report::started(started, &when))
}

fn cmd_stop(store: &IntervalStore, at: Option<&str>, now: Timestamp) -> Result<String> {
    let when = config::resolve_at(at, now)?;
    let intervals = store.load()?;
    let (next, closed) = tracker::stop(&intervals, when)?;
    store.save(&next)?;
    Ok(report::stopped(&closed))
}

fn cmd_resume(store: &IntervalStore, at: Option<&str>, now: Timestamp) -> Result<String> {
    let when = config::resolve_at(at, now)?;
    let intervals = store.load()?;
    let next = tracker::resume(&intervals, when)?;
    store.save(&next)?;
    let mission = next.last().map(|i| i.mission.as_str()).unwrap_or_default();
    Ok(report::resumed(mission, &when))
}

fn cmd_status(store: &IntervalStore, now: Timestamp) -> Result<String> {
    let intervals = store.load()?;
    Ok(report::status(&tracker::status(&intervals, now)))
}

fn cmd_ls(store: &IntervalStore, now: Timestamp) -> Result<String> {
    let intervals = store.load()?;
    Ok(report::listing(&tracker::list(&intervals, now)))
}

fn run(cli: Cli) -> Result<String> {
    let path = config::resolve_log_path(cli.log)?;
    let store = IntervalStore::new(path);
    let now = Utc::now();
    debug!(log = %store.path().display(), command = ?cli.command, "dispatching");
    match cli.command {
        Commands::Start { name, at } => cmd_start(&store, &name.join(" "), at.as_deref(), now),
        Commands::Stop { at } => cmd_stop(&store, at.as_deref(), now),
        Commands::Resume { at } => cmd_resume(&store, at.as_deref(), now),
        Commands::Status => cmd_status(&store, now),
        Commands::Ls => cmd_ls(&store, now),
    }
}

/// Writes command output to stdout; a closed pipe (e.g. `tempo ls | head -1`) is not an error.
fn emit(text: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    match out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(TempoError::Output(e)),
        _ => Ok(()),
    }
}

/// `TEMPO_DEBUG=1` turns on debug logging; otherwise `RUST_LOG`, else warnings only. Logs go to stderr.
fn init_logging() {
    let debug_enabled = env::var("TEMPO_DEBUG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli).and_then(|text| emit(&text)) {
        debug!(error = %e, kind = ?e.kind(), "command failed");
        eprintln!("tempo: {}", e);
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Interval;
    use chrono::{TimeDelta, TimeZone};

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).single().unwrap()
    }

    fn temp_store() -> (tempfile::TempDir, IntervalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = IntervalStore::new(dir.path().join("missions.log"));
        (dir, store)
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["tempo", "start", "write", "docs"]).unwrap();
        assert!(matches!(cli.command, Commands::Start { ref name, at: None } if name.join(" ") == "write docs"));
        let cli = Cli::try_parse_from(["tempo", "--log", "/tmp/x.log", "stop", "--at", "9:00"]).unwrap();
        assert_eq!(cli.log, Some(PathBuf::from("/tmp/x.log")));
        assert!(matches!(cli.command, Commands::Stop { at: Some(ref t) } if t == "9:00"));
        assert!(matches!(
            Cli::try_parse_from(["tempo", "list"]).unwrap().command,
            Commands::Ls
        ));
        assert!(Cli::try_parse_from(["tempo", "start"]).is_err());
    }

    #[test]
    fn test_cmd_start_writes_open_interval() {
        let (_dir, store) = temp_store();
        let out = cmd_start(&store, "coding", None, at(0)).unwrap();
        assert!(out.starts_with("Started: coding at "));
        assert_eq!(store.load().unwrap(), vec![Interval::open("coding", at(0))]);
        let content = fs_err::read_to_string(store.path()).unwrap();
        assert_eq!(content, "2025-10-09T08:53:20Z|-|coding\n");
    }

    #[test]
    fn test_start_stop_resume_status_ls() {
        let (_dir, store) = temp_store();
        cmd_start(&store, "a", None, at(0)).unwrap();
        let out = cmd_stop(&store, None, at(60)).unwrap();
        assert!(out.ends_with("worked 1m\n"), "{out}");
        let out = cmd_resume(&store, None, at(120)).unwrap();
        assert!(out.starts_with("Resumed: a at "));
        let out = cmd_status(&store, at(120)).unwrap();
        assert!(out.ends_with("elapsed 0s\n"), "{out}");
        let out = cmd_ls(&store, at(150)).unwrap();
        assert_eq!(out.lines().next(), Some("100.0%  1m 30s  a  (running)"));
        assert_eq!(out.lines().last(), Some("Total  1m 30s"));
        assert_eq!(
            store.load().unwrap(),
            vec![Interval::closed("a", at(0), at(60)), Interval::open("a", at(120))]
        );
    }

    #[test]
    fn test_cmd_stop_while_idle_leaves_log_untouched() {
        let (_dir, store) = temp_store();
        cmd_start(&store, "a", None, at(0)).unwrap();
        cmd_stop(&store, None, at(10)).unwrap();
        let before = fs_err::read(store.path()).unwrap();
        let err = cmd_stop(&store, None, at(20)).unwrap_err();
        assert!(matches!(err, TempoError::NothingRunning));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(fs_err::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_cmd_stop_on_empty_log_creates_nothing() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            cmd_stop(&store, None, at(0)),
            Err(TempoError::NothingRunning)
        ));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_cmd_start_while_running_keeps_only_running_interval() {
        let (_dir, store) = temp_store();
        cmd_start(&store, "b", None, at(0)).unwrap();
        match cmd_start(&store, "a", None, at(5)) {
            Err(TempoError::AlreadyRunning { mission }) => assert_eq!(mission, "b"),
            other => panic!("expected AlreadyRunning, got {other:?}"),
        }
        assert_eq!(store.load().unwrap(), vec![Interval::open("b", at(0))]);
    }

    #[test]
    fn test_cmd_resume_prefers_latest_stop() {
        let (_dir, store) = temp_store();
        store
            .save(&[
                Interval::closed("a", at(0), at(10)),
                Interval::closed("b", at(15), at(20)),
            ])
            .unwrap();
        let out = cmd_resume(&store, None, at(30)).unwrap();
        assert!(out.starts_with("Resumed: b at "));
    }

    #[test]
    fn test_cmd_resume_empty_log() {
        let (_dir, store) = temp_store();
        let err = cmd_resume(&store, None, at(0)).unwrap_err();
        assert!(matches!(err, TempoError::NoPriorMission));
    }

    #[test]
    fn test_cmd_stop_at_before_start_is_rejected() {
        let (_dir, store) = temp_store();
        let now = Utc::now();
        cmd_start(&store, "a", None, now).unwrap();
        let earlier = (now - TimeDelta::hours(1)).to_rfc3339();
        let err = cmd_stop(&store, Some(&earlier), now).unwrap_err();
        assert!(matches!(err, TempoError::InvalidTimestamp { .. }));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(store.load().unwrap(), vec![Interval::open("a", now)]);
    }

    #[test]
    fn test_cmd_start_at_past_time() {
        let (_dir, store) = temp_store();
        let start = at(0).to_rfc3339();
        cmd_start(&store, "a", Some(&start), at(600)).unwrap();
        let out = cmd_status(&store, at(600)).unwrap();
        assert!(out.ends_with("elapsed 10m\n"), "{out}");
    }

    #[test]
    fn test_corrupt_log_is_reported() {
        let (_dir, store) = temp_store();
        fs_err::write(store.path(), "not a record\n").unwrap();
        let err = cmd_ls(&store, at(0)).unwrap_err();
        assert!(matches!(err, TempoError::CorruptRecord { line: 1, .. }));
        let err = cmd_start(&store, "a", None, at(0)).unwrap_err();
        assert!(matches!(err, TempoError::CorruptRecord { .. }));
        assert_eq!(
            fs_err::read_to_string(store.path()).unwrap(),
            "not a record\n"
        );
    }

    #[test]
    fn test_cmd_ls_empty() {
        let (_dir, store) = temp_store();
        assert_eq!(cmd_ls(&store, at(0)).unwrap(), "No missions recorded.\n");
        assert_eq!(
            cmd_status(&store, at(0)).unwrap(),
            "Idle: no mission running.\n"
        );
    }
}
