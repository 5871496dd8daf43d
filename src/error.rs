// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Error taxonomy for tempo commands.

use std::io;
use std::path::PathBuf;

use crate::store::Timestamp;

/// Broad class of a failure; decides the process exit status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested transition is not valid in the current state.
    UsageConflict,
    /// Recorded or supplied data would break an interval invariant.
    DataIntegrity,
    /// The log (or stdout) could not be accessed.
    Environment,
}

#[derive(Debug, thiserror::Error)]
pub enum TempoError {
    #[error("mission \"{mission}\" is already running; stop it first")]
    AlreadyRunning { mission: String },

    #[error("no mission is running (idle)")]
    NothingRunning,

    #[error("no stopped mission to resume (idle, history is empty)")]
    NoPriorMission,

    #[error("invalid mission name {name:?}: {reason}")]
    InvalidMission { name: String, reason: &'static str },

    #[error("could not parse time: {input}")]
    InvalidTime { input: String },

    #[error("invalid timestamp {at}: {reason}")]
    InvalidTimestamp { at: Timestamp, reason: String },

    #[error("corrupt record at {}:{line}: {reason}", path.display())]
    CorruptRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("mission log {} unavailable ({action}): {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("could not write output: {0}")]
    Output(#[source] io::Error),
}

impl TempoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TempoError::AlreadyRunning { .. }
            | TempoError::NothingRunning
            | TempoError::NoPriorMission
            | TempoError::InvalidMission { .. }
            | TempoError::InvalidTime { .. } => ErrorKind::UsageConflict,
            TempoError::InvalidTimestamp { .. } | TempoError::CorruptRecord { .. } => {
                ErrorKind::DataIntegrity
            }
            TempoError::StoreUnavailable { .. } | TempoError::Output(_) => ErrorKind::Environment,
        }
    }

    /// Exit status for the binary. 2 is left to clap for malformed arguments.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::UsageConflict => 1,
            ErrorKind::DataIntegrity => 3,
            ErrorKind::Environment => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, TempoError>;
