//! Client for the external evaluation oracle.
//!
//! The oracle is a separate process that scores chess positions with whatever parameter set it
//! last loaded. It speaks a line-oriented text protocol on stdin/stdout:
//!
//! | Request          | Response                                     |
//! |------------------|----------------------------------------------|
//! | `fen <position>` | one line holding a signed integer score      |
//! | `load`           | none; the configuration artifact is re-read  |
//!
//! The tuner only talks to the oracle through the [`Oracle`] trait, so gradient estimation and
//! the training loop can be exercised against scripted doubles. [`ProcessOracle`] is the real
//! implementation backed by a child process.
//!
//! # Failure Model
//!
//! Nothing is retried here. Every I/O failure, unexpected end of output, or malformed score is
//! reported as an [`OracleError`] and the faulty process is torn down; the caller decides when
//! to [`restart`](Oracle::restart). A process that never answers blocks [`Oracle::evaluate`]
//! indefinitely.

use std::{io, num::ParseIntError, path::PathBuf};

use acetune_params::{FileError, ParamSet};

pub use self::process::{OracleCommand, ProcessOracle};

mod process;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum OracleError {
    #[display("oracle process is not running")]
    NotRunning,
    #[display("failed to start oracle {}: {source}", program.display())]
    Spawn { program: PathBuf, source: io::Error },
    #[display("failed to write configuration artifact: {_0}")]
    Artifact(FileError),
    #[display("oracle pipe error: {_0}")]
    Io(io::Error),
    #[display("oracle closed its output")]
    Closed,
    #[display("oracle replied with a malformed score {line:?}: {source}")]
    Parse {
        line: String,
        source: ParseIntError,
    },
}

/// A position scorer whose parameters can be swapped at runtime.
pub trait Oracle {
    /// Tears down the current process, if any, and starts a fresh one.
    fn restart(&mut self) -> Result<(), OracleError>;

    /// Persists `params` where the oracle reads them and tells it to reload.
    fn reload(&mut self, params: &ParamSet) -> Result<(), OracleError>;

    /// Scores `position` with the currently loaded parameters.
    fn evaluate(&mut self, position: &str) -> Result<i64, OracleError>;
}
