//! Error and warning types.
//!
//! The control plane reports failure through [`CliError`]. The replacement
//! workflow turns those into either a fatal [`WorkflowError`] or a non-fatal
//! [`Warning`] depending on how far the VM has progressed.

use crate::workflow::Phase;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single control-plane call.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to execute '{cmd}': {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{cmd}' exited with {code:?}: {stderr}")]
    Failed {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("response too large: {len} bytes for '{cmd}'")]
    TooLarge { cmd: String, len: usize },

    #[error("invalid UTF-8 in output of '{cmd}'")]
    Utf8 { cmd: String },

    #[error("error parsing JSON from '{cmd}': path={path} error={message}")]
    Json {
        cmd: String,
        path: String,
        message: String,
    },

    #[error("empty command line")]
    Empty,
}

impl CliError {
    /// True when the provider answered that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            CliError::Failed { stderr, .. } => crate::azure::is_not_found(stderr),
            _ => false,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Broad classification used in reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nothing was changed, the VM is untouched.
    Precondition,
    /// A mutation failed mid-sequence, compensation was attempted.
    Transitional,
    /// Failure after the VM already runs on its new NIC.
    PostCritical,
    /// A poll exceeded its bound.
    Timeout,
}

/// Fatal outcome for one VM.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("precondition failed during {phase}: {reason}")]
    Precondition { phase: Phase, reason: String },

    #[error("{phase} failed: {source}")]
    Transitional {
        phase: Phase,
        #[source]
        source: CliError,
    },

    #[error("{phase} failed: {reason}")]
    Inconsistent { phase: Phase, reason: String },
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Precondition { .. } => ErrorKind::Precondition,
            WorkflowError::Transitional { .. } | WorkflowError::Inconsistent { .. } => {
                ErrorKind::Transitional
            }
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            WorkflowError::Precondition { phase, .. }
            | WorkflowError::Transitional { phase, .. }
            | WorkflowError::Inconsistent { phase, .. } => *phase,
        }
    }
}

/// Non-fatal problem recorded on a VM report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    Timeout {
        phase: Phase,
        waited: Duration,
    },
    PostCritical {
        phase: Phase,
        detail: String,
    },
    /// Request fields disagree with what the provider reports.
    Input(String),
}

impl Warning {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Warning::Timeout { .. } => Some(ErrorKind::Timeout),
            Warning::PostCritical { .. } => Some(ErrorKind::PostCritical),
            Warning::Input(_) => None,
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Timeout { phase, waited } => {
                write!(f, "{phase}: timed out after {}s", waited.as_secs())
            }
            Warning::PostCritical { phase, detail } => write!(f, "{phase}: {detail}"),
            Warning::Input(detail) => write!(f, "input: {detail}"),
        }
    }
}

/// Problems loading an input file.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no records")]
    Empty { path: String },
}
