/*!
 * Error taxonomy for the probing engine
 *
 * Every fallible operation in `core` resolves to a `WpsError`. Nothing here is
 * fatal to the process: callers branch on the variant and the orchestrator
 * always lands back in a stable state (`Idle` or `MonitorActive`).
 */

use std::time::Duration;

use thiserror::Error;

use crate::core::orchestrator::OrchestratorState;

#[derive(Error, Debug)]
pub enum WpsError {
    #[error("No wireless interface found")]
    NoInterfaceFound,

    #[error("Monitor mode unavailable: {0}")]
    MonitorModeUnavailable(String),

    #[error("Monitor mode required (enable monitor mode first)")]
    MonitorModeRequired,

    #[error("Unknown WPS pin algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Invalid hardware address: {0}")]
    InvalidAddress(String),

    #[error("Malformed capture row {line}: {reason}")]
    ParseFailure { line: usize, reason: String },

    #[error("{program} did not exit within {after:?}")]
    ProcessTimeout { program: String, after: Duration },

    #[error("Permission denied: {0} (run as root)")]
    PermissionDenied(String),

    #[error("Another operation is already running: {0}")]
    Busy(String),

    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: OrchestratorState,
    },

    #[error("A supervised process is already running")]
    ProcessBusy,

    #[error("{0} not found in PATH")]
    ToolMissing(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background worker failed: {0}")]
    Worker(String),
}

impl WpsError {
    /// Map a spawn failure to the matching variant for `program`
    pub fn from_spawn(program: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => WpsError::ToolMissing(program.to_string()),
            std::io::ErrorKind::PermissionDenied => WpsError::PermissionDenied(program.to_string()),
            _ => WpsError::Io(err),
        }
    }
}
