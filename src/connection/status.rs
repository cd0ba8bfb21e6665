//! Session state values.

use std::fmt;

/// Lifecycle state of a session.
///
/// `Disconnected -> Idle`, `Idle <-> Executing`, `Idle <-> Fetching`, and
/// any state drops to `Error` when a catalog listing fails. `Error` is left
/// by the next successful driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Disconnected,
    Idle,
    Executing,
    Fetching,
    Error,
}

impl Status {
    /// Whether catalog calls may be issued.
    pub fn accepts_metadata_calls(&self) -> bool {
        matches!(self, Status::Idle | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Disconnected => "disconnected",
            Status::Idle => "idle",
            Status::Executing => "executing",
            Status::Fetching => "fetching",
            Status::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// Outcome of the last statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Ok,
    Fail,
    /// Succeeded and produced a result set.
    OkWithResults,
}
