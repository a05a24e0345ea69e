//! Service state model and reconciliation decisions.
//!
//! A service instance has two states in the shared tree:
//!
//! - **Configured state**: what the instance should be doing, written by an
//!   operator or a higher-level controller.
//! - **Discovered state**: what the instance was last observed doing, written
//!   only from the instance's own reports.
//!
//! [`decide`] compares the two and picks the single action that moves the
//! instance toward its configured state.
//!
//! # Invariants
//!
//! - Decisions are pure and deterministic given the same inputs
//! - A discovered `ERROR` is never acted upon; only an outside actor clears it
//! - A start is never issued while a previous start is still pending (`INIT`)
//! - A stop is always issued when configured `STOP` differs from discovered

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors decoding a state value out of the state tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateValueError {
    /// The value is not a string.
    #[error("state value is not a string: {0}")]
    NotAString(String),

    /// The string does not name a known state.
    #[error("unknown service state: {0}")]
    UnknownState(String),
}

/// Lifecycle state of a service instance as stored in the state tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceState {
    /// Could not be read or was never set.
    #[default]
    Unknown,
    /// A start was issued; the instance has not confirmed running.
    Init,
    /// The instance confirmed it is running.
    Run,
    /// The instance is stopped, or a stop was issued.
    Stop,
    /// The instance reported an unrecoverable failure.
    Error,
}

impl ServiceState {
    /// Tree representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Init => "INIT",
            Self::Run => "RUN",
            Self::Stop => "STOP",
            Self::Error => "ERROR",
        }
    }

    /// Decode a state from a tree value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, StateValueError> {
        match value {
            serde_json::Value::String(s) => s.parse(),
            other => Err(StateValueError::NotAString(other.to_string())),
        }
    }

    /// Encode the state as a tree value.
    pub fn to_value(self) -> serde_json::Value {
        serde_json::Value::String(self.as_str().to_string())
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceState {
    type Err = StateValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNKNOWN" => Ok(Self::Unknown),
            "INIT" => Ok(Self::Init),
            "RUN" => Ok(Self::Run),
            "STOP" => Ok(Self::Stop),
            "ERROR" => Ok(Self::Error),
            other => Err(StateValueError::UnknownState(other.to_string())),
        }
    }
}

/// Coarse runtime state a service instance reports about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Run,
    Stop,
    Error,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Run => "RUN",
            Self::Stop => "STOP",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Discovered state recorded for a self-reported process state.
///
/// A process announcing `RUN` is recorded as `INIT`: from the controller's
/// point of view the instance is alive but still initializing.
pub fn discovered_state_for(reported: ProcessState) -> ServiceState {
    match reported {
        ProcessState::Run => ServiceState::Init,
        ProcessState::Stop => ServiceState::Stop,
        ProcessState::Error => ServiceState::Error,
    }
}

/// Why a reconciliation pass decided not to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoopReason {
    /// Configured and discovered state already match.
    InSync,
    /// Discovered state is `ERROR`.
    StickyError,
    /// Configured `RUN` while a start is already outstanding.
    StartPending,
    /// The configured state has no associated action.
    NoTransition,
}

impl fmt::Display for NoopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InSync => "in_sync",
            Self::StickyError => "sticky_error",
            Self::StartPending => "start_pending",
            Self::NoTransition => "no_transition",
        };
        f.write_str(s)
    }
}

/// Action chosen by a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Start,
    Stop,
    Noop(NoopReason),
}

impl SyncAction {
    /// Returns true if no start or stop should be issued.
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Noop(_))
    }
}

/// Decide how to converge an instance from `discovered` toward `configured`.
pub fn decide(configured: ServiceState, discovered: ServiceState) -> SyncAction {
    if configured == discovered {
        return SyncAction::Noop(NoopReason::InSync);
    }

    // errors are cleared outside the controller
    if discovered == ServiceState::Error {
        return SyncAction::Noop(NoopReason::StickyError);
    }

    match configured {
        ServiceState::Run if discovered == ServiceState::Init => {
            SyncAction::Noop(NoopReason::StartPending)
        }
        ServiceState::Run => SyncAction::Start,
        ServiceState::Stop => SyncAction::Stop,
        _ => SyncAction::Noop(NoopReason::NoTransition),
    }
}

/// Convergence status for a service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// Discovered matches configured.
    Converged,

    /// An action has been or can be taken to converge.
    Converging,

    /// Requires intervention (sticky error).
    Diverged,

    /// Configured state carries no target the controller can act on.
    Unknown,
}

impl ConvergenceStatus {
    /// Classify a configured/discovered pair.
    pub fn of(configured: ServiceState, discovered: ServiceState) -> Self {
        match decide(configured, discovered) {
            SyncAction::Noop(NoopReason::InSync) => Self::Converged,
            SyncAction::Noop(NoopReason::StickyError) => Self::Diverged,
            SyncAction::Noop(NoopReason::NoTransition) => Self::Unknown,
            SyncAction::Noop(NoopReason::StartPending) | SyncAction::Start | SyncAction::Stop => {
                Self::Converging
            }
        }
    }

    /// Returns true if the instance has converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Converged => "converged",
            Self::Converging => "converging",
            Self::Diverged => "diverged",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ServiceState::*;

    #[rstest]
    #[case(Run, Unknown, SyncAction::Start)]
    #[case(Run, Stop, SyncAction::Start)]
    #[case(Run, Init, SyncAction::Noop(NoopReason::StartPending))]
    #[case(Run, Run, SyncAction::Noop(NoopReason::InSync))]
    #[case(Run, Error, SyncAction::Noop(NoopReason::StickyError))]
    #[case(Stop, Init, SyncAction::Stop)]
    #[case(Stop, Run, SyncAction::Stop)]
    #[case(Stop, Unknown, SyncAction::Stop)]
    #[case(Stop, Stop, SyncAction::Noop(NoopReason::InSync))]
    #[case(Stop, Error, SyncAction::Noop(NoopReason::StickyError))]
    #[case(Error, Error, SyncAction::Noop(NoopReason::InSync))]
    #[case(Unknown, Run, SyncAction::Noop(NoopReason::NoTransition))]
    #[case(Init, Stop, SyncAction::Noop(NoopReason::NoTransition))]
    #[case(Error, Run, SyncAction::Noop(NoopReason::NoTransition))]
    fn test_decide(
        #[case] configured: ServiceState,
        #[case] discovered: ServiceState,
        #[case] expected: SyncAction,
    ) {
        assert_eq!(decide(configured, discovered), expected);
    }

    #[test]
    fn test_error_is_sticky_for_every_configured_state() {
        for configured in [Unknown, Init, Run, Stop] {
            assert!(decide(configured, Error).is_noop());
        }
    }

    #[rstest]
    #[case(ProcessState::Run, Init)]
    #[case(ProcessState::Stop, Stop)]
    #[case(ProcessState::Error, Error)]
    fn test_discovered_state_for(#[case] reported: ProcessState, #[case] expected: ServiceState) {
        assert_eq!(discovered_state_for(reported), expected);
    }

    #[test]
    fn test_state_value_roundtrip() {
        for state in [Unknown, Init, Run, Stop, Error] {
            assert_eq!(ServiceState::from_value(&state.to_value()), Ok(state));
        }
    }

    #[test]
    fn test_state_from_bad_value() {
        assert!(matches!(
            ServiceState::from_value(&serde_json::json!(3)),
            Err(StateValueError::NotAString(_))
        ));
        assert!(matches!(
            ServiceState::from_value(&serde_json::json!("RUNNING")),
            Err(StateValueError::UnknownState(_))
        ));
    }

    #[test]
    fn test_state_serde_matches_tree_format() {
        let json = serde_json::to_string(&Init).unwrap();
        assert_eq!(json, "\"INIT\"");
        let parsed: ServiceState = serde_json::from_str("\"ERROR\"").unwrap();
        assert_eq!(parsed, Error);
    }

    #[test]
    fn test_convergence_status() {
        assert!(ConvergenceStatus::of(Run, Run).is_converged());
        assert_eq!(ConvergenceStatus::of(Run, Init), ConvergenceStatus::Converging);
        assert_eq!(ConvergenceStatus::of(Stop, Error), ConvergenceStatus::Diverged);
        assert_eq!(ConvergenceStatus::of(Unknown, Stop), ConvergenceStatus::Unknown);
    }
}
