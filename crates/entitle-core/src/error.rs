//! Error types for entitle core.

use thiserror::Error;

use crate::state::EntitlementPhase;

/// An illegal move in the entitlement state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal entitlement transition from {from:?} to {to:?}")]
pub struct TransitionError {
    /// Phase the machine was in.
    pub from: EntitlementPhase,
    /// Phase that was requested.
    pub to: EntitlementPhase,
}
