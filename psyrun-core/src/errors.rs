//! Error types shared across the psyrun crates.
//!
//! Every variant is a programming-contract violation, not a transient runtime
//! condition: callers should fail loudly during setup or sequencing instead of
//! retrying.

use thiserror::Error;

/// State machine contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// Malformed state declaration (empty set, duplicate names, or a dispatch
    /// entry referencing an undeclared state).
    #[error("invalid state machine configuration: {reason}")]
    Configuration { reason: String },

    /// Transition target outside the declared state set.
    #[error("`{state}` is not a declared state")]
    UnknownState { state: String },

    /// `pop` with nothing pushed; push/pop pairing is broken.
    #[error("pop called on an empty state stack")]
    EmptyStack,
}

/// Trial sequencing contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Ragged variable arrays within one block.
    #[error(
        "block `{block}`: variable `{variable}` has {found} values, expected {expected}"
    )]
    BlockShape {
        block: String,
        variable: String,
        expected: usize,
        found: usize,
    },
}
