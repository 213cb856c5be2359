use crate::error::StateMachineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the processor is inside a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorState {
    /// No message being processed; waiting for a start delimiter
    #[default]
    Idle,
    /// Waiting for the label byte
    TypeWait,
    /// Waiting for the two length bytes
    LengthWait,
    /// Consuming the payload
    DataWait,
    /// Waiting for the end delimiter
    EndWait,
}

impl ProcessorState {
    /// All states in frame order
    pub const ALL: [Self; 5] = [
        Self::Idle,
        Self::TypeWait,
        Self::LengthWait,
        Self::DataWait,
        Self::EndWait,
    ];

    /// Snake-case name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::TypeWait => "type_wait",
            Self::LengthWait => "length_wait",
            Self::DataWait => "data_wait",
            Self::EndWait => "end_wait",
        }
    }
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validates a state transition.
///
/// Illegal transitions panic when the `strict-debug` feature is enabled;
/// otherwise they are reported as an error.
pub fn validate_transition(from: ProcessorState, to: ProcessorState) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal state transition attempted: {from:?} -> {to:?}");

        #[cfg(not(feature = "strict-debug"))]
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

#[must_use]
pub fn allowed_transitions(from: ProcessorState) -> Vec<ProcessorState> {
    use ProcessorState::*;
    match from {
        Idle => vec![Idle, TypeWait],
        TypeWait => vec![LengthWait],
        LengthWait => vec![DataWait, Idle],
        DataWait => vec![EndWait],
        EndWait => vec![Idle],
    }
}

fn allowed(from: ProcessorState, to: ProcessorState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
