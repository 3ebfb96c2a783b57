use thiserror::Error;

use crate::env::{Action, State};

/// Errors raised while generating episodes or updating estimates.
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error(
        "behavior policy gives probability {probability} to sampled action {action} in state {state}"
    )]
    InvalidPolicy {
        state: State,
        action: Action,
        probability: f64,
    },
    #[error("importance weight overflowed after state {state}, action {action}")]
    WeightOverflow { state: State, action: Action },
    #[error("state {0} is outside the environment's state space")]
    StateOutOfRange(State),
    #[error("action {0} is outside the environment's action space")]
    ActionOutOfRange(Action),
    #[error("invalid action distribution: {0}")]
    InvalidDistribution(#[from] rand::distributions::WeightedError),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
}

pub type Result<T> = std::result::Result<T, EstimationError>;
