use serde::{Deserialize, Serialize};

use crate::env::{Action, Environment, State};
use crate::error::{EstimationError, Result};

/// Read/write access to state-value estimates.
pub trait ValueTable {
    fn value(&self, state: State) -> f64;
    fn set_value(&mut self, state: State, value: f64);
}

/// Read/write access to action-value estimates.
pub trait QTable {
    fn q_value(&self, state: State, action: Action) -> f64;
    fn set_q_value(&mut self, state: State, action: Action, value: f64);
}

/// Dense value and action-value tables, zero-initialised.
///
/// Indices are trusted: the estimators validate every state and action
/// against the environment before touching a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TabularAgent {
    num_states: usize,
    num_actions: usize,
    values: Vec<f64>,
    q_values: Vec<f64>,
}

impl TabularAgent {
    pub fn new(num_states: usize, num_actions: usize) -> Result<Self> {
        if num_states == 0 || num_actions == 0 {
            return Err(EstimationError::InvalidConfiguration(
                "agent tables need at least one state and one action",
            ));
        }
        Ok(Self {
            num_states,
            num_actions,
            values: vec![0.0; num_states],
            q_values: vec![0.0; num_states * num_actions],
        })
    }

    /// Sizes the tables after the environment's state and action spaces.
    pub fn for_env<E: Environment + ?Sized>(env: &E) -> Result<Self> {
        Self::new(env.num_states(), env.num_actions())
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Action values of a single state, ordered by action index.
    pub fn q_row(&self, state: State) -> Option<&[f64]> {
        if state >= self.num_states {
            return None;
        }
        let start = state * self.num_actions;
        self.q_values.get(start..start + self.num_actions)
    }

    fn q_index(&self, state: State, action: Action) -> usize {
        debug_assert!(action < self.num_actions);
        state * self.num_actions + action
    }
}

impl ValueTable for TabularAgent {
    fn value(&self, state: State) -> f64 {
        self.values[state]
    }

    fn set_value(&mut self, state: State, value: f64) {
        self.values[state] = value;
    }
}

impl QTable for TabularAgent {
    fn q_value(&self, state: State, action: Action) -> f64 {
        self.q_values[self.q_index(state, action)]
    }

    fn set_q_value(&mut self, state: State, action: Action, value: f64) {
        let index = self.q_index(state, action);
        self.q_values[index] = value;
    }
}
