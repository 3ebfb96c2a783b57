use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use crate::env::{Action, State};
use crate::error::{EstimationError, Result};
use crate::policy::{ImprovablePolicy, Policy};

/// Stochastic policy storing an explicit action distribution per state.
///
/// Every state starts uniform. Policy improvement narrows a state to a single
/// action, or to an epsilon-greedy mix around it.
pub struct TabularPolicy<R: Rng> {
    num_actions: usize,
    probabilities: Vec<Vec<f64>>,
    samplers: Vec<WeightedIndex<f64>>,
    rng: R,
}

impl<R: Rng> TabularPolicy<R> {
    pub fn uniform(num_states: usize, num_actions: usize, rng: R) -> Result<Self> {
        if num_states == 0 || num_actions == 0 {
            return Err(EstimationError::InvalidConfiguration(
                "policy needs at least one state and one action",
            ));
        }
        let row = vec![1.0 / num_actions as f64; num_actions];
        let sampler = WeightedIndex::new(&row)?;
        Ok(Self {
            num_actions,
            probabilities: vec![row; num_states],
            samplers: vec![sampler; num_states],
            rng,
        })
    }

    pub fn num_states(&self) -> usize {
        self.probabilities.len()
    }

    /// Current action distribution of `state`.
    pub fn distribution(&self, state: State) -> Option<&[f64]> {
        self.probabilities.get(state).map(Vec::as_slice)
    }
}

impl<R: Rng> Policy for TabularPolicy<R> {
    fn sample_action(&mut self, state: State) -> Action {
        match self.samplers.get(state) {
            Some(sampler) => sampler.sample(&mut self.rng),
            // unknown states behave uniformly
            None => self.rng.gen_range(0..self.num_actions),
        }
    }

    fn action_prob(&self, state: State, action: Action) -> f64 {
        self.probabilities
            .get(state)
            .and_then(|row| row.get(action))
            .copied()
            .unwrap_or(0.0)
    }
}

impl<R: Rng> ImprovablePolicy for TabularPolicy<R> {
    fn set_optimal_action(
        &mut self,
        state: State,
        action: Action,
        epsilon: Option<f64>,
    ) -> Result<()> {
        if state >= self.probabilities.len() {
            return Err(EstimationError::StateOutOfRange(state));
        }
        if action >= self.num_actions {
            return Err(EstimationError::ActionOutOfRange(action));
        }
        let epsilon = epsilon.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(EstimationError::InvalidConfiguration(
                "epsilon must lie in [0, 1]",
            ));
        }
        let explore = epsilon / self.num_actions as f64;
        let mut row = vec![explore; self.num_actions];
        row[action] += 1.0 - epsilon;
        self.samplers[state] = WeightedIndex::new(&row)?;
        self.probabilities[state] = row;
        Ok(())
    }
}
