use rand::Rng;

use crate::env::{Action, State};
use crate::policy::Policy;

/// Baseline policy that samples uniformly from the action set in every state.
pub struct RandomPolicy<R: Rng> {
    num_actions: usize,
    rng: R,
}

impl<R: Rng> RandomPolicy<R> {
    pub fn new(num_actions: usize, rng: R) -> Self {
        Self { num_actions, rng }
    }
}

impl<R: Rng> Policy for RandomPolicy<R> {
    fn sample_action(&mut self, _state: State) -> Action {
        self.rng.gen_range(0..self.num_actions)
    }

    fn action_prob(&self, _state: State, action: Action) -> f64 {
        if action < self.num_actions {
            1.0 / self.num_actions as f64
        } else {
            0.0
        }
    }
}
