use crate::env::{Action, State};
use crate::error::Result;

/// Action-selection rule an episode is sampled under.
pub trait Policy {
    fn sample_action(&mut self, state: State) -> Action;
    /// Probability of choosing `action` in `state`, in `[0, 1]`.
    fn action_prob(&self, state: State, action: Action) -> f64;
}

/// Policy whose per-state choice can be overwritten by policy improvement.
pub trait ImprovablePolicy: Policy {
    /// Makes `action` the preferred action in `state`. Without `epsilon` the
    /// state becomes deterministic; with it, `epsilon` of the mass is spread
    /// uniformly over all actions.
    fn set_optimal_action(
        &mut self,
        state: State,
        action: Action,
        epsilon: Option<f64>,
    ) -> Result<()>;
}

impl<P: Policy + ?Sized> Policy for &mut P {
    fn sample_action(&mut self, state: State) -> Action {
        (**self).sample_action(state)
    }

    fn action_prob(&self, state: State, action: Action) -> f64 {
        (**self).action_prob(state, action)
    }
}

impl<P: ImprovablePolicy + ?Sized> ImprovablePolicy for &mut P {
    fn set_optimal_action(
        &mut self,
        state: State,
        action: Action,
        epsilon: Option<f64>,
    ) -> Result<()> {
        (**self).set_optimal_action(state, action, epsilon)
    }
}
