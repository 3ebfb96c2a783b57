use serde::{Deserialize, Serialize};

/// Discrete state identifier, stable for the lifetime of an environment.
pub type State = usize;

/// Discrete action identifier drawn from the same finite set in every state.
pub type Action = usize;

/// Result of a single environment transition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub next_state: State,
    pub reward: f64,
    pub done: bool,
}

/// Episodic environment over a finite state and action space.
pub trait Environment {
    fn num_states(&self) -> usize;
    fn num_actions(&self) -> usize;
    /// Puts the environment back at a start state and returns it.
    fn reset(&mut self) -> State;
    fn step(&mut self, action: Action) -> Step;
}

impl<E: Environment + ?Sized> Environment for &mut E {
    fn num_states(&self) -> usize {
        (**self).num_states()
    }

    fn num_actions(&self) -> usize {
        (**self).num_actions()
    }

    fn reset(&mut self) -> State {
        (**self).reset()
    }

    fn step(&mut self, action: Action) -> Step {
        (**self).step(action)
    }
}
