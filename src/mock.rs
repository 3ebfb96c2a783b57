//! Deterministic environments and policies for exercising the estimators.

use std::collections::HashMap;

use crate::env::{Action, Environment, State, Step};
use crate::policy::Policy;

/// Replays a fixed sequence of states and rewards, ignoring the actions taken.
///
/// `states[t]` is the state observed at timestep `t` and `rewards[t]` the
/// reward for leaving it. Past the end of the script the environment idles
/// on the last state with zero reward.
#[derive(Debug, Clone)]
pub struct ScriptedEnv {
    num_states: usize,
    num_actions: usize,
    states: Vec<State>,
    rewards: Vec<f64>,
    terminal: bool,
    cursor: usize,
}

impl ScriptedEnv {
    /// # Panics
    ///
    /// Panics if `states` is empty.
    pub fn new(
        num_states: usize,
        num_actions: usize,
        states: Vec<State>,
        rewards: Vec<f64>,
    ) -> Self {
        assert!(!states.is_empty(), "script needs a start state");
        Self {
            num_states,
            num_actions,
            states,
            rewards,
            terminal: true,
            cursor: 0,
        }
    }

    /// Never reports `done`, so every episode runs into the step limit.
    pub fn without_terminal(mut self) -> Self {
        self.terminal = false;
        self
    }

    fn state_at(&self, t: usize) -> State {
        self.states
            .get(t)
            .or_else(|| self.states.last())
            .copied()
            .unwrap_or_default()
    }
}

impl Environment for ScriptedEnv {
    fn num_states(&self) -> usize {
        self.num_states
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn reset(&mut self) -> State {
        self.cursor = 0;
        self.state_at(0)
    }

    fn step(&mut self, _action: Action) -> Step {
        let reward = self.rewards.get(self.cursor).copied().unwrap_or(0.0);
        self.cursor += 1;
        Step {
            next_state: self.state_at(self.cursor),
            reward,
            done: self.terminal && self.cursor == self.rewards.len(),
        }
    }
}

/// One-dimensional corridor: action 0 moves left, action 1 moves right.
///
/// Episodes start in cell 0; every step costs -1 and reaching the last cell
/// ends the episode.
#[derive(Debug, Clone)]
pub struct CorridorEnv {
    length: usize,
    position: usize,
}

impl CorridorEnv {
    pub const LEFT: Action = 0;
    pub const RIGHT: Action = 1;

    /// # Panics
    ///
    /// Panics if `length` is below 2.
    pub fn new(length: usize) -> Self {
        assert!(length >= 2, "corridor needs a start and a goal cell");
        Self {
            length,
            position: 0,
        }
    }
}

impl Environment for CorridorEnv {
    fn num_states(&self) -> usize {
        self.length
    }

    fn num_actions(&self) -> usize {
        2
    }

    fn reset(&mut self) -> State {
        self.position = 0;
        self.position
    }

    fn step(&mut self, action: Action) -> Step {
        if action == Self::RIGHT {
            self.position = (self.position + 1).min(self.length - 1);
        } else {
            self.position = self.position.saturating_sub(1);
        }
        Step {
            next_state: self.position,
            reward: -1.0,
            done: self.position == self.length - 1,
        }
    }
}

/// Single-state environment where each action pays a fixed reward and ends the episode.
#[derive(Debug, Clone)]
pub struct BanditEnv {
    payouts: Vec<f64>,
}

impl BanditEnv {
    pub fn new(payouts: Vec<f64>) -> Self {
        Self { payouts }
    }
}

impl Environment for BanditEnv {
    fn num_states(&self) -> usize {
        1
    }

    fn num_actions(&self) -> usize {
        self.payouts.len()
    }

    fn reset(&mut self) -> State {
        0
    }

    fn step(&mut self, action: Action) -> Step {
        Step {
            next_state: 0,
            reward: self.payouts.get(action).copied().unwrap_or(0.0),
            done: true,
        }
    }
}

/// Cycles through a fixed action list and reports configurable probabilities.
#[derive(Debug, Clone)]
pub struct ScriptedPolicy {
    actions: Vec<Action>,
    cursor: usize,
    probabilities: Vec<f64>,
    overrides: HashMap<(State, Action), f64>,
}

impl ScriptedPolicy {
    /// `probabilities[a]` is reported for action `a` in every state.
    ///
    /// # Panics
    ///
    /// Panics if `actions` is empty.
    pub fn new(actions: Vec<Action>, probabilities: Vec<f64>) -> Self {
        assert!(!actions.is_empty(), "script needs at least one action");
        Self {
            actions,
            cursor: 0,
            probabilities,
            overrides: HashMap::new(),
        }
    }

    /// Always plays `action`, reporting it as certain.
    pub fn constant(action: Action, num_actions: usize) -> Self {
        let mut probabilities = vec![0.0; num_actions.max(action + 1)];
        probabilities[action] = 1.0;
        Self::new(vec![action], probabilities)
    }

    /// Overrides the reported probability of a single state-action pair.
    pub fn with_probability(mut self, state: State, action: Action, probability: f64) -> Self {
        self.overrides.insert((state, action), probability);
        self
    }
}

impl Policy for ScriptedPolicy {
    fn sample_action(&mut self, _state: State) -> Action {
        let action = self.actions[self.cursor % self.actions.len()];
        self.cursor += 1;
        action
    }

    fn action_prob(&self, state: State, action: Action) -> f64 {
        self.overrides
            .get(&(state, action))
            .or_else(|| self.probabilities.get(action))
            .copied()
            .unwrap_or(0.0)
    }
}
