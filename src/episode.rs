use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::env::{Action, Environment, State};
use crate::error::{EstimationError, Result};
use crate::policy::Policy;
use crate::returns::discounted_returns;

/// Which encounters of a key within one episode contribute to its estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitMode {
    /// Only the earliest timestep of each key counts.
    FirstVisit,
    /// Every timestep of each key counts.
    #[default]
    EveryVisit,
}

/// One step of a trajectory. `ret` is zero until returns are computed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: State,
    pub action: Action,
    pub reward: f64,
    pub ret: f64,
}

/// Timesteps at which each key was recorded during a single episode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitIndex<K: Ord> {
    visits: BTreeMap<K, Vec<usize>>,
}

impl<K: Ord> VisitIndex<K> {
    pub fn new() -> Self {
        Self {
            visits: BTreeMap::new(),
        }
    }

    /// Records `key` at timestep `t`; first-visit mode ignores repeats.
    pub fn record(&mut self, key: K, t: usize, mode: VisitMode) {
        let timesteps = self.visits.entry(key).or_default();
        if mode == VisitMode::EveryVisit || timesteps.is_empty() {
            timesteps.push(t);
        }
    }

    pub fn timesteps(&self, key: &K) -> &[usize] {
        self.visits.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &K) -> bool {
        self.visits.contains_key(key)
    }

    /// Keys in ascending order with their recorded timesteps.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[usize])> {
        self.visits.iter().map(|(key, ts)| (key, ts.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

impl<K: Ord> Default for VisitIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished (or truncated) interaction with the environment.
#[derive(Clone, Debug)]
pub struct Episode {
    transitions: Vec<Transition>,
    state_visits: VisitIndex<State>,
    action_visits: VisitIndex<(State, Action)>,
    truncated: bool,
}

impl Episode {
    fn new() -> Self {
        Self {
            transitions: Vec::new(),
            state_visits: VisitIndex::new(),
            action_visits: VisitIndex::new(),
            truncated: false,
        }
    }

    fn push(&mut self, state: State, action: Action, reward: f64, mode: VisitMode) {
        let t = self.transitions.len();
        self.transitions.push(Transition {
            state,
            action,
            reward,
            ret: 0.0,
        });
        self.state_visits.record(state, t, mode);
        self.action_visits.record((state, action), t, mode);
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn state_visits(&self) -> &VisitIndex<State> {
        &self.state_visits
    }

    pub fn action_visits(&self) -> &VisitIndex<(State, Action)> {
        &self.action_visits
    }

    /// True when the step limit was hit before the environment reported `done`.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn rewards(&self) -> impl Iterator<Item = f64> + '_ {
        self.transitions.iter().map(|step| step.reward)
    }

    /// Fills every transition's `ret` with its discounted return.
    pub fn compute_returns(&mut self, discount: f64) {
        let rewards: Vec<f64> = self.rewards().collect();
        for (step, ret) in self
            .transitions
            .iter_mut()
            .zip(discounted_returns(&rewards, discount))
        {
            step.ret = ret;
        }
    }

    /// Sum of the computed returns at the given timesteps.
    pub fn sum_returns(&self, timesteps: &[usize]) -> f64 {
        timesteps.iter().map(|&t| self.transitions[t].ret).sum()
    }

    /// Lazily walks the trajectory from the last timestep to the first.
    pub fn backward(&self) -> impl Iterator<Item = (usize, &Transition)> {
        self.transitions.iter().enumerate().rev()
    }
}

/// Rolls out one episode of at most `max_steps` steps.
///
/// The environment is reset first; the loop stops early on `done`. Visit
/// indices are recorded per `mode`. No value table is touched.
pub fn generate_episode<E, P>(
    env: &mut E,
    policy: &mut P,
    max_steps: usize,
    mode: VisitMode,
) -> Result<Episode>
where
    E: Environment + ?Sized,
    P: Policy + ?Sized,
{
    let num_states = env.num_states();
    let num_actions = env.num_actions();
    let mut episode = Episode::new();
    let mut state = env.reset();
    for _ in 0..max_steps {
        if state >= num_states {
            return Err(EstimationError::StateOutOfRange(state));
        }
        let action = policy.sample_action(state);
        if action >= num_actions {
            return Err(EstimationError::ActionOutOfRange(action));
        }
        let step = env.step(action);
        episode.push(state, action, step.reward, mode);
        if step.done {
            return Ok(episode);
        }
        state = step.next_state;
    }
    episode.truncated = true;
    warn!(
        "episode truncated after {max_steps} steps without reaching a terminal state"
    );
    Ok(episode)
}
