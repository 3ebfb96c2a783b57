use serde::{Deserialize, Serialize};

use crate::agent::QTable;
use crate::env::{Action, Environment, State};
use crate::error::Result;
use crate::estimator::MonteCarlo;
use crate::policy::ImprovablePolicy;

/// Exploration mass used by [`ImprovementMode::epsilon_greedy`].
pub const DEFAULT_EPSILON: f64 = 0.1;

/// How policy improvement rewrites each state's action distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ImprovementMode {
    /// Deterministic choice of the greedy action.
    #[default]
    Greedy,
    /// Greedy action plus `epsilon` spread uniformly over all actions.
    EpsilonGreedy { epsilon: f64 },
}

impl ImprovementMode {
    pub fn epsilon_greedy() -> Self {
        ImprovementMode::EpsilonGreedy {
            epsilon: DEFAULT_EPSILON,
        }
    }

    pub fn epsilon(&self) -> Option<f64> {
        match self {
            ImprovementMode::Greedy => None,
            ImprovementMode::EpsilonGreedy { epsilon } => Some(*epsilon),
        }
    }
}

/// Action with the strictly greatest Q value; ties go to the lowest index.
pub fn greedy_action<Q: QTable + ?Sized>(q: &Q, state: State, num_actions: usize) -> Action {
    let mut best: Option<(Action, f64)> = None;
    for action in 0..num_actions {
        let value = q.q_value(state, action);
        if best.is_none_or(|(_, best_value)| value > best_value) {
            best = Some((action, value));
        }
    }
    best.map(|(action, _)| action).unwrap_or(0)
}

/// Points every state of `policy` at its greedy action under `q`.
pub fn improve_policy<Q, P>(
    q: &Q,
    policy: &mut P,
    num_states: usize,
    num_actions: usize,
    mode: ImprovementMode,
) -> Result<()>
where
    Q: QTable + ?Sized,
    P: ImprovablePolicy + ?Sized,
{
    for state in 0..num_states {
        let action = greedy_action(q, state, num_actions);
        policy.set_optimal_action(state, action, mode.epsilon())?;
    }
    Ok(())
}

impl<E: Environment> MonteCarlo<E> {
    /// Policy improvement over the environment's whole state space.
    pub fn policy_improvement<Q, P>(
        &self,
        q: &Q,
        policy: &mut P,
        mode: ImprovementMode,
    ) -> Result<()>
    where
        Q: QTable + ?Sized,
        P: ImprovablePolicy + ?Sized,
    {
        improve_policy(q, policy, self.num_states(), self.num_actions(), mode)
    }
}
