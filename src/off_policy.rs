//! Importance-sampling corrections for episodes sampled under a behavior
//! policy that differs from the policy being evaluated.

use std::collections::HashMap;

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::agent::QTable;
use crate::env::{Action, Environment, State};
use crate::episode::{Episode, VisitMode};
use crate::error::{EstimationError, Result};
use crate::estimator::{EstimationRun, MonteCarlo, PredictionReport};
use crate::improvement::greedy_action;
use crate::policy::Policy;
use crate::returns::ReturnAccumulator;

const PROGRESS_INTERVAL: usize = 10;
const REFERENCE_INTERVAL: usize = 100;

/// Running sum of importance weights per state-action pair.
#[derive(Clone, Debug, Default)]
pub struct CumulativeWeights {
    weights: HashMap<(State, Action), f64>,
}

impl CumulativeWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `weight` to the pair's total and returns the new total.
    pub fn add(&mut self, key: (State, Action), weight: f64) -> f64 {
        let total = self.weights.entry(key).or_insert(0.0);
        *total += weight;
        *total
    }

    pub fn get(&self, key: &(State, Action)) -> f64 {
        self.weights.get(key).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Summary of an off-policy call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OffPolicyReport {
    pub prediction: PredictionReport,
    /// Per episode, the earliest timestep that received an update. Every
    /// timestep before it was cut off by a zero importance weight.
    pub updated_from: Vec<usize>,
    /// `(episode index, error norm)` against reference Q values, sampled
    /// every 100 episodes when a reference was supplied.
    pub reference_errors: Vec<(usize, f64)>,
}

/// Probability the behavior policy assigned to a pair it actually sampled.
fn behavior_prob<B: Policy + ?Sized>(behavior: &B, state: State, action: Action) -> Result<f64> {
    let probability = behavior.action_prob(state, action);
    if probability > 0.0 && probability.is_finite() {
        Ok(probability)
    } else {
        Err(EstimationError::InvalidPolicy {
            state,
            action,
            probability,
        })
    }
}

/// Euclidean distance between two Q tables over the whole state-action space.
fn q_error_norm<A: QTable + ?Sized>(
    agent: &A,
    reference: &dyn QTable,
    num_states: usize,
    num_actions: usize,
) -> f64 {
    let mut sum = 0.0;
    for state in 0..num_states {
        for action in 0..num_actions {
            let diff = agent.q_value(state, action) - reference.q_value(state, action);
            sum += diff * diff;
        }
    }
    sum.sqrt()
}

/// Weighted backward pass over one episode.
///
/// Each step's Q entry moves towards its return with step size
/// `w / C(s, a)`. Afterwards `w` is scaled by `target_factor / b(s, a)`;
/// once it reaches zero the walk stops and earlier steps keep their values.
/// Returns the earliest timestep updated.
///
/// Behavior probabilities of the whole episode are checked before any
/// update, so an invalid policy leaves the tables untouched. A weight that
/// overflows aborts the walk with the steps after it already applied; no
/// non-finite value is ever written.
fn weighted_backward_update<A, B, F>(
    episode: &Episode,
    discount: f64,
    weights: &mut CumulativeWeights,
    agent: &mut A,
    behavior: &B,
    mut target_factor: F,
) -> Result<usize>
where
    A: QTable + ?Sized,
    B: Policy + ?Sized,
    F: FnMut(&A, State, Action) -> f64,
{
    let probabilities = episode
        .transitions()
        .iter()
        .map(|step| behavior_prob(behavior, step.state, step.action))
        .collect::<Result<Vec<f64>>>()?;
    let mut returns = ReturnAccumulator::new(discount);
    let mut weight = 1.0;
    let mut earliest = episode.len();
    for (t, step) in episode.backward() {
        let (state, action) = (step.state, step.action);
        let b = probabilities[t];
        let ret = returns.push(step.reward);
        let cumulative = weights.add((state, action), weight);
        let old = agent.q_value(state, action);
        agent.set_q_value(state, action, old + (weight / cumulative) * (ret - old));
        earliest = t;

        weight *= target_factor(&*agent, state, action) / b;
        if weight == 0.0 {
            trace!("importance weight vanished at t = {t}; earlier steps skipped");
            break;
        }
        if !weight.is_finite() {
            return Err(EstimationError::WeightOverflow { state, action });
        }
    }
    Ok(earliest)
}

impl<E: Environment> MonteCarlo<E> {
    /// Evaluates `target` from episodes sampled under `behavior` using
    /// weighted importance sampling.
    pub fn off_policy_q_prediction<A, T, B>(
        &mut self,
        run: &mut EstimationRun,
        agent: &mut A,
        target: &T,
        behavior: &mut B,
    ) -> Result<OffPolicyReport>
    where
        A: QTable + ?Sized,
        T: Policy + ?Sized,
        B: Policy + ?Sized,
    {
        self.off_policy(run, agent, behavior, None, |_, state, action| {
            target.action_prob(state, action)
        })
    }

    /// Learns the greedy policy of `agent`'s own Q table from episodes
    /// sampled under `behavior`.
    ///
    /// The target is deterministic, so each ratio is `1 / b(s, a)` and the
    /// backward walk stops at the first step whose behavior action differs
    /// from the greedy action after that step's update.
    pub fn off_policy_q_control<A, B>(
        &mut self,
        run: &mut EstimationRun,
        agent: &mut A,
        behavior: &mut B,
    ) -> Result<OffPolicyReport>
    where
        A: QTable + ?Sized,
        B: Policy + ?Sized,
    {
        self.control(run, agent, behavior, None)
    }

    /// [`off_policy_q_control`](Self::off_policy_q_control) that also
    /// measures the distance of `agent` to known Q values every 100
    /// episodes, logged at `info` and kept in the report.
    pub fn off_policy_q_control_against<A, B, R>(
        &mut self,
        run: &mut EstimationRun,
        agent: &mut A,
        behavior: &mut B,
        reference: &R,
    ) -> Result<OffPolicyReport>
    where
        A: QTable + ?Sized,
        B: Policy + ?Sized,
        R: QTable,
    {
        self.control(run, agent, behavior, Some(reference as &dyn QTable))
    }

    fn control<A, B>(
        &mut self,
        run: &mut EstimationRun,
        agent: &mut A,
        behavior: &mut B,
        reference: Option<&dyn QTable>,
    ) -> Result<OffPolicyReport>
    where
        A: QTable + ?Sized,
        B: Policy + ?Sized,
    {
        let num_actions = self.num_actions();
        self.off_policy(run, agent, behavior, reference, |agent: &A, state, action| {
            if greedy_action(agent, state, num_actions) == action {
                1.0
            } else {
                0.0
            }
        })
    }

    fn off_policy<A, B, F>(
        &mut self,
        run: &mut EstimationRun,
        agent: &mut A,
        behavior: &mut B,
        reference: Option<&dyn QTable>,
        mut target_factor: F,
    ) -> Result<OffPolicyReport>
    where
        A: QTable + ?Sized,
        B: Policy + ?Sized,
        F: FnMut(&A, State, Action) -> f64,
    {
        let discount = self.config().discount;
        let mut report = OffPolicyReport::default();
        for index in 0..self.config().max_episodes {
            if index % PROGRESS_INTERVAL == 0 {
                info!("off-policy episode {index}");
            }
            if let Some(reference) = reference {
                if index % REFERENCE_INTERVAL == 0 {
                    let error =
                        q_error_norm(&*agent, reference, self.num_states(), self.num_actions());
                    info!("off-policy episode {index}: error {error}");
                    report.reference_errors.push((index, error));
                }
            }
            let episode = self.generate_episode(behavior, VisitMode::EveryVisit)?;
            let earliest = weighted_backward_update(
                &episode,
                discount,
                &mut run.cumulative_weights,
                agent,
                &*behavior,
                &mut target_factor,
            )?;
            run.episodes += 1;
            report.prediction.record(&episode);
            report.updated_from.push(earliest);
            debug!(
                "off-policy episode {}: {} steps, updated from t = {earliest}",
                run.episodes,
                episode.len()
            );
        }
        Ok(report)
    }
}
