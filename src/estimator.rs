use std::collections::HashMap;
use std::hash::Hash;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::agent::{QTable, ValueTable};
use crate::env::{Action, Environment, State};
use crate::episode::{Episode, VisitMode, generate_episode};
use crate::error::{EstimationError, Result};
use crate::off_policy::CumulativeWeights;
use crate::policy::Policy;

pub const DEFAULT_MAX_STEPS: usize = 1000;
pub const DEFAULT_MAX_EPISODES: usize = 100;

/// Settings shared by every estimator call on a [`MonteCarlo`] instance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub discount: f64,
    pub max_steps: usize,
    pub max_episodes: usize,
    pub visit_mode: VisitMode,
}

impl MonteCarloConfig {
    pub fn builder(discount: f64) -> MonteCarloBuilder {
        MonteCarloBuilder::new(discount)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(EstimationError::InvalidConfiguration(
                "discount must lie in [0, 1]",
            ));
        }
        if self.max_steps == 0 {
            return Err(EstimationError::InvalidConfiguration(
                "episodes need at least one step",
            ));
        }
        Ok(())
    }
}

/// Builder for [`MonteCarloConfig`]; unset fields keep the defaults.
#[derive(Clone, Copy, Debug)]
pub struct MonteCarloBuilder {
    config: MonteCarloConfig,
}

impl MonteCarloBuilder {
    pub fn new(discount: f64) -> Self {
        Self {
            config: MonteCarloConfig {
                discount,
                max_steps: DEFAULT_MAX_STEPS,
                max_episodes: DEFAULT_MAX_EPISODES,
                visit_mode: VisitMode::default(),
            },
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.config.max_steps = max_steps;
        self
    }

    pub fn with_max_episodes(mut self, max_episodes: usize) -> Self {
        self.config.max_episodes = max_episodes;
        self
    }

    pub fn with_visit_mode(mut self, visit_mode: VisitMode) -> Self {
        self.config.visit_mode = visit_mode;
        self
    }

    pub fn build(self) -> Result<MonteCarloConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Total encounters per key across every episode of a run. Never decreases.
#[derive(Clone, Debug)]
pub struct VisitCounter<K: Eq + Hash> {
    counts: HashMap<K, u64>,
}

impl<K: Eq + Hash> VisitCounter<K> {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }

    /// Adds `visits` encounters and returns the post-increment count.
    pub fn increment(&mut self, key: K, visits: u64) -> u64 {
        let count = self.counts.entry(key).or_insert(0);
        *count += visits;
        *count
    }

    pub fn get(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl<K: Eq + Hash> Default for VisitCounter<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics that persist across episodes and calls within one estimation run.
///
/// A fresh run starts every counter and weight at zero; passing the same run
/// to several calls resumes the running averages where they left off.
#[derive(Clone, Debug, Default)]
pub struct EstimationRun {
    pub state_visits: VisitCounter<State>,
    pub action_visits: VisitCounter<(State, Action)>,
    pub cumulative_weights: CumulativeWeights,
    pub episodes: usize,
}

impl EstimationRun {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Summary of a prediction call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub episodes: usize,
    pub steps: usize,
    /// Episodes that hit the step limit without reaching a terminal state.
    pub truncated_episodes: usize,
}

impl PredictionReport {
    pub(crate) fn record(&mut self, episode: &Episode) {
        self.episodes += 1;
        self.steps += episode.len();
        if episode.is_truncated() {
            self.truncated_episodes += 1;
        }
    }

    pub fn merge(&mut self, other: &PredictionReport) {
        self.episodes += other.episodes;
        self.steps += other.steps;
        self.truncated_episodes += other.truncated_episodes;
    }
}

/// Incremental sample-mean update for `visits` new returns summing to
/// `returns_sum`, where `total` already includes those visits.
pub fn incremental_mean(old: f64, returns_sum: f64, visits: usize, total: u64) -> f64 {
    old + (returns_sum - visits as f64 * old) / total as f64
}

/// Monte Carlo estimators over a single environment.
pub struct MonteCarlo<E: Environment> {
    env: E,
    config: MonteCarloConfig,
}

impl<E: Environment> MonteCarlo<E> {
    pub fn new(env: E, config: MonteCarloConfig) -> Result<Self> {
        config.validate()?;
        if env.num_states() == 0 || env.num_actions() == 0 {
            return Err(EstimationError::InvalidConfiguration(
                "environment needs at least one state and one action",
            ));
        }
        Ok(Self { env, config })
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn num_states(&self) -> usize {
        self.env.num_states()
    }

    pub fn num_actions(&self) -> usize {
        self.env.num_actions()
    }

    pub fn into_env(self) -> E {
        self.env
    }

    /// Samples one episode under `policy` with the configured step limit.
    pub fn generate_episode<P: Policy + ?Sized>(
        &mut self,
        policy: &mut P,
        mode: VisitMode,
    ) -> Result<Episode> {
        generate_episode(&mut self.env, policy, self.config.max_steps, mode)
    }

    /// Estimates state values of `policy` over `max_episodes` episodes.
    pub fn value_prediction<A, P>(
        &mut self,
        run: &mut EstimationRun,
        agent: &mut A,
        policy: &mut P,
    ) -> Result<PredictionReport>
    where
        A: ValueTable + ?Sized,
        P: Policy + ?Sized,
    {
        let mut report = PredictionReport::default();
        for _ in 0..self.config.max_episodes {
            let mut episode = self.generate_episode(policy, self.config.visit_mode)?;
            episode.compute_returns(self.config.discount);
            for (&state, timesteps) in episode.state_visits().iter() {
                let total = run.state_visits.increment(state, timesteps.len() as u64);
                let updated = incremental_mean(
                    agent.value(state),
                    episode.sum_returns(timesteps),
                    timesteps.len(),
                    total,
                );
                agent.set_value(state, updated);
            }
            run.episodes += 1;
            report.record(&episode);
            debug!(
                "value prediction episode {}: {} steps, {} states updated",
                run.episodes,
                episode.len(),
                episode.state_visits().len()
            );
        }
        Ok(report)
    }

    /// Estimates action values of `policy` with the configured episode budget
    /// and visit mode.
    pub fn q_prediction<A, P>(
        &mut self,
        run: &mut EstimationRun,
        agent: &mut A,
        policy: &mut P,
    ) -> Result<PredictionReport>
    where
        A: QTable + ?Sized,
        P: Policy + ?Sized,
    {
        let (episodes, mode) = (self.config.max_episodes, self.config.visit_mode);
        self.predict_q(run, agent, policy, episodes, mode)
    }

    pub(crate) fn predict_q<A, P>(
        &mut self,
        run: &mut EstimationRun,
        agent: &mut A,
        policy: &mut P,
        episodes: usize,
        mode: VisitMode,
    ) -> Result<PredictionReport>
    where
        A: QTable + ?Sized,
        P: Policy + ?Sized,
    {
        let mut report = PredictionReport::default();
        for _ in 0..episodes {
            let mut episode = self.generate_episode(policy, mode)?;
            episode.compute_returns(self.config.discount);
            for (&(state, action), timesteps) in episode.action_visits().iter() {
                let total = run
                    .action_visits
                    .increment((state, action), timesteps.len() as u64);
                let updated = incremental_mean(
                    agent.q_value(state, action),
                    episode.sum_returns(timesteps),
                    timesteps.len(),
                    total,
                );
                agent.set_q_value(state, action, updated);
            }
            run.episodes += 1;
            report.record(&episode);
            debug!(
                "q prediction episode {}: {} steps, {} pairs updated",
                run.episodes,
                episode.len(),
                episode.action_visits().len()
            );
        }
        Ok(report)
    }
}
