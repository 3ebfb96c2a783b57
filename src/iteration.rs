use log::info;
use serde::{Deserialize, Serialize};

use crate::agent::QTable;
use crate::env::Environment;
use crate::episode::VisitMode;
use crate::error::{EstimationError, Result};
use crate::estimator::{EstimationRun, MonteCarlo, PredictionReport};
use crate::improvement::ImprovementMode;
use crate::policy::ImprovablePolicy;

/// Schedule for alternating Q prediction and policy improvement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationConfig {
    pub rounds: usize,
    pub episodes_per_round: usize,
    pub visit_mode: VisitMode,
    pub improvement: ImprovementMode,
}

impl IterationConfig {
    /// Ten rounds of ten first-visit episodes each, greedy improvement.
    pub fn policy_iteration() -> Self {
        Self {
            rounds: 10,
            episodes_per_round: 10,
            visit_mode: VisitMode::FirstVisit,
            improvement: ImprovementMode::Greedy,
        }
    }

    /// A hundred rounds with a single prediction episode between improvements.
    pub fn value_iteration() -> Self {
        Self {
            rounds: 100,
            episodes_per_round: 1,
            ..Self::policy_iteration()
        }
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_episodes_per_round(mut self, episodes: usize) -> Self {
        self.episodes_per_round = episodes;
        self
    }

    pub fn with_visit_mode(mut self, visit_mode: VisitMode) -> Self {
        self.visit_mode = visit_mode;
        self
    }

    pub fn with_improvement(mut self, improvement: ImprovementMode) -> Self {
        self.improvement = improvement;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.episodes_per_round == 0 {
            return Err(EstimationError::InvalidConfiguration(
                "each round needs at least one prediction episode",
            ));
        }
        if let Some(epsilon) = self.improvement.epsilon() {
            if !(0.0..=1.0).contains(&epsilon) {
                return Err(EstimationError::InvalidConfiguration(
                    "epsilon must lie in [0, 1]",
                ));
            }
        }
        Ok(())
    }
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self::policy_iteration()
    }
}

/// Summary of a policy or value iteration call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationReport {
    pub rounds: usize,
    pub prediction: PredictionReport,
}

impl<E: Environment> MonteCarlo<E> {
    /// Alternates Q prediction under `policy` with improvement of `policy`.
    ///
    /// Every round opens a fresh [`EstimationRun`], so the round's estimates
    /// average only episodes sampled under the policy of that round.
    pub fn policy_iteration<A, P>(
        &mut self,
        agent: &mut A,
        policy: &mut P,
        schedule: &IterationConfig,
    ) -> Result<IterationReport>
    where
        A: QTable + ?Sized,
        P: ImprovablePolicy + ?Sized,
    {
        schedule.validate()?;
        let mut report = IterationReport::default();
        for round in 0..schedule.rounds {
            let mut run = EstimationRun::new();
            let prediction = self.predict_q(
                &mut run,
                agent,
                policy,
                schedule.episodes_per_round,
                schedule.visit_mode,
            )?;
            self.policy_improvement(&*agent, policy, schedule.improvement)?;
            report.rounds += 1;
            report.prediction.merge(&prediction);
            info!(
                "round {round}: {} episodes, {} truncated",
                prediction.episodes, prediction.truncated_episodes
            );
        }
        Ok(report)
    }

    /// Policy iteration with [`IterationConfig::value_iteration`] pacing and
    /// the given improvement mode.
    pub fn value_iteration<A, P>(
        &mut self,
        agent: &mut A,
        policy: &mut P,
        improvement: ImprovementMode,
    ) -> Result<IterationReport>
    where
        A: QTable + ?Sized,
        P: ImprovablePolicy + ?Sized,
    {
        let schedule = IterationConfig::value_iteration().with_improvement(improvement);
        self.policy_iteration(agent, policy, &schedule)
    }
}
