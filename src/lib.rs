//! Tabular Monte Carlo estimation for discrete episodic environments.

pub mod agent;
pub mod env;
pub mod episode;
pub mod error;
pub mod estimator;
pub mod improvement;
pub mod iteration;
pub mod mock;
pub mod off_policy;
pub mod policies;
pub mod policy;
pub mod returns;

pub use crate::agent::{QTable, TabularAgent, ValueTable};
pub use crate::env::{Action, Environment, State, Step};
pub use crate::episode::{Episode, Transition, VisitIndex, VisitMode, generate_episode};
pub use crate::error::{EstimationError, Result};
pub use crate::estimator::{
    DEFAULT_MAX_EPISODES, DEFAULT_MAX_STEPS, EstimationRun, MonteCarlo, MonteCarloBuilder,
    MonteCarloConfig, PredictionReport, VisitCounter, incremental_mean,
};
pub use crate::improvement::{DEFAULT_EPSILON, ImprovementMode, greedy_action, improve_policy};
pub use crate::iteration::{IterationConfig, IterationReport};
pub use crate::off_policy::{CumulativeWeights, OffPolicyReport};
pub use crate::policies::{GreedyPolicy, RandomPolicy, TabularPolicy};
pub use crate::policy::{ImprovablePolicy, Policy};
pub use crate::returns::{ReturnAccumulator, discounted_returns};
