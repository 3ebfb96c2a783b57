pub mod greedy;
pub mod random;
pub mod tabular;

pub use greedy::GreedyPolicy;
pub use random::RandomPolicy;
pub use tabular::TabularPolicy;
