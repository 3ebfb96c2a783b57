use crate::agent::QTable;
use crate::env::{Action, State};
use crate::improvement::greedy_action;
use crate::policy::Policy;

/// Deterministic view over a Q table that always picks the greedy action.
pub struct GreedyPolicy<'a, Q: QTable + ?Sized> {
    q: &'a Q,
    num_actions: usize,
}

impl<'a, Q: QTable + ?Sized> GreedyPolicy<'a, Q> {
    pub fn new(q: &'a Q, num_actions: usize) -> Self {
        Self { q, num_actions }
    }

    pub fn action(&self, state: State) -> Action {
        greedy_action(self.q, state, self.num_actions)
    }
}

impl<Q: QTable + ?Sized> Policy for GreedyPolicy<'_, Q> {
    fn sample_action(&mut self, state: State) -> Action {
        self.action(state)
    }

    fn action_prob(&self, state: State, action: Action) -> f64 {
        if action == self.action(state) { 1.0 } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TabularAgent;
    use crate::error::Result;

    #[test]
    fn puts_all_mass_on_the_argmax() -> Result<()> {
        let mut agent = TabularAgent::new(2, 3)?;
        agent.set_q_value(1, 2, 3.0);
        let mut policy = GreedyPolicy::new(&agent, 3);
        assert_eq!(policy.sample_action(1), 2);
        assert_eq!(policy.action_prob(1, 2), 1.0);
        assert_eq!(policy.action_prob(1, 0), 0.0);
        // all-zero row falls back to the first action
        assert_eq!(policy.sample_action(0), 0);
        Ok(())
    }
}
