//! Discounted return bookkeeping.
//!
//! Returns are accumulated from the last timestep towards the first:
//! `G[last] = r[last]` and `G[t] = r[t] + discount * G[t + 1]`.

/// Running return for a backward walk over a trajectory.
#[derive(Clone, Copy, Debug)]
pub struct ReturnAccumulator {
    discount: f64,
    ret: f64,
}

impl ReturnAccumulator {
    pub fn new(discount: f64) -> Self {
        Self { discount, ret: 0.0 }
    }

    /// Folds in the reward of the previous timestep and returns its return.
    pub fn push(&mut self, reward: f64) -> f64 {
        self.ret = reward + self.discount * self.ret;
        self.ret
    }

    pub fn current(&self) -> f64 {
        self.ret
    }
}

/// Per-timestep discounted returns for a reward sequence, in forward order.
pub fn discounted_returns(rewards: &[f64], discount: f64) -> Vec<f64> {
    let mut acc = ReturnAccumulator::new(discount);
    let mut returns = vec![0.0; rewards.len()];
    for (slot, reward) in returns.iter_mut().zip(rewards).rev() {
        *slot = acc.push(*reward);
    }
    returns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfies_backward_recurrence() {
        let rewards = [0.5, -1.0, 2.0, 0.0, 3.0];
        let discount = 0.8;
        let returns = discounted_returns(&rewards, discount);
        let last = rewards.len() - 1;
        assert_eq!(returns[last], rewards[last]);
        for t in 0..last {
            assert!((returns[t] - (rewards[t] + discount * returns[t + 1])).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_reward_chain() {
        let returns = discounted_returns(&[1.0, 1.0, 1.0], 0.9);
        let expected = [2.71, 1.9, 1.0];
        for (got, want) in returns.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
    }

    #[test]
    fn zero_discount_keeps_immediate_rewards() {
        assert_eq!(discounted_returns(&[3.0, -2.0, 7.0], 0.0), vec![3.0, -2.0, 7.0]);
    }

    #[test]
    fn empty_trajectory_has_no_returns() {
        assert!(discounted_returns(&[], 0.9).is_empty());
    }

    #[test]
    fn accumulator_tracks_latest_return() {
        let mut acc = ReturnAccumulator::new(0.5);
        assert_eq!(acc.push(2.0), 2.0);
        assert_eq!(acc.push(1.0), 2.0);
        assert_eq!(acc.current(), 2.0);
    }
}
