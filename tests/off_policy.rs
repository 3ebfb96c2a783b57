use rand::SeedableRng;
use rand::rngs::StdRng;

use gridmc::mock::{BanditEnv, CorridorEnv, ScriptedEnv, ScriptedPolicy};
use gridmc::{
    EstimationError, EstimationRun, MonteCarlo, MonteCarloConfig, QTable, RandomPolicy,
    TabularAgent, VisitMode, greedy_action,
};

fn config(discount: f64, episodes: usize) -> MonteCarloConfig {
    MonteCarloConfig::builder(discount)
        .with_max_episodes(episodes)
        .build()
        .expect("valid config")
}

// four states visited in order, +1 per step
fn line_env() -> ScriptedEnv {
    ScriptedEnv::new(4, 2, vec![0, 1, 2, 3], vec![1.0; 4])
}

#[test]
fn matching_policies_reproduce_on_policy_estimates() -> Result<(), EstimationError> {
    const SEED: u64 = 42;
    let episodes = 12;

    let mut on = MonteCarlo::new(CorridorEnv::new(4), config(0.9, episodes))?;
    let mut on_agent = TabularAgent::for_env(on.env())?;
    let mut policy = RandomPolicy::new(2, StdRng::seed_from_u64(SEED));
    on.q_prediction(&mut EstimationRun::new(), &mut on_agent, &mut policy)?;

    let mut off = MonteCarlo::new(CorridorEnv::new(4), config(0.9, episodes))?;
    let mut off_agent = TabularAgent::for_env(off.env())?;
    let target = RandomPolicy::new(2, StdRng::seed_from_u64(0));
    let mut behavior = RandomPolicy::new(2, StdRng::seed_from_u64(SEED));
    let report = off.off_policy_q_prediction(
        &mut EstimationRun::new(),
        &mut off_agent,
        &target,
        &mut behavior,
    )?;

    assert_eq!(report.prediction.episodes, episodes);
    // no ratio ever vanishes, so every episode is processed in full
    assert!(report.updated_from.iter().all(|&t| t == 0));
    for state in 0..4 {
        for action in 0..2 {
            let diff = on_agent.q_value(state, action) - off_agent.q_value(state, action);
            assert!(diff.abs() < 1e-9, "mismatch at ({state}, {action}): {diff}");
        }
    }
    Ok(())
}

#[test]
fn zero_ratio_leaves_earlier_timesteps_untouched() -> Result<(), EstimationError> {
    let mut mc = MonteCarlo::new(line_env(), config(1.0, 1))?;
    let mut agent = TabularAgent::for_env(mc.env())?;
    // behavior plays 0, 1, 0, 0; the target never plays 1 in state 1
    let mut behavior = ScriptedPolicy::new(vec![0, 1, 0, 0], vec![0.5, 0.5]);
    let target = ScriptedPolicy::new(vec![0], vec![0.5, 0.5]).with_probability(1, 1, 0.0);
    let mut run = EstimationRun::new();
    let report = mc.off_policy_q_prediction(&mut run, &mut agent, &target, &mut behavior)?;

    assert_eq!(report.updated_from, vec![1]);
    assert_eq!(agent.q_value(3, 0), 1.0);
    assert_eq!(agent.q_value(2, 0), 2.0);
    assert_eq!(agent.q_value(1, 1), 3.0);
    assert_eq!(agent.q_value(0, 0), 0.0);
    assert_eq!(run.cumulative_weights.get(&(0, 0)), 0.0);
    assert_eq!(run.cumulative_weights.get(&(1, 1)), 1.0);
    Ok(())
}

#[test]
fn cumulative_weights_persist_within_a_run() -> Result<(), EstimationError> {
    let mut mc = MonteCarlo::new(BanditEnv::new(vec![4.0, 0.0]), config(1.0, 3))?;
    let mut agent = TabularAgent::for_env(mc.env())?;
    let mut behavior = ScriptedPolicy::new(vec![0], vec![0.5, 0.5]);
    let target = ScriptedPolicy::new(vec![0], vec![1.0, 0.0]);
    let mut run = EstimationRun::new();
    mc.off_policy_q_prediction(&mut run, &mut agent, &target, &mut behavior)?;
    mc.off_policy_q_prediction(&mut run, &mut agent, &target, &mut behavior)?;
    assert_eq!(run.cumulative_weights.get(&(0, 0)), 6.0);
    assert_eq!(run.episodes, 6);
    assert_eq!(agent.q_value(0, 0), 4.0);
    Ok(())
}

#[test]
fn zero_behavior_probability_aborts_the_call() -> Result<(), EstimationError> {
    let mut mc = MonteCarlo::new(line_env(), config(1.0, 5))?;
    let mut agent = TabularAgent::for_env(mc.env())?;
    let mut behavior = ScriptedPolicy::new(vec![0], vec![0.0, 1.0]);
    let target = ScriptedPolicy::new(vec![0], vec![1.0, 0.0]);
    let result =
        mc.off_policy_q_prediction(&mut EstimationRun::new(), &mut agent, &target, &mut behavior);
    match result {
        Err(EstimationError::InvalidPolicy {
            state,
            action,
            probability,
        }) => {
            assert_eq!((state, action), (3, 0));
            assert_eq!(probability, 0.0);
        }
        other => panic!("expected an invalid policy error, got {other:?}"),
    }
    for state in 0..4 {
        assert!(agent.q_value(state, 0).is_finite());
    }
    Ok(())
}

#[test]
fn control_stops_where_behavior_leaves_the_greedy_path() -> Result<(), EstimationError> {
    let env = ScriptedEnv::new(3, 2, vec![0, 1, 2], vec![1.0; 3]);
    let mut mc = MonteCarlo::new(env, config(1.0, 1))?;
    let mut agent = TabularAgent::for_env(mc.env())?;
    agent.set_q_value(1, 1, 100.0);
    let mut behavior = ScriptedPolicy::new(vec![1, 0, 1], vec![0.5, 0.5]);
    let mut run = EstimationRun::new();
    let report = mc.off_policy_q_control(&mut run, &mut agent, &mut behavior)?;

    assert_eq!(report.updated_from, vec![1]);
    assert_eq!(agent.q_value(2, 1), 1.0);
    // weight 1 / 0.5 carried back from the greedy step at t = 2
    assert_eq!(run.cumulative_weights.get(&(1, 0)), 2.0);
    assert_eq!(agent.q_value(1, 0), 2.0);
    assert_eq!(agent.q_value(0, 1), 0.0);
    Ok(())
}

#[test]
fn control_learns_the_best_arm() -> Result<(), EstimationError> {
    let mut mc = MonteCarlo::new(BanditEnv::new(vec![1.0, 5.0, 2.0]), config(0.9, 60))?;
    let mut agent = TabularAgent::for_env(mc.env())?;
    let mut behavior = RandomPolicy::new(3, StdRng::seed_from_u64(9));
    mc.off_policy_q_control(&mut EstimationRun::new(), &mut agent, &mut behavior)?;
    assert_eq!(greedy_action(&agent, 0, 3), 1);
    assert_eq!(agent.q_value(0, 1), 5.0);
    Ok(())
}

#[test]
fn off_policy_always_tracks_every_visit() -> Result<(), EstimationError> {
    // first-visit configuration is ignored for off-policy estimation
    let config = MonteCarloConfig::builder(1.0)
        .with_max_episodes(1)
        .with_visit_mode(VisitMode::FirstVisit)
        .build()?;
    let env = ScriptedEnv::new(2, 1, vec![0, 1, 0], vec![1.0; 3]);
    let mut mc = MonteCarlo::new(env, config)?;
    let mut agent = TabularAgent::for_env(mc.env())?;
    let mut behavior = ScriptedPolicy::constant(0, 1);
    let target = ScriptedPolicy::constant(0, 1);
    let mut run = EstimationRun::new();
    mc.off_policy_q_prediction(&mut run, &mut agent, &target, &mut behavior)?;
    assert_eq!(run.cumulative_weights.get(&(0, 0)), 2.0);
    // mean of the returns at t = 0 and t = 2
    assert_eq!(agent.q_value(0, 0), 2.0);
    Ok(())
}

#[test]
fn long_episodes_report_weight_overflow_instead_of_nan() -> Result<(), EstimationError> {
    // 600 steps at ratio 4 per step overflow f64 well before the first state
    let mut mc = MonteCarlo::new(
        ScriptedEnv::new(600, 4, (0..600).collect(), vec![1.0; 600]),
        config(1.0, 1),
    )?;
    let mut agent = TabularAgent::for_env(mc.env())?;
    let target = ScriptedPolicy::constant(0, 4);
    let mut behavior = ScriptedPolicy::new(vec![0], vec![0.25; 4]);

    let result =
        mc.off_policy_q_prediction(&mut EstimationRun::new(), &mut agent, &target, &mut behavior);

    assert!(matches!(result, Err(EstimationError::WeightOverflow { .. })));
    for state in 0..600 {
        for action in 0..4 {
            let q = agent.q_value(state, action);
            assert!(q.is_finite(), "non-finite Q at ({state}, {action}): {q}");
        }
    }
    // the last steps were applied before the weight blew up
    assert_eq!(agent.q_value(599, 0), 1.0);
    Ok(())
}

#[test]
fn control_records_distance_to_reference_values() -> Result<(), EstimationError> {
    let mut mc = MonteCarlo::new(BanditEnv::new(vec![1.0, 5.0]), config(1.0, 150))?;
    let mut agent = TabularAgent::for_env(mc.env())?;
    let mut reference = TabularAgent::for_env(mc.env())?;
    reference.set_q_value(0, 0, 3.0);
    reference.set_q_value(0, 1, 4.0);
    let mut behavior = RandomPolicy::new(2, StdRng::seed_from_u64(5));

    let report = mc.off_policy_q_control_against(
        &mut EstimationRun::new(),
        &mut agent,
        &mut behavior,
        &reference,
    )?;

    // sampled every hundred episodes, starting before the first update
    assert_eq!(report.reference_errors.len(), 2);
    assert_eq!(report.reference_errors[0], (0, 5.0));
    assert_eq!(report.reference_errors[1].0, 100);
    assert!(report.reference_errors[1].1.is_finite());
    Ok(())
}
