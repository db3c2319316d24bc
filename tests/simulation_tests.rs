use blocking_bandits::arm::{ArmParams, ArmPopulation};
use blocking_bandits::generator::ScenarioMode;
use blocking_bandits::policy::{BlockingPolicy, OraclePolicy, UcbPolicy};
use blocking_bandits::simulation::*;
use blocking_bandits::SimError;
use rand::rngs::StdRng;
use rand::SeedableRng;

const TEST_SEED: u64 = 42;
const TEST_ROUNDS: usize = 5000;

fn all_configs() -> Vec<SimulationConfig> {
    ScenarioMode::all()
        .into_iter()
        .map(|mode| {
            SimulationConfig::new(8, TEST_ROUNDS, mode)
                .with_fixed_delay(4)
                .with_seed(Some(TEST_SEED))
        })
        .collect()
}

fn assert_non_decreasing(series: &[u64], label: &str) {
    for (t, w) in series.windows(2).enumerate() {
        assert!(w[1] >= w[0], "{} decreased at round {}", label, t + 1);
        assert!(w[1] - w[0] <= 1, "{} jumped by more than 1 at round {}", label, t + 1);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Driver outputs
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_reward_sequences_shape() {
    for config in all_configs() {
        let mut sim = Simulation::new(&config).unwrap();
        let run = sim.run();
        assert_eq!(run.oracle_cumulative_rewards.len(), TEST_ROUNDS);
        assert_eq!(run.ucb_cumulative_rewards.len(), TEST_ROUNDS);
        assert_eq!(run.oracle_choices.len(), TEST_ROUNDS);
        assert_eq!(run.ucb_choices.len(), TEST_ROUNDS);
        assert_non_decreasing(&run.oracle_cumulative_rewards, "oracle");
        assert_non_decreasing(&run.ucb_cumulative_rewards, "ucb");
    }
}

#[test]
fn test_warm_start_choices() {
    let config = SimulationConfig::new(8, TEST_ROUNDS, ScenarioMode::LargeDelays)
        .with_seed(Some(TEST_SEED));
    let mut sim = Simulation::new(&config).unwrap();
    let run = sim.run();
    for t in 0..8 {
        assert_eq!(run.ucb_choices[t].index(), Some(t));
        assert_eq!(run.ucb_choices[t].params(), Some(sim.params()[t]));
    }
}

#[test]
fn test_oracle_beats_ucb_on_average() {
    let config = SimulationConfig::new(10, 10_000, ScenarioMode::SmallDelays)
        .with_seed(Some(TEST_SEED));
    let mut oracle = 0u64;
    let mut ucb = 0u64;
    for i in 0..5 {
        let mut sim = Simulation::new_with_seed(&config, TEST_SEED + i).unwrap();
        let run = sim.run();
        oracle += run.oracle_total();
        ucb += run.ucb_total();
    }
    assert!(
        oracle >= ucb,
        "oracle {} should collect at least as much as ucb {}",
        oracle,
        ucb
    );
}

#[test]
fn test_same_seed_is_deterministic() {
    let config = all_configs().remove(0);
    let a = Simulation::new(&config).unwrap().run();
    let b = Simulation::new(&config).unwrap().run();
    assert_eq!(a.oracle_cumulative_rewards, b.oracle_cumulative_rewards);
    assert_eq!(a.ucb_cumulative_rewards, b.ucb_cumulative_rewards);
    assert_eq!(a.oracle_choices, b.oracle_choices);
    assert_eq!(a.ucb_choices, b.ucb_choices);
}

#[test]
fn test_run_twice_resets_state() {
    let config = SimulationConfig::new(4, 200, ScenarioMode::FixedDelays)
        .with_fixed_delay(2)
        .with_seed(Some(TEST_SEED));
    let mut sim = Simulation::new(&config).unwrap();
    sim.run();
    let second = sim.run();
    // Warm start must happen again from scratch
    for t in 0..4 {
        assert_eq!(second.ucb_choices[t].index(), Some(t));
    }
    let uses: u64 = sim.oracle_arms.arms().iter().map(|a| a.num_uses).sum();
    assert!(uses <= 200);
}

#[test]
fn test_populations_share_parameters() {
    let config = all_configs().remove(1);
    let sim = Simulation::new(&config).unwrap();
    assert_eq!(sim.oracle_arms.params(), sim.ucb_arms.params());
    assert_eq!(sim.oracle_arms.params(), sim.params().to_vec());
}

// ═══════════════════════════════════════════════════════════════════════
// Availability invariant at every round boundary
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_availability_invariant_each_round() {
    for config in all_configs() {
        let sim = Simulation::new(&config).unwrap();
        let params = sim.params().to_vec();
        let mut oracle_arms = ArmPopulation::from_params(&params);
        let mut ucb_arms = ArmPopulation::from_params(&params);
        let mut oracle = OraclePolicy;
        let mut ucb = UcbPolicy::new(params.len());
        let mut rng = StdRng::seed_from_u64(TEST_SEED);

        for t in 0..2000 {
            oracle.play(t, &mut oracle_arms, &mut rng);
            ucb.play(t, &mut ucb_arms, &mut rng);
            oracle_arms.tick();
            ucb_arms.tick();
            assert!(oracle_arms.is_consistent(), "oracle round {}", t);
            assert!(ucb_arms.is_consistent(), "ucb round {}", t);
            if t + 1 == params.len() {
                assert!(ucb_arms.arms().iter().all(|a| a.num_uses == 1));
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// End-to-end: K=3, fixed delay 1, T=4
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_unit_delay_oracle_sticks_to_best_arm() {
    let config = SimulationConfig::new(3, 4, ScenarioMode::FixedDelays)
        .with_fixed_delay(1)
        .with_seed(Some(TEST_SEED));
    let mut sim = Simulation::new(&config).unwrap();
    let params = sim.params().to_vec();
    assert!(params[0].mean_reward > params[1].mean_reward);
    assert!(params[1].mean_reward > 0.0);
    assert_eq!(params[2].mean_reward, 0.0);
    assert!(params.iter().all(|p| p.blocking_delay == 1));

    let run = sim.run();
    for choice in &run.oracle_choices {
        assert_eq!(choice.index(), Some(0));
    }
    assert_eq!(sim.oracle_arms.arms()[0].num_uses, 4);
    assert_non_decreasing(&run.oracle_cumulative_rewards, "oracle");
}

#[test]
fn test_from_params_explicit_population() {
    let config = SimulationConfig::new(3, 10, ScenarioMode::FixedDelays).with_fixed_delay(1);
    let params = vec![
        ArmParams::new(0.5, 1),
        ArmParams::new(0.25, 1),
        ArmParams::new(0.0, 1),
    ];
    let mut sim = Simulation::from_params(&config, params.clone(), TEST_SEED).unwrap();
    assert_eq!(sim.params(), params.as_slice());
    let run = sim.run();
    assert_eq!(run.rounds(), 10);
    assert!(run.oracle_choices.iter().all(|c| c.index() == Some(0)));
}

// ═══════════════════════════════════════════════════════════════════════
// Configuration errors
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_config_validation() {
    let invalid = [
        SimulationConfig::new(1, 10_000, ScenarioMode::SmallDelays),
        SimulationConfig::new(60, 10_000, ScenarioMode::SmallDelays),
        SimulationConfig::new(5, 0, ScenarioMode::FixedDelays),
        SimulationConfig::new(5, 500, ScenarioMode::SmallDelays),
        SimulationConfig::new(5, 400, ScenarioMode::LargeDelays),
        SimulationConfig::new(5, 100, ScenarioMode::FixedDelays).with_fixed_delay(0),
        SimulationConfig {
            fixed_delay: None,
            ..SimulationConfig::new(5, 100, ScenarioMode::FixedDelays)
        },
    ];
    for config in &invalid {
        assert!(
            matches!(Simulation::new(config), Err(SimError::InvalidConfiguration(_))),
            "{:?} should be rejected",
            config
        );
    }

    let short = SimulationConfig::new(5, 3, ScenarioMode::FixedDelays).with_fixed_delay(1);
    assert_eq!(
        short.validate(),
        Err(SimError::InsufficientRounds { arms: 5, rounds: 3 })
    );
    assert!(SimulationConfig::default().validate().is_ok());
}

#[test]
fn test_twenty_one_arms_run() {
    let config = SimulationConfig::new(21, 10_000, ScenarioMode::SmallDelays)
        .with_seed(Some(TEST_SEED));
    assert!(config.validate().is_ok());
    let mut sim = Simulation::new(&config).unwrap();
    assert_eq!(sim.params().len(), 21);
    let run = sim.run();
    assert_eq!(run.rounds(), 10_000);
}

#[test]
fn test_from_params_rejects_zero_delay() {
    let config = SimulationConfig::new(2, 10, ScenarioMode::FixedDelays);
    let params = vec![ArmParams::new(0.5, 0), ArmParams::new(0.0, 1)];
    assert!(matches!(
        Simulation::from_params(&config, params, TEST_SEED),
        Err(SimError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_config_from_toml() {
    let dir = std::env::temp_dir().join("blocking_bandits_config_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        "arms = 6\nrounds = 3000\nmode = \"large_delays\"\nseed = 7\n",
    )
    .unwrap();

    let config = SimulationConfig::from_toml_file(&path).unwrap();
    assert_eq!(config.arms, 6);
    assert_eq!(config.rounds, 3000);
    assert_eq!(config.mode, ScenarioMode::LargeDelays);
    assert_eq!(config.seed, Some(7));
    assert_eq!(config.fixed_delay, SimulationConfig::default().fixed_delay);
    assert!(config.validate().is_ok());
}
