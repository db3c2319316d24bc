use crate::arm::{ArmParams, ArmPopulation, Choice};
use crate::diagnostics;
use crate::error::SimError;
use crate::generator::{generate_arm_params, ScenarioMode};
use crate::policy::{BlockingPolicy, OraclePolicy, UcbPolicy};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Configuration for one blocking bandit experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of arms (K)
    pub arms: usize,
    /// Number of rounds (T)
    pub rounds: usize,
    pub mode: ScenarioMode,
    /// Delay shared by all arms, fixed mode only
    pub fixed_delay: Option<u32>,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            arms: 10,
            rounds: 10_000,
            mode: ScenarioMode::SmallDelays,
            fixed_delay: Some(5),
            seed: Some(42),
        }
    }
}

impl SimulationConfig {
    pub fn new(arms: usize, rounds: usize, mode: ScenarioMode) -> Self {
        SimulationConfig {
            arms,
            rounds,
            mode,
            ..SimulationConfig::default()
        }
    }

    pub fn with_fixed_delay(mut self, delay: u32) -> Self {
        self.fixed_delay = Some(delay);
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Checks everything that can be checked before drawing any arm.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.arms < 2 {
            return Err(SimError::InvalidConfiguration(format!(
                "need at least 2 arms, got {}",
                self.arms
            )));
        }
        if self.rounds < 1 {
            return Err(SimError::InvalidConfiguration(
                "need at least 1 round".to_string(),
            ));
        }
        match self.mode {
            ScenarioMode::FixedDelays => match self.fixed_delay {
                None | Some(0) => {
                    return Err(SimError::InvalidConfiguration(
                        "fixed delay mode requires a delay of at least 1".to_string(),
                    ))
                }
                Some(_) => {}
            },
            mode => {
                if mode.delay_range(self.rounds).is_none() {
                    return Err(SimError::InvalidConfiguration(format!(
                        "{} delay range is empty for {} rounds",
                        mode.name(),
                        self.rounds
                    )));
                }
            }
        }
        if self.rounds < self.arms {
            return Err(SimError::InsufficientRounds {
                arms: self.arms,
                rounds: self.rounds,
            });
        }
        Ok(())
    }

    /// Load a configuration from a TOML file. Missing keys take defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        let config: SimulationConfig = toml::from_str(&text)?;
        Ok(config)
    }
}

/// Sequences produced by one run, all of length T.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub oracle_cumulative_rewards: Vec<u64>,
    pub ucb_cumulative_rewards: Vec<u64>,
    pub oracle_choices: Vec<Choice>,
    pub ucb_choices: Vec<Choice>,
}

impl SimulationRun {
    pub fn rounds(&self) -> usize {
        self.oracle_choices.len()
    }

    pub fn oracle_total(&self) -> u64 {
        self.oracle_cumulative_rewards.last().copied().unwrap_or(0)
    }

    pub fn ucb_total(&self) -> u64 {
        self.ucb_cumulative_rewards.last().copied().unwrap_or(0)
    }
}

/// Oracle and UCB playing the same arms, each on its own population.
pub struct Simulation {
    pub config: SimulationConfig,
    params: Vec<ArmParams>,
    pub oracle_arms: ArmPopulation,
    pub ucb_arms: ArmPopulation,
    pub oracle: OraclePolicy,
    pub ucb: UcbPolicy,
    rng: StdRng,
}

impl Simulation {
    /// Seeded from `config.seed`, or from entropy when it is unset.
    pub fn new(config: &SimulationConfig) -> Result<Self, SimError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn new_with_seed(config: &SimulationConfig, seed: u64) -> Result<Self, SimError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &SimulationConfig, mut rng: StdRng) -> Result<Self, SimError> {
        config.validate()?;
        let params = generate_arm_params(
            config.arms,
            config.rounds,
            config.mode,
            config.fixed_delay,
            &mut rng,
        )?;
        Self::from_parts(config, params, rng)
    }

    /// Build a simulation over an explicit parameter list.
    pub fn from_params(
        config: &SimulationConfig,
        params: Vec<ArmParams>,
        seed: u64,
    ) -> Result<Self, SimError> {
        Self::from_parts(config, params, StdRng::seed_from_u64(seed))
    }

    fn from_parts(
        config: &SimulationConfig,
        params: Vec<ArmParams>,
        rng: StdRng,
    ) -> Result<Self, SimError> {
        if params.len() < 2 {
            return Err(SimError::InvalidConfiguration(format!(
                "need at least 2 arms, got {}",
                params.len()
            )));
        }
        if params.iter().any(|p| p.blocking_delay == 0) {
            return Err(SimError::InvalidConfiguration(
                "blocking delays must be at least 1".to_string(),
            ));
        }
        if config.rounds < params.len() {
            return Err(SimError::InsufficientRounds {
                arms: params.len(),
                rounds: config.rounds,
            });
        }

        let mut config = config.clone();
        config.arms = params.len();

        Ok(Simulation {
            oracle_arms: ArmPopulation::from_params(&params),
            ucb_arms: ArmPopulation::from_params(&params),
            oracle: OraclePolicy,
            ucb: UcbPolicy::new(params.len()),
            params,
            config,
            rng,
        })
    }

    /// The shared, immutable parameter list both populations were built from.
    pub fn params(&self) -> &[ArmParams] {
        &self.params
    }

    /// Reset both populations and the UCB estimates to the start-of-run state.
    pub fn reset(&mut self) {
        self.oracle_arms.reset();
        self.ucb_arms.reset();
        self.ucb.reset();
    }

    /// Run T rounds of both policies.
    pub fn run(&mut self) -> SimulationRun {
        self.reset();
        let rounds = self.config.rounds;

        let mut run = SimulationRun {
            oracle_cumulative_rewards: Vec::with_capacity(rounds),
            ucb_cumulative_rewards: Vec::with_capacity(rounds),
            oracle_choices: Vec::with_capacity(rounds),
            ucb_choices: Vec::with_capacity(rounds),
        };
        let mut oracle_total = 0u64;
        let mut ucb_total = 0u64;

        for t in 0..rounds {
            self.step(t, &mut run, &mut oracle_total, &mut ucb_total);
        }

        debug!(
            mode = self.config.mode.name(),
            arms = self.config.arms,
            rounds,
            oracle_total,
            ucb_total,
            "simulation finished"
        );
        run
    }

    fn step(&mut self, t: usize, run: &mut SimulationRun, oracle_total: &mut u64, ucb_total: &mut u64) {
        let oracle = self.oracle.play(t, &mut self.oracle_arms, &mut self.rng);
        let ucb = self.ucb.play(t, &mut self.ucb_arms, &mut self.rng);

        // Both policies have acted; only now may blocked arms count down.
        self.oracle_arms.tick();
        self.ucb_arms.tick();

        *oracle_total += oracle.reward as u64;
        *ucb_total += ucb.reward as u64;
        run.oracle_cumulative_rewards.push(*oracle_total);
        run.ucb_cumulative_rewards.push(*ucb_total);
        run.oracle_choices.push(oracle.choice);
        run.ucb_choices.push(ucb.choice);
    }

    /// Cumulative regret of a recorded UCB run.
    ///
    /// Resets the UCB population and replays the always-best-available rule
    /// on it; each round adds the comparator's true mean minus the mean of
    /// what the UCB run actually played. The comparator's own pulls obey
    /// blocking. When every arm is blocked the comparator is the Null Arm.
    pub fn cumulative_regret(&mut self, ucb_choices: &[Choice]) -> Vec<f64> {
        self.ucb_arms.reset();

        let mut regret = Vec::with_capacity(ucb_choices.len());
        let mut total = 0.0;
        for chosen in ucb_choices {
            let best = match self.ucb_arms.best_available() {
                Some(i) => self.ucb_arms.pull(i),
                None => Choice::Null,
            };
            total += best.mean_reward() - chosen.mean_reward();
            regret.push(total);
            self.ucb_arms.tick();
        }
        regret
    }

    /// k* over the UCB population's delays in index order.
    pub fn calculate_k_star(&self) -> Result<usize, SimError> {
        diagnostics::k_star(&self.ucb_arms.params())
    }

    /// k_g for the oracle choices of a completed run.
    pub fn calculate_k_g(&self, oracle_choices: &[Choice]) -> Result<usize, SimError> {
        diagnostics::k_g(oracle_choices, &self.ucb_arms)
    }
}
