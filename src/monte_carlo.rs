use crate::error::SimError;
use crate::generator::ScenarioMode;
use crate::simulation::{Simulation, SimulationConfig};

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Sequences and diagnostics of one independent run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub oracle_rewards: Vec<u64>,
    pub ucb_rewards: Vec<u64>,
    pub ucb_regret: Vec<f64>,
    /// Only computed for the first run of a batch
    pub k_star: Option<usize>,
    pub k_g: Option<usize>,
}

/// Element-wise means over `num_sims` runs of one configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AveragedResult {
    pub mode: ScenarioMode,
    pub arms: usize,
    pub rounds: usize,
    pub num_sims: usize,
    pub oracle_rewards: Vec<f64>,
    pub ucb_rewards: Vec<f64>,
    pub ucb_regret: Vec<f64>,
    pub k_star: Option<usize>,
    pub k_g: Option<usize>,
}

impl AveragedResult {
    pub fn final_oracle_reward(&self) -> f64 {
        self.oracle_rewards.last().copied().unwrap_or(0.0)
    }

    pub fn final_ucb_reward(&self) -> f64 {
        self.ucb_rewards.last().copied().unwrap_or(0.0)
    }

    pub fn final_regret(&self) -> f64 {
        self.ucb_regret.last().copied().unwrap_or(0.0)
    }
}

/// Runs many independent simulations of one configuration in parallel.
pub struct MonteCarloEngine {
    pub config: SimulationConfig,
    pub num_sims: usize,
}

impl MonteCarloEngine {
    pub fn new(config: SimulationConfig, num_sims: usize) -> Self {
        MonteCarloEngine { config, num_sims }
    }

    /// Run `index` of the batch. With a base seed, run i uses `seed + i`;
    /// without one every run draws its own entropy.
    pub fn run_single(&self, index: usize) -> Result<RunSummary, SimError> {
        let mut sim = match self.config.seed {
            Some(seed) => Simulation::new_with_seed(&self.config, seed.wrapping_add(index as u64))?,
            None => Simulation::new(&self.config)?,
        };
        let run = sim.run();
        let ucb_regret = sim.cumulative_regret(&run.ucb_choices);

        let (k_star, k_g) = if index == 0 {
            (
                diagnostic_or_warn("k*", sim.calculate_k_star()),
                diagnostic_or_warn("k_g", sim.calculate_k_g(&run.oracle_choices)),
            )
        } else {
            (None, None)
        };

        Ok(RunSummary {
            oracle_rewards: run.oracle_cumulative_rewards,
            ucb_rewards: run.ucb_cumulative_rewards,
            ucb_regret,
            k_star,
            k_g,
        })
    }

    /// Run the whole batch and average it.
    pub fn run(&self, progress: Option<&ProgressBar>) -> Result<AveragedResult, SimError> {
        if self.num_sims == 0 {
            return Err(SimError::InvalidConfiguration(
                "need at least 1 simulation".to_string(),
            ));
        }
        self.config.validate()?;

        let runs: Vec<RunSummary> = (0..self.num_sims)
            .into_par_iter()
            .map(|i| {
                let summary = self.run_single(i);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                summary
            })
            .collect::<Result<_, _>>()?;

        let result = self.average(&runs);
        info!(
            mode = self.config.mode.name(),
            sims = self.num_sims,
            oracle = result.final_oracle_reward(),
            ucb = result.final_ucb_reward(),
            regret = result.final_regret(),
            "monte carlo finished"
        );
        Ok(result)
    }

    fn average(&self, runs: &[RunSummary]) -> AveragedResult {
        let rounds = self.config.rounds;
        let n = runs.len() as f64;
        let mut oracle = vec![0.0; rounds];
        let mut ucb = vec![0.0; rounds];
        let mut regret = vec![0.0; rounds];

        for run in runs {
            for t in 0..rounds {
                oracle[t] += run.oracle_rewards[t] as f64;
                ucb[t] += run.ucb_rewards[t] as f64;
                regret[t] += run.ucb_regret[t];
            }
        }
        for series in [&mut oracle, &mut ucb, &mut regret] {
            series.iter_mut().for_each(|v| *v /= n);
        }

        let first = runs.first();
        AveragedResult {
            mode: self.config.mode,
            arms: self.config.arms,
            rounds,
            num_sims: runs.len(),
            oracle_rewards: oracle,
            ucb_rewards: ucb,
            ucb_regret: regret,
            k_star: first.and_then(|r| r.k_star),
            k_g: first.and_then(|r| r.k_g),
        }
    }
}

fn diagnostic_or_warn(name: &str, value: Result<usize, SimError>) -> Option<usize> {
    match value {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(diagnostic = name, error = %e, "diagnostic unavailable");
            None
        }
    }
}

/// Run every scenario mode at the same K, T, fixed delay and seed.
///
/// `progress` is called once per mode and may hand back a bar for that batch.
pub fn compare_scenarios<F>(
    base: &SimulationConfig,
    num_sims: usize,
    mut progress: F,
) -> Result<Vec<AveragedResult>, SimError>
where
    F: FnMut(ScenarioMode) -> Option<ProgressBar>,
{
    let mut results = Vec::new();
    for mode in ScenarioMode::all() {
        let mut config = base.clone();
        config.mode = mode;
        debug!(mode = mode.name(), num_sims, "starting scenario batch");

        let bar = progress(mode);
        let engine = MonteCarloEngine::new(config, num_sims);
        let result = engine.run(bar.as_ref())?;
        if let Some(pb) = bar {
            pb.finish();
        }
        results.push(result);
    }
    Ok(results)
}
