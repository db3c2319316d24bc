//! Structural diagnostics of a blocking population.
//!
//! Both quantities read arms in generation order, where index 0 is the best
//! arm, so a rank here is a quality rank.

use crate::arm::{ArmParams, ArmPopulation, Choice};
use crate::error::SimError;

/// Smallest k such that the first k arms' inverse delays sum to at least 1.
pub fn k_star(params: &[ArmParams]) -> Result<usize, SimError> {
    let mut sum = 0.0;
    for (i, p) in params.iter().enumerate() {
        if p.blocking_delay == 0 {
            return Err(SimError::InvalidConfiguration(format!(
                "arm {} has zero blocking delay",
                i
            )));
        }
        sum += 1.0 / p.blocking_delay as f64;
        if sum >= 1.0 {
            return Ok(i + 1);
        }
    }
    Err(SimError::NoSolution {
        arms: params.len(),
        sum,
    })
}

/// 1-based rank, in `population`, of the lowest-mean positive arm the
/// oracle ever played. Arms are matched by parameter equality.
pub fn k_g(oracle_choices: &[Choice], population: &ArmPopulation) -> Result<usize, SimError> {
    let mut worst: Option<ArmParams> = None;
    for params in oracle_choices.iter().filter_map(Choice::params) {
        if params.mean_reward <= 0.0 {
            continue;
        }
        match worst {
            Some(w) if params.mean_reward >= w.mean_reward => {}
            _ => worst = Some(params),
        }
    }

    let worst = worst.ok_or_else(|| {
        SimError::NotFound("oracle never played an arm with positive mean".to_string())
    })?;

    population
        .position_of(&worst)
        .map(|i| i + 1)
        .ok_or_else(|| {
            SimError::NotFound(format!(
                "no arm with mean {:.6} and delay {} in population",
                worst.mean_reward, worst.blocking_delay
            ))
        })
}
