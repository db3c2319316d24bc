use crate::arm::ArmParams;
use crate::error::SimError;

use clap::ValueEnum;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

/// Delay-generation regime for a population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ScenarioMode {
    SmallDelays,
    LargeDelays,
    FixedDelays,
}

impl ScenarioMode {
    pub fn all() -> Vec<ScenarioMode> {
        vec![
            ScenarioMode::SmallDelays,
            ScenarioMode::LargeDelays,
            ScenarioMode::FixedDelays,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SmallDelays => "small_delays",
            Self::LargeDelays => "large_delays",
            Self::FixedDelays => "fixed_delays",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::SmallDelays => "Delays drawn from [1, T/1000]",
            Self::LargeDelays => "Delays drawn from [T/1000 + 1, T/500]",
            Self::FixedDelays => "Every arm shares one caller-supplied delay",
        }
    }

    /// Inclusive delay range for the random modes, `None` when empty.
    pub fn delay_range(&self, rounds: usize) -> Option<(usize, usize)> {
        let (lo, hi) = match self {
            Self::SmallDelays => (1, rounds / 1000),
            Self::LargeDelays => (rounds / 1000 + 1, rounds / 500),
            Self::FixedDelays => return None,
        };
        if lo > hi {
            None
        } else {
            Some((lo, hi))
        }
    }
}

/// Ascending mean rewards starting at 0.
///
/// Gap sums grow with K, so large populations can push the top mean to 1 or
/// beyond; that draw is rejected rather than clamped.
pub fn generate_mean_rewards<R: Rng + ?Sized>(
    arms: usize,
    rng: &mut R,
) -> Result<Vec<f64>, SimError> {
    if arms < 2 {
        return Err(SimError::InvalidConfiguration(format!(
            "need at least 2 arms, got {}",
            arms
        )));
    }
    let k = arms as f64;
    let gap = Uniform::new(k / 2000.0, k / 400.0);
    let mut gaps: Vec<f64> = (0..arms - 1).map(|_| gap.sample(rng)).collect();
    gaps.sort_by(|a, b| a.total_cmp(b));

    let mut means = Vec::with_capacity(arms);
    let mut acc = 0.0;
    means.push(acc);
    for g in gaps {
        acc += g;
        means.push(acc);
    }
    if acc >= 1.0 {
        return Err(SimError::InvalidConfiguration(format!(
            "top mean reward {:.4} reaches 1 for {} arms",
            acc, arms
        )));
    }
    Ok(means)
}

/// Per-arm blocking delays for the given mode.
pub fn generate_delays<R: Rng + ?Sized>(
    arms: usize,
    rounds: usize,
    mode: ScenarioMode,
    fixed_delay: Option<u32>,
    rng: &mut R,
) -> Result<Vec<u32>, SimError> {
    if mode == ScenarioMode::FixedDelays {
        return match fixed_delay {
            Some(0) => Err(SimError::InvalidConfiguration(
                "fixed delay must be at least 1".to_string(),
            )),
            Some(d) => Ok(vec![d; arms]),
            None => Err(SimError::InvalidConfiguration(
                "fixed delay mode requires a delay".to_string(),
            )),
        };
    }

    let (lo, hi) = mode.delay_range(rounds).ok_or_else(|| {
        SimError::InvalidConfiguration(format!(
            "{} delay range is empty for {} rounds",
            mode.name(),
            rounds
        ))
    })?;
    let lo = u32::try_from(lo)
        .map_err(|_| SimError::InvalidConfiguration(format!("delay {} overflows u32", lo)))?;
    let hi = u32::try_from(hi)
        .map_err(|_| SimError::InvalidConfiguration(format!("delay {} overflows u32", hi)))?;

    Ok((0..arms).map(|_| rng.gen_range(lo..=hi)).collect())
}

/// Generate the shared parameter list for both populations.
///
/// Means are built ascending from a prefix sum of sorted gaps, paired with
/// their delays, and then the whole list is reversed so that index 0 holds
/// the largest mean and the last index holds mean 0. The k* and k_g
/// diagnostics read arms in this order.
pub fn generate_arm_params<R: Rng + ?Sized>(
    arms: usize,
    rounds: usize,
    mode: ScenarioMode,
    fixed_delay: Option<u32>,
    rng: &mut R,
) -> Result<Vec<ArmParams>, SimError> {
    if rounds < 1 {
        return Err(SimError::InvalidConfiguration(
            "need at least 1 round".to_string(),
        ));
    }
    let means = generate_mean_rewards(arms, rng)?;
    let delays = generate_delays(arms, rounds, mode, fixed_delay, rng)?;

    let mut params: Vec<ArmParams> = means
        .into_iter()
        .zip(delays)
        .map(|(m, d)| ArmParams::new(m, d))
        .collect();
    params.reverse();
    Ok(params)
}
