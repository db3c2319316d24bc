use crate::arm::{sample_reward, ArmPopulation, Choice};

use rand::Rng;
use tracing::trace;

/// Reward and arm played by a policy in one round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundOutcome {
    pub reward: u32,
    pub choice: Choice,
}

impl RoundOutcome {
    pub fn null() -> Self {
        RoundOutcome {
            reward: 0,
            choice: Choice::Null,
        }
    }
}

/// A selection rule acting on its own population, one round at a time.
pub trait BlockingPolicy {
    fn name(&self) -> &'static str;

    /// Choose, sample and block an arm for round `round` (0-based).
    fn play<R: Rng + ?Sized>(
        &mut self,
        round: usize,
        arms: &mut ArmPopulation,
        rng: &mut R,
    ) -> RoundOutcome;

    /// Forget anything learned in a previous run.
    fn reset(&mut self) {}
}

/// Knows the true means and always plays the best available arm.
#[derive(Debug, Clone, Default)]
pub struct OraclePolicy;

impl BlockingPolicy for OraclePolicy {
    fn name(&self) -> &'static str {
        "Oracle"
    }

    fn play<R: Rng + ?Sized>(
        &mut self,
        _round: usize,
        arms: &mut ArmPopulation,
        rng: &mut R,
    ) -> RoundOutcome {
        let Some(best) = arms.best_available() else {
            return RoundOutcome::null();
        };
        let mean = arms.arms()[best].mean_reward();
        let reward = sample_reward(mean, true, rng);
        let choice = arms.pull(best);
        RoundOutcome { reward, choice }
    }
}

/// Upper-confidence-bound learner with a round-robin warm start.
#[derive(Debug, Clone)]
pub struct UcbPolicy {
    estimated_means: Vec<f64>,
}

impl UcbPolicy {
    pub fn new(arms: usize) -> Self {
        UcbPolicy {
            estimated_means: vec![0.0; arms],
        }
    }

    pub fn estimated_means(&self) -> &[f64] {
        &self.estimated_means
    }

    /// `est + sqrt(8 * log10(t) / n)`. The base-10 log is deliberate and
    /// must not be swapped for `ln`.
    pub fn index(&self, arm: usize, num_uses: u64, round: usize) -> f64 {
        let bonus = (8.0 * (round as f64).log10() / num_uses as f64).sqrt();
        self.estimated_means[arm] + bonus
    }

    fn warm_start<R: Rng + ?Sized>(
        &mut self,
        round: usize,
        arms: &mut ArmPopulation,
        rng: &mut R,
    ) -> RoundOutcome {
        let mean = arms.arms()[round].mean_reward();
        let reward = sample_reward(mean, true, rng);
        self.estimated_means[round] = reward as f64;
        let choice = arms.pull(round);
        RoundOutcome { reward, choice }
    }
}

impl BlockingPolicy for UcbPolicy {
    fn name(&self) -> &'static str {
        "UCB"
    }

    fn play<R: Rng + ?Sized>(
        &mut self,
        round: usize,
        arms: &mut ArmPopulation,
        rng: &mut R,
    ) -> RoundOutcome {
        if self.estimated_means.len() != arms.len() {
            self.estimated_means = vec![0.0; arms.len()];
        }
        if round < arms.len() {
            return self.warm_start(round, arms, rng);
        }

        let mut best: Option<(usize, f64)> = None;
        for i in arms.available_indices() {
            let idx = self.index(i, arms.arms()[i].num_uses, round);
            match best {
                Some((_, b)) if idx <= b => {}
                _ => best = Some((i, idx)),
            }
        }
        let Some((chosen, ucb)) = best else {
            return RoundOutcome::null();
        };

        let arm = &arms.arms()[chosen];
        let n = arm.num_uses as f64;
        let reward = sample_reward(arm.mean_reward(), arm.is_available(), rng);
        let est = &mut self.estimated_means[chosen];
        *est = (*est * n + reward as f64) / (n + 1.0);
        trace!(round, arm = chosen, ucb, reward, "UCB pull");

        let choice = arms.pull(chosen);
        RoundOutcome { reward, choice }
    }

    fn reset(&mut self) {
        self.estimated_means.iter_mut().for_each(|m| *m = 0.0);
    }
}
