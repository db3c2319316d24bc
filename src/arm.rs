use rand::Rng;

/// Immutable parameters of one arm, fixed at generation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmParams {
    /// True Bernoulli mean in [0, 1)
    pub mean_reward: f64,
    /// Rounds the arm stays blocked after a pull
    pub blocking_delay: u32,
}

impl ArmParams {
    pub fn new(mean_reward: f64, blocking_delay: u32) -> Self {
        ArmParams {
            mean_reward,
            blocking_delay,
        }
    }
}

/// Availability bookkeeping for one arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingState {
    pub is_available: bool,
    pub remaining_rounds_before_use: u32,
}

impl Default for BlockingState {
    fn default() -> Self {
        BlockingState {
            is_available: true,
            remaining_rounds_before_use: 0,
        }
    }
}

/// One arm of a population: shared parameters plus per-run mutable state.
#[derive(Debug, Clone)]
pub struct Arm {
    pub params: ArmParams,
    pub blocking: BlockingState,
    pub num_uses: u64,
}

impl Arm {
    pub fn new(params: ArmParams) -> Self {
        Arm {
            params,
            blocking: BlockingState::default(),
            num_uses: 0,
        }
    }

    pub fn mean_reward(&self) -> f64 {
        self.params.mean_reward
    }

    pub fn is_available(&self) -> bool {
        self.blocking.is_available
    }

    /// Block the arm for its delay and count the use.
    pub fn pull(&mut self) {
        self.blocking.is_available = false;
        self.blocking.remaining_rounds_before_use = self.params.blocking_delay;
        self.num_uses += 1;
    }

    fn tick(&mut self) {
        if self.blocking.is_available {
            return;
        }
        self.blocking.remaining_rounds_before_use =
            self.blocking.remaining_rounds_before_use.saturating_sub(1);
        if self.blocking.remaining_rounds_before_use == 0 {
            self.blocking.is_available = true;
        }
    }

    fn reset(&mut self) {
        self.blocking = BlockingState::default();
        self.num_uses = 0;
    }
}

/// Sample a Bernoulli reward. Unavailable arms always pay 0.
pub fn sample_reward<R: Rng + ?Sized>(mean_reward: f64, is_available: bool, rng: &mut R) -> u32 {
    if !is_available {
        return 0;
    }
    if rng.gen::<f64>() < mean_reward {
        1
    } else {
        0
    }
}

/// What a policy played in one round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Choice {
    /// No arm was available; contributes zero reward.
    Null,
    Arm { index: usize, params: ArmParams },
}

impl Choice {
    pub fn mean_reward(&self) -> f64 {
        match self {
            Choice::Null => 0.0,
            Choice::Arm { params, .. } => params.mean_reward,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Choice::Null => None,
            Choice::Arm { index, .. } => Some(*index),
        }
    }

    pub fn params(&self) -> Option<ArmParams> {
        match self {
            Choice::Null => None,
            Choice::Arm { params, .. } => Some(*params),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Choice::Null)
    }
}

/// An ordered, separately owned set of arms. Index 0 is the best arm.
#[derive(Debug, Clone)]
pub struct ArmPopulation {
    arms: Vec<Arm>,
}

impl ArmPopulation {
    /// Build a fresh population from a parameter list. Each call yields
    /// its own mutable state.
    pub fn from_params(params: &[ArmParams]) -> Self {
        ArmPopulation {
            arms: params.iter().copied().map(Arm::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    pub fn arms(&self) -> &[Arm] {
        &self.arms
    }

    pub fn params(&self) -> Vec<ArmParams> {
        self.arms.iter().map(|a| a.params).collect()
    }

    pub fn available_indices(&self) -> Vec<usize> {
        self.arms
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_available())
            .map(|(i, _)| i)
            .collect()
    }

    /// Available arm with the strictly greatest true mean; earliest index on ties.
    pub fn best_available(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, arm) in self.arms.iter().enumerate() {
            if !arm.is_available() {
                continue;
            }
            match best {
                Some((_, m)) if arm.mean_reward() <= m => {}
                _ => best = Some((i, arm.mean_reward())),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Pull the arm at `index` and return its choice record.
    pub fn pull(&mut self, index: usize) -> Choice {
        let arm = &mut self.arms[index];
        arm.pull();
        Choice::Arm {
            index,
            params: arm.params,
        }
    }

    /// Advance availability by one round.
    pub fn tick(&mut self) {
        for arm in &mut self.arms {
            arm.tick();
        }
    }

    /// Back to the start-of-run state: all available, nothing used.
    pub fn reset(&mut self) {
        for arm in &mut self.arms {
            arm.reset();
        }
    }

    /// Position of the first arm with equal parameters.
    pub fn position_of(&self, params: &ArmParams) -> Option<usize> {
        self.arms.iter().position(|a| a.params == *params)
    }

    /// True when every arm is available exactly when its counter is 0.
    pub fn is_consistent(&self) -> bool {
        self.arms
            .iter()
            .all(|a| a.blocking.is_available == (a.blocking.remaining_rounds_before_use == 0))
    }
}
