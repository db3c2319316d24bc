use thiserror::Error;

/// Errors raised by the blocking bandit core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("{rounds} rounds cannot cover the warm start of {arms} arms")]
    InsufficientRounds { arms: usize, rounds: usize },
    #[error("inverse delays of all {arms} arms sum to {sum:.4}, never reaching 1")]
    NoSolution { arms: usize, sum: f64 },
    #[error("not found: {0}")]
    NotFound(String),
}
