pub mod arm;
pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod monte_carlo;
pub mod output;
pub mod policy;
pub mod simulation;

pub use error::SimError;
