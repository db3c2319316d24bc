use crate::arm::Choice;
use crate::monte_carlo::AveragedResult;
use crate::simulation::{SimulationConfig, SimulationRun};
use serde::Serialize;
use std::path::Path;

/// Headline numbers of an averaged batch.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryMetrics {
    pub mode: String,
    pub arms: usize,
    pub rounds: usize,
    pub num_sims: usize,
    pub k_star: Option<usize>,
    pub k_g: Option<usize>,
    pub final_oracle_reward: f64,
    pub final_ucb_reward: f64,
    pub final_ucb_regret: f64,
    /// UCB reward as a fraction of oracle reward
    pub ucb_to_oracle_ratio: f64,
}

pub fn compute_summary(result: &AveragedResult) -> SummaryMetrics {
    let oracle = result.final_oracle_reward();
    let ucb = result.final_ucb_reward();
    SummaryMetrics {
        mode: result.mode.name().to_string(),
        arms: result.arms,
        rounds: result.rounds,
        num_sims: result.num_sims,
        k_star: result.k_star,
        k_g: result.k_g,
        final_oracle_reward: oracle,
        final_ucb_reward: ucb,
        final_ucb_regret: result.final_regret(),
        ucb_to_oracle_ratio: if oracle > 0.0 { ucb / oracle } else { 0.0 },
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Save averaged per-round curves to CSV.
pub fn save_curves_csv(
    result: &AveragedResult,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["round", "oracle_reward", "ucb_reward", "ucb_regret"])?;

    for t in 0..result.rounds {
        wtr.write_record(&[
            t.to_string(),
            format!("{:.4}", result.oracle_rewards[t]),
            format!("{:.4}", result.ucb_rewards[t]),
            format!("{:.6}", result.ucb_regret[t]),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn choice_cell(choice: &Choice) -> String {
    choice.index().map(|i| i.to_string()).unwrap_or_default()
}

/// Save one run's per-round choices and rewards to CSV. The Null Arm is an
/// empty cell.
pub fn save_choices_csv(
    run: &SimulationRun,
    regret: &[f64],
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "round",
        "oracle_arm",
        "ucb_arm",
        "oracle_reward",
        "ucb_reward",
        "ucb_regret",
    ])?;

    for t in 0..run.rounds() {
        wtr.write_record(&[
            t.to_string(),
            choice_cell(&run.oracle_choices[t]),
            choice_cell(&run.ucb_choices[t]),
            run.oracle_cumulative_rewards[t].to_string(),
            run.ucb_cumulative_rewards[t].to_string(),
            regret
                .get(t)
                .map(|r| format!("{:.6}", r))
                .unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save summary metrics to JSON.
pub fn save_summary_json(
    summary: &SummaryMetrics,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Save the configuration used to TOML.
pub fn save_config_toml(
    config: &SimulationConfig,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_parent(path)?;
    let text = toml::to_string_pretty(config)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Save curves, summary and config for a batch into one directory.
pub fn save_all(
    result: &AveragedResult,
    config: &SimulationConfig,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output_dir)?;

    save_curves_csv(result, &output_dir.join("curves.csv"))?;
    save_summary_json(&compute_summary(result), &output_dir.join("summary.json"))?;
    save_config_toml(config, &output_dir.join("config.toml"))?;

    Ok(())
}
