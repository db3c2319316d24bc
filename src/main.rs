use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use blocking_bandits::generator::ScenarioMode;
use blocking_bandits::monte_carlo::{compare_scenarios, AveragedResult, MonteCarloEngine};
use blocking_bandits::output;
use blocking_bandits::simulation::{Simulation, SimulationConfig};

#[derive(Parser)]
#[command(
    name = "blocking-bandits",
    about = "Oracle vs UCB on multi-armed bandits with blocking arms"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// TOML config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of arms (K)
    #[arg(short = 'K', long)]
    arms: Option<usize>,

    /// Number of rounds (T)
    #[arg(short = 'T', long)]
    rounds: Option<usize>,

    /// Delay regime
    #[arg(long, value_enum)]
    mode: Option<ScenarioMode>,

    /// Delay shared by all arms in fixed_delays mode
    #[arg(long)]
    fixed_delay: Option<u32>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_toml_file(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(arms) = self.arms {
            config.arms = arms;
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.fixed_delay.is_some() {
            config.fixed_delay = self.fixed_delay;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation and report rewards, regret, k* and k_g
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Write per-round choices to this directory
        #[arg(long)]
        output_dir: Option<String>,
    },

    /// Average many independent runs of one delay regime
    MonteCarlo {
        #[command(flatten)]
        config: ConfigArgs,

        /// Number of simulations
        #[arg(long, default_value = "100")]
        num_sims: usize,

        /// Output directory
        #[arg(long, default_value = "output/monte_carlo")]
        output_dir: String,
    },

    /// Average runs of every delay regime at the same K, T and seed
    Compare {
        #[command(flatten)]
        config: ConfigArgs,

        /// Number of simulations per regime
        #[arg(long, default_value = "100")]
        num_sims: usize,

        /// Output directory
        #[arg(long, default_value = "output/compare")]
        output_dir: String,
    },
}

fn progress_bar(len: usize, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{msg:>14} [{bar:40}] {pos}/{len} ({eta})") {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message(label.to_string());
    pb
}

fn print_result(result: &AveragedResult) {
    let fmt_opt = |v: Option<usize>| v.map(|x| x.to_string()).unwrap_or_else(|| "n/a".into());
    println!(
        "  {:<13} oracle={:.2} ucb={:.2} regret={:.2} K*={} Kg={}",
        result.mode.name(),
        result.final_oracle_reward(),
        result.final_ucb_reward(),
        result.final_regret(),
        fmt_opt(result.k_star),
        fmt_opt(result.k_g),
    );
    println!("  {:<13} {}", "", result.mode.description());
}

fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config, output_dir } => {
            let config = config.resolve()?;
            println!(
                "Running {}: K={}, T={}",
                config.mode.name(),
                config.arms,
                config.rounds
            );
            println!("  {}", config.mode.description());

            let mut sim = Simulation::new(&config)?;
            let run = sim.run();
            let regret = sim.cumulative_regret(&run.ucb_choices);

            println!("  oracle reward = {}", run.oracle_total());
            println!("  ucb reward    = {}", run.ucb_total());
            println!(
                "  ucb regret    = {:.4}",
                regret.last().copied().unwrap_or(0.0)
            );
            match sim.calculate_k_star() {
                Ok(k) => println!("  K*            = {}", k),
                Err(e) => println!("  K*            = n/a ({})", e),
            }
            match sim.calculate_k_g(&run.oracle_choices) {
                Ok(k) => println!("  Kg            = {}", k),
                Err(e) => println!("  Kg            = n/a ({})", e),
            }

            if let Some(dir) = output_dir {
                let dir = PathBuf::from(dir);
                output::save_choices_csv(&run, &regret, &dir.join("choices.csv"))?;
                output::save_config_toml(&config, &dir.join("config.toml"))?;
                println!("Saved run to {}", dir.display());
            }
        }

        Commands::MonteCarlo {
            config,
            num_sims,
            output_dir,
        } => {
            let config = config.resolve()?;
            println!(
                "Monte Carlo: {} x {} (K={}, T={})",
                num_sims,
                config.mode.name(),
                config.arms,
                config.rounds
            );

            let pb = progress_bar(num_sims, config.mode.name());
            let engine = MonteCarloEngine::new(config.clone(), num_sims);
            let result = engine.run(Some(&pb))?;
            pb.finish();

            print_result(&result);
            let dir = PathBuf::from(&output_dir);
            output::save_all(&result, &config, &dir)?;
            println!("Saved results to {}", dir.display());
        }

        Commands::Compare {
            config,
            num_sims,
            output_dir,
        } => {
            let config = config.resolve()?;
            println!(
                "Comparing delay regimes: {} sims each (K={}, T={})",
                num_sims, config.arms, config.rounds
            );

            let results = compare_scenarios(&config, num_sims, |mode| {
                Some(progress_bar(num_sims, mode.name()))
            })?;

            for result in &results {
                print_result(result);
                let mut mode_config = config.clone();
                mode_config.mode = result.mode;
                let dir = PathBuf::from(&output_dir).join(result.mode.name());
                output::save_all(result, &mode_config, &dir)?;
            }
            println!("Saved results to {}", output_dir);
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = execute(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
