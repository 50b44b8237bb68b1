//! pianist CLI - run humanoid piano episodes on the reference scene
//!
//! Episodes are driven either by an idle policy (all actions zero) or by
//! uniformly random actions; the summary reports per-term reward means.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pianist_ir::NoteSchedule;
use pianist_task::{PianoTask, ReferenceScene, TaskConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pianist")]
#[command(about = "Humanoid piano playing by hand retargeting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a schedule on the reference scene
    Run {
        /// Note schedule (.json)
        schedule: PathBuf,
        /// Task configuration (.toml); defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of episodes
        #[arg(short, long, default_value_t = 1)]
        episodes: usize,
        /// How actions are chosen
        #[arg(short, long, value_enum, default_value_t = Policy::Idle)]
        policy: Policy,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a configuration and print it with defaults filled in
    Config {
        /// Task configuration (.toml); defaults when omitted
        file: Option<PathBuf>,
    },
    /// Display information about a note schedule
    Info {
        /// Note schedule (.json)
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    /// All actions zero
    Idle,
    /// Uniform within the action bounds
    Random,
}

#[derive(Serialize)]
struct EpisodeSummary {
    episode: usize,
    steps: usize,
    total_reward: f64,
    discount: f64,
    mean_terms: Vec<(String, f64)>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            schedule,
            config,
            episodes,
            policy,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let schedule = load_schedule(&schedule)?;
            let summaries = run(config, schedule, episodes, policy)?;
            print_summaries(&summaries, json)?;
        }
        Commands::Config { file } => {
            let config = load_config(file.as_deref())?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Info { file } => {
            show_info(&file)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<TaskConfig> {
    match path {
        Some(path) => TaskConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(TaskConfig::default()),
    }
}

fn load_schedule(path: &Path) -> Result<NoteSchedule> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading schedule {}", path.display()))?;
    Ok(NoteSchedule::from_json(&json)?)
}

fn run(
    config: TaskConfig,
    schedule: NoteSchedule,
    episodes: usize,
    policy: Policy,
) -> Result<Vec<EpisodeSummary>> {
    if schedule.is_empty() {
        bail!("Schedule has no steps");
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let scene = ReferenceScene::new(&config.placement)?;
    let mut task = PianoTask::new(config, scene, schedule)?;
    let spec = task.action_spec();

    let mut summaries = Vec::with_capacity(episodes);
    for episode in 0..episodes {
        task.initialize_episode();
        let mut steps = 0;
        let mut total_reward = 0.0;
        let mut sums: Vec<(String, f64)> = Vec::new();
        loop {
            let action: Vec<f64> = match policy {
                Policy::Idle => vec![0.0; spec.len()],
                Policy::Random => spec
                    .minimum
                    .iter()
                    .zip(&spec.maximum)
                    .map(|(lo, hi)| rng.gen_range(*lo..=*hi))
                    .collect(),
            };
            let step = task.step(&action)?;
            steps += 1;
            total_reward += step.reward;
            for (name, value) in task.rewards().breakdown() {
                match sums.iter_mut().find(|(n, _)| n == name) {
                    Some((_, sum)) => *sum += value,
                    None => sums.push((name.clone(), *value)),
                }
            }
            if step.last {
                break;
            }
        }
        info!(episode, steps, total_reward, "episode finished");
        summaries.push(EpisodeSummary {
            episode,
            steps,
            total_reward,
            discount: task.get_discount(),
            mean_terms: sums
                .into_iter()
                .map(|(name, sum)| (name, sum / steps as f64))
                .collect(),
        });
    }
    Ok(summaries)
}

fn print_summaries(summaries: &[EpisodeSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
        return Ok(());
    }
    for summary in summaries {
        println!(
            "Episode {}: {} steps, reward {:.3}, discount {}",
            summary.episode, summary.steps, summary.total_reward, summary.discount
        );
        for (name, mean) in &summary.mean_terms {
            println!("  {name}: {mean:.4}");
        }
    }
    Ok(())
}

fn show_info(file: &Path) -> Result<()> {
    let schedule = load_schedule(file)?;
    let notes: usize = schedule.notes().iter().map(Vec::len).sum();
    let sustained = schedule.sustains().iter().filter(|s| **s).count();
    let keys = schedule.notes().iter().flatten().map(|n| n.key);
    let lowest = keys.clone().min();
    let highest = keys.max();

    println!("Note schedule: {}", file.display());
    println!("  Steps: {}", schedule.len());
    println!("  Notes: {notes}");
    println!("  Sustained steps: {sustained}");
    match (lowest, highest) {
        (Some(lo), Some(hi)) => println!("  Key range: {lo}..={hi}"),
        _ => println!("  Key range: none"),
    }
    Ok(())
}
