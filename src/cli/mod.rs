#![forbid(unsafe_code)]

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config;
use crate::manager::{NewTask, TaskManager};
use crate::task::{Priority, ReminderSpec};

#[derive(Debug, Parser)]
#[command(
    name = "tickler",
    version,
    about = "Task reminders: fixed daily alarms and random nudges"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Run(RunArgs),
    Config(ConfigArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Task with a fixed daily reminder, as TITLE=HH:MM (repeatable)
    #[arg(long = "at", value_name = "TITLE=HH:MM")]
    pub at: Vec<String>,
    /// Task reminded at random on the sampler tick (repeatable)
    #[arg(long = "random", value_name = "TITLE")]
    pub random: Vec<String>,
    /// Priority applied to the created tasks
    #[arg(long = "priority", default_value = "medium")]
    pub priority: PriorityArg,
    /// Override scheduler.tick_interval (e.g. 30s)
    #[arg(long = "tick")]
    pub tick_interval: Option<String>,
    /// Override scheduler.fire_probability (0..=1)
    #[arg(long = "probability")]
    pub fire_probability: Option<f64>,
    /// Override scheduler.recurrence (e.g. 24h)
    #[arg(long = "recurrence")]
    pub recurrence: Option<String>,
    /// Seed the random sampler for reproducible runs
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    High,
    Medium,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(p: PriorityArg) -> Self {
        match p {
            PriorityArg::High => Self::High,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::Low => Self::Low,
        }
    }
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Get(ConfigGetArgs),
    Set(ConfigSetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

pub async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.cmd {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Config(args) => match args.cmd {
            ConfigCmd::List => {
                print!("{}", config::list_resolved_toml()?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Set(set) => {
                config::set_value_string(&set.key, &set.value)?;
                println!("Set {} = {}", set.key, set.value);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Get(get) => match config::get_value_string(&get.key)? {
                Some(v) => {
                    println!("{v}");
                    Ok(ExitCode::SUCCESS)
                }
                None => anyhow::bail!(
                    "configuration key '{}' not found - use 'tickler config list' to see available keys",
                    get.key
                ),
            },
        },
        Commands::Version => {
            println!("tickler {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn load_cfg() -> anyhow::Result<config::Config> {
    tokio::task::spawn_blocking(config::load).await?
}

async fn cmd_run(args: RunArgs) -> anyhow::Result<ExitCode> {
    if args.at.is_empty() && args.random.is_empty() {
        anyhow::bail!("nothing to schedule - pass at least one --at or --random task");
    }

    let mut cfg = load_cfg().await?;
    if let Some(v) = args.tick_interval {
        cfg.scheduler.tick_interval = v;
    }
    if let Some(v) = args.fire_probability {
        cfg.scheduler.fire_probability = v;
    }
    if let Some(v) = args.recurrence {
        cfg.scheduler.recurrence = v;
    }
    let timing = cfg.scheduler.timing()?;

    let (mgr, mut events) = TaskManager::new(timing, args.seed)?;
    let priority: Priority = args.priority.into();

    for spec in &args.at {
        let (title, at) = split_fixed_spec(spec)?;
        mgr.create_task(NewTask {
            title: title.to_owned(),
            description: String::new(),
            priority,
            reminder: ReminderSpec::At(at.to_owned()),
        })?;
    }
    for title in &args.random {
        mgr.create_task(NewTask {
            title: title.clone(),
            description: String::new(),
            priority,
            reminder: ReminderSpec::Random,
        })?;
    }

    for view in mgr.views() {
        match &view.reminder_time {
            Some(at) => println!("scheduled '{}' daily at {at}", view.title),
            None => println!("scheduled '{}' on the random tick", view.title),
        }
    }
    println!("waiting for reminders (Ctrl-C to stop)");

    // The receive loop is the marshalling point: reminders arrive from
    // scheduler threads and are presented from here only.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                println!(
                    "reminder [{}]: {} (priority {})",
                    event.kind.label(),
                    event.title,
                    event.priority.label()
                );
            }
        }
    }

    mgr.shutdown();
    Ok(ExitCode::SUCCESS)
}

fn split_fixed_spec(spec: &str) -> anyhow::Result<(&str, &str)> {
    let Some((title, at)) = spec.rsplit_once('=') else {
        anyhow::bail!("invalid --at value '{spec}': expected TITLE=HH:MM");
    };
    if title.trim().is_empty() {
        anyhow::bail!("invalid --at value '{spec}': title is empty");
    }
    Ok((title.trim(), at.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_spec_splits_on_last_equals() {
        assert_eq!(
            split_fixed_spec("write report=09:30").unwrap(),
            ("write report", "09:30")
        );
        assert_eq!(split_fixed_spec("a=b=10:00").unwrap(), ("a=b", "10:00"));
        assert!(split_fixed_spec("no-time").is_err());
        assert!(split_fixed_spec("=10:00").is_err());
    }
}
