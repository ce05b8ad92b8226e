use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use key_runner::{
    default_injector, KeyInjector, KeyRunner, KeySymbolTable, NoopInjector, RepeatChoice,
    RunConfig, RunInput, RunStatus,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Repeat a keyboard key sequence with configurable timing
#[derive(Parser, Debug)]
#[command(name = "krun", version, about)]
struct Cli {
    /// Comma-separated key sequence, e.g. "a,b,enter"
    #[arg(short, long, conflicts_with = "config", required_unless_present_any = ["config", "list_keys"])]
    keys: Option<String>,

    /// Seconds to wait after each key
    #[arg(short, long, default_value = "1")]
    delay: String,

    /// Seconds to count down before the first key
    #[arg(short, long, default_value = "")]
    wait: String,

    /// How often to play the sequence
    #[arg(short, long, value_enum, default_value_t = RepeatChoice::Infinite)]
    repeat: RepeatChoice,

    /// Number of cycles when --repeat count is used
    #[arg(short = 'n', long, default_value = "1")]
    count: String,

    /// Load the run from a JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Write the effective configuration to a JSON file before running
    #[arg(long)]
    save_config: Option<String>,

    /// Log key events instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Print the supported key names and exit
    #[arg(long)]
    list_keys: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list_keys {
        print_keys();
        return Ok(());
    }

    let config = load_config(&cli)?;

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
        println!("{} {}", "Saved configuration to".green(), path);
    }

    let injector: Arc<dyn KeyInjector> = if cli.dry_run {
        warn!("dry run: no keys will be sent");
        Arc::new(NoopInjector)
    } else {
        default_injector()
            .context("failed to initialise keyboard injection")?
            .into()
    };

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let mut runner = KeyRunner::new(injector);
    runner.on_status(move |status| {
        let _ = status_tx.send(status.clone());
    });

    print_summary(&config);
    runner.start(config)?;

    let mut failure = None;
    loop {
        tokio::select! {
            status = status_rx.recv() => {
                let Some(status) = status else { break };
                print_status(&status);
                if let RunStatus::Failed { message } = &status {
                    failure = Some(message.clone());
                }
                if status.is_terminal() {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("failed to listen for Ctrl+C: {}", e);
                }
                debug!("Ctrl+C received");
                runner.stop();
            }
        }
    }

    runner.wait_idle().await;

    match failure {
        Some(message) => bail!("key loop aborted: {message}"),
        None => Ok(()),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<RunConfig> {
    if let Some(path) = &cli.config {
        return RunConfig::from_file(path).map_err(Into::into);
    }

    let input = RunInput {
        keys: cli.keys.clone().unwrap_or_default(),
        delay: cli.delay.clone(),
        wait: cli.wait.clone(),
        repeat: cli.repeat,
        count: cli.count.clone(),
    };
    Ok(input.parse()?)
}

fn print_summary(config: &RunConfig) {
    println!("{}", "Key Runner".bold());
    println!("  {} {}", "keys:  ".dimmed(), config.sequence.join(", "));
    println!("  {} {}s", "delay: ".dimmed(), config.inter_key_delay_secs);
    if config.pre_start_wait_secs > 0.0 {
        println!("  {} {}s", "wait:  ".dimmed(), config.pre_start_wait_secs);
    }
    println!("  {} {}", "repeat:".dimmed(), config.repeat);
    println!("{}", "Press Ctrl+C to stop".dimmed());
}

fn print_status(status: &RunStatus) {
    let line = status.to_string();
    let line = match status {
        RunStatus::Waiting { .. } => line.yellow(),
        RunStatus::Cycle { .. } => line.cyan(),
        RunStatus::Stopped => line.yellow().bold(),
        RunStatus::Completed => line.green().bold(),
        RunStatus::Failed { .. } => line.red().bold(),
    };
    println!("{line}");
}

fn print_keys() {
    for (name, code) in KeySymbolTable::global().symbols() {
        println!("{:<10} {}", name, format!("{code:#04x}").dimmed());
    }
}
