use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use text_to_action::config::{RecoveryConfig, Settings, SharedConfig};
use text_to_action::pipeline::{self, RecoveryError, Stage};
use text_to_action::planner::{ActionPlanner, Planner};
use text_to_action::protocol::ActionPlan;
use text_to_action::telemetry;
use text_to_action::tools::build_generator;

#[derive(Parser)]
#[command(name = "text-to-action", version, about = "Turn instructions into validated action plans")]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true, env = "TEXT_TO_ACTION_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recover a plan from raw model output (FILE or stdin)
    Validate { file: Option<PathBuf> },
    /// Generate a plan for one instruction with the configured backend
    Infer { instruction: String },
    /// One instruction per line (FILE or stdin); prints a JSON array of outcomes
    Batch { file: Option<PathBuf> },
    /// Check that the configured backend can serve requests
    Health,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "config error:".red().bold(), e);
            return ExitCode::from(2);
        }
    };
    telemetry::init(cli.log_level.as_deref().unwrap_or(&settings.log_level));

    match cli.command {
        Command::Validate { file } => {
            let raw = match read_input(file.as_deref()) {
                Ok(raw) => raw,
                Err(e) => return io_failure(e),
            };
            match pipeline::validate(&raw, &settings.recovery) {
                Ok(plan) => print_plan(&plan),
                Err(e) => {
                    report_recovery_error(&e, &raw, &settings.recovery);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Infer { instruction } => {
            let planner = build_planner(&settings);
            match planner.generate_plan(&instruction) {
                Ok(plan) => print_plan(&plan),
                Err(e) => {
                    eprintln!("{} [{}] {}", "error:".red().bold(), e.status_code(), e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Batch { file } => {
            let input = match read_input(file.as_deref()) {
                Ok(input) => input,
                Err(e) => return io_failure(e),
            };
            let instructions: Vec<&str> = input
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();

            let outcomes = build_planner(&settings).plan_batch(&instructions);
            let failed = outcomes.iter().filter(|o| !o.is_planned()).count();
            match serde_json::to_string_pretty(&outcomes) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("{} {}", "error:".red().bold(), e);
                    return ExitCode::FAILURE;
                }
            }
            eprintln!(
                "{}",
                format!("{} planned, {} failed", outcomes.len() - failed, failed).dimmed()
            );
            if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Health => {
            let planner = build_planner(&settings);
            match planner.ready() {
                Ok(()) => {
                    println!("{} {} backend ready", "✓".green().bold(), planner.backend_name());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{} {} {}", "✗".red().bold(), planner.backend_name(), e.to_string().red());
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn build_planner(settings: &Settings) -> ActionPlanner {
    ActionPlanner::new(
        build_generator(&settings.backend),
        Arc::new(SharedConfig::new(settings.recovery.clone())),
    )
}

fn read_input(file: Option<&Path>) -> io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn io_failure(e: io::Error) -> ExitCode {
    eprintln!("{} {}", "input error:".red().bold(), e);
    ExitCode::from(2)
}

fn print_plan(plan: &ActionPlan) -> ExitCode {
    match serde_json::to_string_pretty(&plan.to_json()) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Prints the first failure, then every bad step with its fix.
fn report_recovery_error(err: &RecoveryError, raw: &str, config: &RecoveryConfig) {
    eprintln!("{} {}", "✗".red().bold(), err.to_string().red());
    if err.stage == Stage::Validate {
        for violation in pipeline::diagnose(raw, config) {
            let (msg, example) = violation.hint(config);
            eprintln!("{} {} {}", "hint:".yellow(), format!("[step {}]", violation.step_index).bold(), msg);
            if let Some(example) = example {
                eprintln!("{} {}", "  →".yellow(), example);
            }
        }
    }
    eprintln!("{} {}", "raw:".dimmed(), err.raw_excerpt.dimmed());
}
