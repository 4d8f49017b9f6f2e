#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs emission simulation scenarios.

mod presets;
mod scenario_transfer;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use emission_sim_core::{Scenario, Tick};
use emission_sim_engine::{format_amount, simulate};

/// Command-line interface for the emission simulation engine.
#[derive(Parser)]
#[command(
    name = "emission-sim",
    about = "Deterministic token-emission scenario simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Runs a scenario and prints the resulting tick stream.
    Run {
        /// Name of a built-in preset to run.
        #[arg(long)]
        preset: Option<String>,
        /// Path of a TOML scenario file to run.
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Scenario transfer code to decode and run.
        #[arg(long)]
        code: Option<String>,
        /// Output format for the tick stream.
        #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
        format: OutputFormat,
    },
    /// Lists the built-in scenario presets.
    Presets,
    /// Prints the transfer code for a preset or scenario file.
    Encode {
        /// Name of a built-in preset to encode.
        #[arg(long)]
        preset: Option<String>,
        /// Path of a TOML scenario file to encode.
        #[arg(long)]
        scenario: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Phase transitions, event labels and final totals.
    Summary,
    /// The complete tick array as pretty-printed JSON.
    Json,
}

/// Entry point for the emission simulation command-line interface.
fn main() -> Result<()> {
    match Cli::parse().command {
        CliCommand::Run {
            preset,
            scenario,
            code,
            format,
        } => {
            let resolved =
                resolve_scenario(preset.as_deref(), scenario.as_deref(), code.as_deref())?;
            let ticks = simulate(&resolved.config, &resolved.events, &resolved.curve);
            match format {
                OutputFormat::Summary => print_summary(&ticks),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&ticks)?);
                }
            }
            Ok(())
        }
        CliCommand::Presets => {
            for preset in presets::all() {
                println!("{:<18} {}", preset.name, preset.summary);
            }
            Ok(())
        }
        CliCommand::Encode { preset, scenario } => {
            let resolved = resolve_scenario(preset.as_deref(), scenario.as_deref(), None)?;
            println!("{}", scenario_transfer::encode(&resolved));
            Ok(())
        }
    }
}

fn resolve_scenario(
    preset: Option<&str>,
    scenario: Option<&Path>,
    code: Option<&str>,
) -> Result<Scenario> {
    match (preset, scenario, code) {
        (Some(name), None, None) => presets::find(name).with_context(|| {
            format!("unknown preset `{name}`; run `emission-sim presets` for the list")
        }),
        (None, Some(path), None) => load_scenario_file(path),
        (None, None, Some(code)) => scenario_transfer::decode(code)
            .context("failed to decode scenario transfer code"),
        (None, None, None) => {
            presets::find(presets::DEFAULT_PRESET).context("default preset missing")
        }
        _ => bail!("choose exactly one of --preset, --scenario or --code"),
    }
}

fn load_scenario_file(path: &Path) -> Result<Scenario> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file at {}", path.display()))?;
    toml::from_str(&contents).context("failed to parse scenario toml contents")
}

fn print_summary(ticks: &[Tick]) {
    let mut previous_phase = None;
    for tick in ticks {
        if previous_phase != Some(tick.phase) {
            println!("day {:>7.2}  phase -> {}", tick.day, tick.phase);
            previous_phase = Some(tick.phase);
        }
        if let Some(label) = &tick.label {
            println!("day {:>7.2}  {label}", tick.day);
        }
    }

    let Some(last) = ticks.last() else {
        return;
    };
    println!();
    println!("ticks              {}", ticks.len());
    println!(
        "pool accrued       {}{}",
        format_amount(last.pool_accrued),
        if last.pool_maxed { " (maxed)" } else { "" }
    );
    println!(
        "acquisition rate   {}/s",
        format_amount(last.acquisition_rate)
    );
    println!(
        "gross deposits     {}",
        format_amount(last.total_gross_deposits)
    );
    println!(
        "net deposits       {}",
        format_amount(last.total_net_deposits)
    );
    println!("bump rate          {:.4}", last.bump_rate);
    println!("cdp rate impact    {:.4}", last.cdp_rate_impact);
    match last.acquisition_budget {
        Some(budget) => println!("acquisition budget {}", format_amount(budget)),
        None => println!("acquisition budget unset"),
    }
}
