#![deny(unsafe_code)]
//! CLI binary for the plume-tracking simulation.
//!
//! Subcommands:
//! - `run`: start a session and step the vehicle
//! - `field`: write the concentration and flow fields as JSON
//! - `sensors`: print the sensor readings
//! - `config`: print the effective configuration
//! - `repl`: drive a session interactively from stdin
//!
//! Set `RUST_LOG=debug` to see per-step logging.

mod error;
mod repl;

use clap::{Args, Parser, Subcommand};
use error::CliError;
use glam::DVec2;
use plume_core::SimConfig;
use plume_engine::{AuvSnapshot, SimulationEngine, StepResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "plume", about = "Plume-tracking AUV simulation")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Where the configuration comes from.
#[derive(Args)]
struct ConfigArgs {
    /// PRNG seed for deterministic output; overrides any seed in the config.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file, applied before --params.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Config overrides as a JSON string.
    #[arg(long, default_value = "{}")]
    params: String,
}

#[derive(Args)]
struct StartArgs {
    /// Initial vehicle x coordinate.
    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    x: f64,

    /// Initial vehicle y coordinate.
    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    y: f64,

    #[command(flatten)]
    settings: ConfigArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Start a session and advance the vehicle up to N steps.
    Run {
        #[command(flatten)]
        start: StartArgs,

        /// Number of steps; the run ends early if the battery empties.
        #[arg(short, long, default_value_t = 20)]
        steps: usize,
    },
    /// Write the session's grid, concentration and flow fields as JSON.
    Field {
        #[command(flatten)]
        start: StartArgs,

        /// Output file path.
        #[arg(short, long, default_value = "field.json")]
        output: PathBuf,
    },
    /// Print the session's sensor readings.
    Sensors {
        #[command(flatten)]
        start: StartArgs,
    },
    /// Print the effective configuration.
    Config {
        #[command(flatten)]
        settings: ConfigArgs,
    },
    /// Read commands from stdin (`help` lists them).
    Repl {
        #[command(flatten)]
        settings: ConfigArgs,
    },
}

fn parse_object(text: &str, source: &str) -> Result<Map<String, Value>, CliError> {
    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::Input(format!("{source}: expected a JSON object"))),
        Err(e) => Err(CliError::Input(format!("invalid JSON in {source}: {e}"))),
    }
}

/// Builds the session config: defaults, then the config file, then `--params`, then `--seed`.
fn load_config(args: &ConfigArgs) -> Result<SimConfig, CliError> {
    let mut merged = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| CliError::Io(format!("cannot read {}: {e}", path.display())))?;
            parse_object(&text, &path.display().to_string())?
        }
        None => Map::new(),
    };
    merged.extend(parse_object(&args.params, "--params")?);

    let mut config = SimConfig::from_json(&Value::Object(merged));
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    config.validate()?;
    log::debug!(
        "config: {}x{} grid, {} sensors, seed {:?}",
        config.grid_size,
        config.grid_size,
        config.sensor_count,
        config.seed
    );
    Ok(config)
}

fn start(args: &StartArgs, json: bool) -> Result<SimulationEngine, CliError> {
    let config = load_config(&args.settings)?;
    let mut engine = SimulationEngine::new();
    let summary = engine.start_session(DVec2::new(args.x, args.y), config)?;
    if !json {
        eprintln!(
            "session seed {}: {}x{} grid, {} sensors, vehicle at ({:.2}, {:.2})",
            summary.seed,
            summary.grid_size,
            summary.grid_size,
            summary.sensor_count,
            args.x,
            args.y
        );
    }
    Ok(engine)
}

pub(crate) fn format_step(r: &StepResult) -> String {
    format!(
        "step {:>3}  pos ({:6.2}, {:6.2})  c {:.4}  energy {:5.1}  to target {:6.2}{}",
        r.time_step,
        r.position.x,
        r.position.y,
        r.concentration,
        r.energy,
        r.distance_to_target,
        if r.target_reached { "  reached" } else { "" }
    )
}

pub(crate) fn format_state(s: &AuvSnapshot) -> String {
    format!(
        "position ({:.2}, {:.2}), energy {:.1}, time step {}, trajectory {} points, operational: {}",
        s.position.x,
        s.position.y,
        s.energy,
        s.time_step,
        s.trajectory.len(),
        if s.operational { "yes" } else { "no" }
    )
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<(), CliError> {
    let text = serde_json::to_string(value)?;
    fs::write(path, &text)
        .map_err(|e| CliError::Io(format!("cannot write {}: {e}", path.display())))?;
    log::info!("wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Run { start: args, steps } => {
            let mut engine = start(&args, cli.json)?;
            let results = engine.run_multiple_steps(steps)?;
            if cli.json {
                let info = serde_json::json!({
                    "seed": engine.seed()?,
                    "steps": results,
                    "final_state": engine.state()?,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                for r in &results {
                    println!("{}", format_step(r));
                }
                println!("{}", format_state(&engine.state()?));
            }
        }
        Command::Field {
            start: args,
            output,
        } => {
            let engine = start(&args, cli.json)?;
            let snapshot = engine.field_snapshot()?;
            write_json(&output, &snapshot)?;

            let (min, max) = snapshot.concentration.min_max();
            if cli.json {
                let info = serde_json::json!({
                    "output": output.display().to_string(),
                    "grid_size": snapshot.concentration.size(),
                    "min": min,
                    "max": max,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "wrote {n}x{n} field (concentration {min:.3}..{max:.3}) -> {}",
                    output.display(),
                    n = snapshot.concentration.size()
                );
            }
        }
        Command::Sensors { start: args } => {
            let engine = start(&args, cli.json)?;
            let sensors = engine.sensors()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(sensors)?);
            } else {
                println!("{:>8} {:>8} {:>8} {:>8} {:>8}", "x", "y", "c", "u", "v");
                for s in sensors {
                    println!(
                        "{:8.2} {:8.2} {:8.4} {:8.4} {:8.4}",
                        s.position.x, s.position.y, s.concentration, s.flow.x, s.flow.y
                    );
                }
            }
        }
        Command::Config { settings } => {
            let config = load_config(&settings)?;
            println!("{}", serde_json::to_string_pretty(&config.to_json())?);
        }
        Command::Repl { settings } => {
            let config = load_config(&settings)?;
            let mut engine = SimulationEngine::new();
            log::info!("repl ready, reading commands from stdin");
            let stdin = io::stdin();
            repl::run_repl(
                &mut engine,
                &config,
                stdin.lock(),
                &mut io::stdout(),
                cli.json,
            )?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use plume_core::{EnergyPolicy, SimError};

    fn settings(params: &str, config: Option<PathBuf>, seed: Option<u64>) -> ConfigArgs {
        ConfigArgs {
            seed,
            config,
            params: params.into(),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "plume", "run", "--x", "12.5", "--y", "30", "--steps", "5", "--seed", "9", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        let Command::Run { start, steps } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(steps, 5);
        assert_eq!(start.x, 12.5);
        assert_eq!(start.settings.seed, Some(9));
    }

    #[test]
    fn default_config_loads() {
        let config = load_config(&settings("{}", None, None)).unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn params_override_config_file_and_seed_overrides_both() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.json");
        fs::write(&path, r#"{"grid_size": 60, "sigma": 5, "seed": 1}"#).unwrap();

        let config =
            load_config(&settings(r#"{"sigma": 6, "step_cost": 10}"#, Some(path), Some(3)))
                .unwrap();
        assert_eq!(config.grid_size, 60);
        assert_eq!(config.sigma, 6.0);
        assert_eq!(config.energy_policy, EnergyPolicy::Flat { cost: 10.0 });
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn malformed_params_are_input_errors() {
        let err = load_config(&settings("{nope", None, None)).unwrap_err();
        assert_eq!(err.exit_code(), 12);
        let err = load_config(&settings("[1, 2]", None, None)).unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&settings("{}", Some(dir.path().join("absent.json")), None))
            .unwrap_err();
        assert_eq!(err.exit_code(), 11);
    }

    #[test]
    fn invalid_values_are_engine_errors() {
        let err = load_config(&settings(r#"{"sigma": -2}"#, None, None)).unwrap_err();
        assert!(matches!(err, CliError::Engine(SimError::InvalidConfig { .. })));
        let err = load_config(&settings(r#"{"grid_size": 1000000}"#, None, None)).unwrap_err();
        assert!(matches!(err, CliError::Engine(SimError::InvalidConfig { ref name, .. }) if name == "grid_size"));
    }

    #[test]
    fn start_outside_domain_fails() {
        let args = StartArgs {
            x: 150.0,
            y: 10.0,
            settings: settings("{}", None, Some(1)),
        };
        let err = start(&args, true).unwrap_err();
        assert!(matches!(err, CliError::Engine(SimError::InvalidPosition { .. })));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn field_snapshot_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.json");
        let args = StartArgs {
            x: 10.0,
            y: 10.0,
            settings: settings(r#"{"grid_size": 16, "center": [8, 8]}"#, None, Some(4)),
        };
        let engine = start(&args, true).unwrap();
        write_json(&path, &engine.field_snapshot().unwrap()).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["concentration"].as_array().unwrap().len(), 16);
        assert_eq!(written["flow"]["v"][15].as_array().unwrap().len(), 16);
        assert_eq!(written["center"], serde_json::json!([8.0, 8.0]));
    }

    #[test]
    fn write_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_json(&dir.path().join("no/such/dir.json"), &1).unwrap_err();
        assert_eq!(err.exit_code(), 11);
    }

    #[test]
    fn step_lines_flag_target_reached() {
        let r = StepResult {
            position: DVec2::new(49.0, 51.0),
            energy: 40.0,
            time_step: 12,
            concentration: 0.97,
            operational: true,
            distance_to_target: 1.41,
            target_reached: true,
        };
        let line = format_step(&r);
        assert!(line.starts_with("step  12"));
        assert!(line.ends_with("reached"));
    }
}
