//! Line-oriented interactive session over stdin.
//!
//! One engine per process. Simulation errors are reported with a hint and
//! the loop continues; I/O and serialization failures end it.

use std::io::{BufRead, Write};

use glam::DVec2;
use plume_core::{SimConfig, SimError};
use plume_engine::SimulationEngine;

use crate::error::CliError;
use crate::{format_state, format_step};

const HELP: &str = "\
commands:
  start X Y   start a session with the vehicle at (X, Y)
  step        advance one step
  run N       advance up to N steps
  state       show the vehicle state
  move X Y    relocate the vehicle without spending energy
  reset       discard the session
  help        show this list
  quit        leave";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplCommand {
    Start(DVec2),
    Step,
    Run(usize),
    State,
    Move(DVec2),
    Reset,
    Help,
    Quit,
}

/// Parses one input line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    if head.starts_with('#') {
        return Ok(None);
    }
    let args: Vec<&str> = words.collect();
    let command = match (head, args.as_slice()) {
        ("start", [x, y]) => ReplCommand::Start(point(x, y)?),
        ("move", [x, y]) => ReplCommand::Move(point(x, y)?),
        ("step", []) => ReplCommand::Step,
        ("run", [n]) => ReplCommand::Run(
            n.parse()
                .map_err(|_| format!("`run` expects a step count, got `{n}`"))?,
        ),
        ("state", []) => ReplCommand::State,
        ("reset", []) => ReplCommand::Reset,
        ("help", []) => ReplCommand::Help,
        ("quit" | "exit", []) => ReplCommand::Quit,
        ("start" | "move", _) => return Err(format!("usage: {head} X Y")),
        ("run", _) => return Err("usage: run N".into()),
        ("step" | "state" | "reset" | "help" | "quit" | "exit", _) => {
            return Err(format!("`{head}` takes no arguments"))
        }
        _ => return Err(format!("unknown command `{head}`; type `help`")),
    };
    Ok(Some(command))
}

fn point(x: &str, y: &str) -> Result<DVec2, String> {
    let coord = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| format!("`{s}` is not a number"))
    };
    Ok(DVec2::new(coord(x)?, coord(y)?))
}

/// What the user can do about `e`.
pub fn hint(e: &SimError) -> Option<String> {
    match e {
        SimError::NoActiveSession => Some("type `start X Y` to begin".into()),
        SimError::NotOperational { .. } => {
            Some("type `start X Y` for a fresh vehicle or `reset`".into())
        }
        SimError::InvalidPosition { size, .. } => {
            Some(format!("both coordinates must lie in [0, {size})"))
        }
        SimError::InvalidArgument(_) => Some("`run` needs a step count of at least 1".into()),
        SimError::InvalidDimensions | SimError::InvalidConfig { .. } => None,
    }
}

/// Reads commands from `input` until EOF or `quit`, writing replies to `out`.
pub fn run_repl(
    engine: &mut SimulationEngine,
    config: &SimConfig,
    input: impl BufRead,
    out: &mut impl Write,
    json: bool,
) -> Result<(), CliError> {
    for line in input.lines() {
        let line = line?;
        log::trace!("repl input: {line}");
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(msg) => {
                writeln!(out, "error: {msg}")?;
                continue;
            }
        };
        if command == ReplCommand::Quit {
            break;
        }
        match execute(engine, config, command, json) {
            Ok(reply) => writeln!(out, "{reply}")?,
            Err(CliError::Engine(e)) => report(out, &e, json)?,
            Err(other) => return Err(other),
        }
    }
    Ok(())
}

fn report(out: &mut impl Write, e: &SimError, json: bool) -> Result<(), CliError> {
    if json {
        let j = serde_json::json!({"error": e.to_string(), "hint": hint(e)});
        writeln!(out, "{j}")?;
    } else {
        writeln!(out, "error: {e}")?;
        if let Some(h) = hint(e) {
            writeln!(out, "  hint: {h}")?;
        }
    }
    Ok(())
}

fn execute(
    engine: &mut SimulationEngine,
    config: &SimConfig,
    command: ReplCommand,
    json: bool,
) -> Result<String, CliError> {
    let reply = match command {
        ReplCommand::Start(p) => {
            let summary = engine.start_session(p, config.clone())?;
            if json {
                serde_json::to_string(&summary)?
            } else {
                format!(
                    "session started (seed {}): vehicle at ({:.2}, {:.2}), {} sensors",
                    summary.seed, p.x, p.y, summary.sensor_count
                )
            }
        }
        ReplCommand::Step => {
            let r = engine.step()?;
            if json {
                serde_json::to_string(&r)?
            } else {
                format_step(&r)
            }
        }
        ReplCommand::Run(n) => {
            let results = engine.run_multiple_steps(n)?;
            if json {
                serde_json::to_string(&results)?
            } else if results.is_empty() {
                "no steps taken: energy depleted".into()
            } else {
                let mut lines: Vec<String> = results.iter().map(format_step).collect();
                if let Some(last) = results.last().filter(|r| !r.operational) {
                    lines.push(format!("vehicle depleted after {} steps", last.time_step));
                }
                lines.join("\n")
            }
        }
        ReplCommand::State => {
            let state = engine.state()?;
            if json {
                serde_json::to_string(&state)?
            } else {
                format_state(&state)
            }
        }
        ReplCommand::Move(p) => {
            let p = engine.relocate(p)?;
            if json {
                serde_json::json!({"position": [p.x, p.y]}).to_string()
            } else {
                format!("vehicle moved to ({:.2}, {:.2})", p.x, p.y)
            }
        }
        ReplCommand::Reset => {
            engine.reset();
            if json {
                serde_json::json!({"reset": true}).to_string()
            } else {
                "session cleared".into()
            }
        }
        ReplCommand::Help => HELP.into(),
        ReplCommand::Quit => String::new(),
    };
    Ok(reply)
}
