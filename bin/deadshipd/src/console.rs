//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Line-oriented operator console for the training session."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::str::FromStr;
use std::time::Duration;

use deadship_sim::{Command, Valve};
use deadship_testharness::ScenarioId;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  valve <DO32|DO33|DO44> <open|close>
  start | start battery          battery-path start
  hy31 | start hydraulic         momentary HY31 pulse, hydraulic start
  stop [reason...]               stop the engine; a reason raises the trip lamp
  breaker <close|open>
  test-mode <on|off>
  shore <on|off>
  pump [strokes]                 hand pump, +20 psi per stroke
  reset
  scenario <1-5|name>            reset and play a canonical scenario
  scenarios                      list the scenario catalogue
  advance <seconds>              move the virtual clock
  snapshot                       print the full snapshot as JSON
  status                         one-line status
  help | quit";

/// Longest single `advance`; covers the slowest scenario with margin.
pub const MAX_ADVANCE: Duration = Duration::from_secs(4 * 3_600);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandParseError {
    #[error("unknown command `{0}`; type `help`")]
    UnknownVerb(String),
    #[error("`{verb}` needs {expected}")]
    MissingArgument {
        verb: &'static str,
        expected: &'static str,
    },
    #[error("`{value}` is not a valid {what}")]
    InvalidArgument { what: &'static str, value: String },
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Plant(Command),
    Pump(u32),
    Scenario(ScenarioId),
    Scenarios,
    Advance(Duration),
    Snapshot,
    Status,
    Help,
    Quit,
}

/// Parse one console line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, CommandParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let command = match verb.as_str() {
        "valve" => {
            let name = args.first().ok_or(CommandParseError::MissingArgument {
                verb: "valve",
                expected: "a valve name",
            })?;
            let valve = Valve::from_str(&name.to_ascii_uppercase()).map_err(|_| {
                CommandParseError::InvalidArgument {
                    what: "valve (DO32, DO33, DO44)",
                    value: (*name).to_owned(),
                }
            })?;
            let open = position(args.get(1).copied(), "valve")?;
            ConsoleCommand::Plant(Command::SetValve { valve, open })
        }
        "start" => match args.first().map(|arg| arg.to_ascii_lowercase()).as_deref() {
            None | Some("battery") => ConsoleCommand::Plant(Command::StartBatteryPath),
            Some("hydraulic") => ConsoleCommand::Plant(Command::PulseHy31),
            Some(other) => {
                return Err(CommandParseError::InvalidArgument {
                    what: "start path (battery, hydraulic)",
                    value: other.to_owned(),
                })
            }
        },
        "hy31" => ConsoleCommand::Plant(Command::PulseHy31),
        "stop" => {
            let reason = (!args.is_empty()).then(|| args.join(" "));
            ConsoleCommand::Plant(Command::StopEngine { reason })
        }
        "breaker" | "acb" => {
            let closed = position(args.first().copied(), "breaker")?;
            if closed {
                ConsoleCommand::Plant(Command::CloseBreaker)
            } else {
                ConsoleCommand::Plant(Command::OpenBreaker)
            }
        }
        "test-mode" | "testmode" => {
            ConsoleCommand::Plant(Command::SetTestMode(switch(args.first().copied(), "test-mode")?))
        }
        "shore" => ConsoleCommand::Plant(Command::SetShorePower(switch(
            args.first().copied(),
            "shore",
        )?)),
        "pump" => {
            let strokes = match args.first() {
                None => 1,
                Some(raw) => raw.parse::<u32>().map_err(|_| CommandParseError::InvalidArgument {
                    what: "stroke count",
                    value: (*raw).to_owned(),
                })?,
            };
            ConsoleCommand::Pump(strokes)
        }
        "reset" => ConsoleCommand::Plant(Command::Reset),
        "scenario" | "run" => {
            let raw = args.first().ok_or(CommandParseError::MissingArgument {
                verb: "scenario",
                expected: "a scenario number or name",
            })?;
            let id = raw
                .parse::<ScenarioId>()
                .map_err(|_| CommandParseError::InvalidArgument {
                    what: "scenario",
                    value: (*raw).to_owned(),
                })?;
            ConsoleCommand::Scenario(id)
        }
        "scenarios" => ConsoleCommand::Scenarios,
        "advance" | "wait" => {
            let raw = args.first().ok_or(CommandParseError::MissingArgument {
                verb: "advance",
                expected: "a number of seconds",
            })?;
            let by = raw
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .filter(|by| *by <= MAX_ADVANCE)
                .ok_or_else(|| CommandParseError::InvalidArgument {
                    what: "duration in seconds (0 to 14400)",
                    value: (*raw).to_owned(),
                })?;
            ConsoleCommand::Advance(by)
        }
        "snapshot" => ConsoleCommand::Snapshot,
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(CommandParseError::UnknownVerb(other.to_owned())),
    };
    Ok(Some(command))
}

/// `open`/`close` for valves and the breaker. Returns `true` for open valves
/// and for a closed breaker.
fn position(raw: Option<&str>, verb: &'static str) -> Result<bool, CommandParseError> {
    let raw = raw.ok_or(CommandParseError::MissingArgument {
        verb,
        expected: "open or close",
    })?;
    let closing = match raw.to_ascii_lowercase().as_str() {
        "open" | "opened" => false,
        "close" | "closed" | "shut" => true,
        _ => {
            return Err(CommandParseError::InvalidArgument {
                what: "position (open, close)",
                value: raw.to_owned(),
            })
        }
    };
    Ok(if verb == "breaker" { closing } else { !closing })
}

fn switch(raw: Option<&str>, verb: &'static str) -> Result<bool, CommandParseError> {
    let raw = raw.ok_or(CommandParseError::MissingArgument {
        verb,
        expected: "on or off",
    })?;
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(CommandParseError::InvalidArgument {
            what: "switch (on, off)",
            value: raw.to_owned(),
        }),
    }
}
