//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Binary entrypoint for the dead-ship trainer."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use deadship_common::config::AppConfig;
use deadship_common::logging::init_tracing;
use deadship_common::time::{format_sim_time, millis};
use deadship_rt::RateLimiter;
use deadship_sim::{Command, EngineSnapshot};
use deadship_testharness::{
    catalogue, DiagnosticRecord, ScenarioId, ScenarioNotice, SessionSnapshot, TrainingSession,
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

mod console;

use console::{parse_line, ConsoleCommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "MP120 emergency generator dead-ship start trainer",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Seed for the breaker auto-close delay (overrides configuration)")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "List the canonical scenarios")]
    Scenarios,
    #[command(about = "Play one scenario to completion and report the result")]
    Run {
        #[arg(help = "Scenario number (1-5) or name")]
        scenario: ScenarioId,
        #[arg(long, help = "Pace playback against the wall clock")]
        realtime: bool,
        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },
    #[command(about = "Read operator commands from stdin")]
    Console {
        #[arg(long, help = "Advance the clock continuously instead of on `advance`")]
        realtime: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // An explicit --config must exist; otherwise the bundled file is optional.
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_with_source(&[path])?,
        None => AppConfig::load_or_default(&[PathBuf::from("configs/deadship.toml")])?,
    };
    let mut config = loaded.config;
    if let Some(seed) = cli.seed {
        config.simulation.random_seed = Some(seed);
    }
    config.validate()?;
    init_tracing("deadshipd", &config.logging)?;
    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; using built-in defaults"),
    }

    match cli.command.unwrap_or(Commands::Scenarios) {
        Commands::Scenarios => print_catalogue(),
        Commands::Run {
            scenario,
            realtime,
            json,
        } => run_scenario(&config, scenario, realtime, json).await?,
        Commands::Console { realtime } => run_console(&config, realtime).await?,
    }
    Ok(())
}

fn print_catalogue() {
    for script in catalogue() {
        println!(
            "{}  {:<32} {}  [{}]",
            script.id.number(),
            script.name,
            script.description,
            script.duration
        );
        for line in script.outline {
            println!("     - {line}");
        }
    }
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    scenario: ScenarioId,
    diagnostics: &'a [DiagnosticRecord],
    notices: Vec<ScenarioNotice>,
    final_snapshot: SessionSnapshot,
}

async fn run_scenario(config: &AppConfig, id: ScenarioId, realtime: bool, json: bool) -> Result<()> {
    let script = id.script();
    let mut session = TrainingSession::new(&config.simulation);
    info!(
        scenario = id.as_str(),
        wall_clock = %Utc::now().to_rfc3339(),
        "playing {}",
        script.name
    );
    // Margin for the completion notice after the last step.
    let budget = script.total_delay() + config.simulation.notice_delay + Duration::from_secs(1);
    session.run_scenario(id);

    if realtime {
        let shared = Arc::new(Mutex::new(session));
        let finished = pace(shared.clone(), config, true).await?;
        if !finished {
            warn!("playback interrupted before the scenario finished");
        }
        session = match Arc::try_unwrap(shared) {
            Ok(mutex) => mutex.into_inner(),
            Err(_) => bail!("session still shared after playback"),
        };
    } else if !session.run_until_idle(budget) {
        bail!("scenario {} did not finish within {:?}", id.number(), budget);
    }

    let notices = session.take_notices();
    if json {
        let report = RunReport {
            scenario: id,
            diagnostics: session.diagnostics(),
            notices,
            final_snapshot: session.snapshot(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialise run report")?
        );
    } else {
        for record in session.diagnostics() {
            println!(
                "{}  {}: {}",
                format_sim_time(Duration::from_millis(record.at_ms)),
                record.message,
                status_fields(&record.snapshot)
            );
        }
        for notice in &notices {
            println!("{}", notice.message);
        }
        println!("{}", status_line(&session.snapshot()));
    }
    Ok(())
}

/// Drive the shared session against the wall clock, one frame per tick.
///
/// Returns `true` when it stopped because the session went idle and `false`
/// when interrupted.
async fn pace(
    session: Arc<Mutex<TrainingSession>>,
    config: &AppConfig,
    stop_when_idle: bool,
) -> Result<bool> {
    let frame = config.simulation.frame_period;
    let mut limiter = RateLimiter::new(config.playback_period()?);
    let status_every = config.runtime.snapshot_period;
    let mut last_status = Duration::ZERO;
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = limiter.tick() => {}
            result = &mut ctrl_c => {
                result.context("failed to listen for ctrl-c")?;
                info!("ctrl-c received; stopping playback");
                return Ok(false);
            }
        }
        let mut guard = session.lock();
        guard.advance(frame);
        let snapshot = guard.snapshot();
        if snapshot.engine.sim_time_ms >= millis(last_status + status_every) {
            last_status = guard.now();
            info!(target: "deadshipd::status", "{}", status_line(&snapshot));
        }
        if stop_when_idle && !snapshot.is_scenario_running && !guard.runner().notice_pending() {
            return Ok(true);
        }
        if !stop_when_idle {
            for notice in guard.take_notices() {
                println!("{}", notice.message);
            }
        }
    }
}

async fn run_console(config: &AppConfig, realtime: bool) -> Result<()> {
    let session = Arc::new(Mutex::new(TrainingSession::new(&config.simulation)));
    let pacer = if realtime {
        let shared = session.clone();
        let config = config.clone();
        Some(tokio::spawn(async move { pace(shared, &config, false).await }))
    } else {
        None
    };

    println!("dead-ship trainer console; type `help` for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("error: {err}");
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }
        let mut guard = session.lock();
        execute(&mut guard, command)?;
    }

    if let Some(handle) = pacer {
        handle.abort();
    }
    Ok(())
}

fn execute(session: &mut TrainingSession, command: ConsoleCommand) -> Result<()> {
    match command {
        ConsoleCommand::Plant(command) => {
            let outcome = session.handle(command);
            match outcome.rejection() {
                Some(rejection) => println!("rejected: {rejection}"),
                None => println!("ok"),
            }
        }
        ConsoleCommand::Pump(strokes) => {
            for _ in 0..strokes {
                if let Some(rejection) = session.handle(Command::ManualPump).rejection() {
                    println!("rejected: {rejection}");
                    return Ok(());
                }
            }
            println!(
                "hydraulic {:.0} psi",
                session.simulator().resources().hydraulic_psi
            );
        }
        ConsoleCommand::Scenario(id) => {
            session.run_scenario(id);
            println!("playing scenario {} ({})", id.number(), id.script().name);
        }
        ConsoleCommand::Scenarios => print_catalogue(),
        ConsoleCommand::Advance(by) => {
            let seen = session.diagnostics().len();
            session.advance(by);
            for record in session.diagnostics().iter().skip(seen) {
                println!("diagnostic: {}", record.message);
            }
            for notice in session.take_notices() {
                println!("{}", notice.message);
            }
            println!("{}", status_line(&session.snapshot()));
        }
        ConsoleCommand::Snapshot => {
            println!(
                "{}",
                serde_json::to_string_pretty(&session.snapshot())
                    .context("failed to serialise snapshot")?
            );
        }
        ConsoleCommand::Status => println!("{}", status_line(&session.snapshot())),
        ConsoleCommand::Help => println!("{}", console::HELP),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

fn status_line(snapshot: &SessionSnapshot) -> String {
    let engine = &snapshot.engine;
    let scenario = match snapshot.active_scenario_id {
        Some(id) => format!(" scenario={id}"),
        None => String::new(),
    };
    format!(
        "{} {}{}",
        format_sim_time(Duration::from_millis(engine.sim_time_ms)),
        status_fields(engine),
        scenario
    )
}

fn status_fields(engine: &EngineSnapshot) -> String {
    let state = engine.engine_state.as_str();
    let lamp = |on: bool| if on { "ON" } else { "off" };
    format!(
        "{state:<8} {:>5.1} V {:>5.2} Hz {:>3.0} rpm {:>4.1} kW | batt {:>4.1} V ({}) fuel {:.3} m³ hyd {:>3.0} psi | trip {} fts {} stab {} | breaker {}",
        engine.outputs.voltage_v,
        engine.outputs.frequency_hz,
        engine.outputs.rpm,
        engine.outputs.power_kw,
        engine.resources.battery_v,
        engine.indications.battery_band,
        engine.resources.fuel_m3,
        engine.resources.hydraulic_psi,
        lamp(engine.alarms.trip),
        lamp(engine.alarms.fail_to_start),
        lamp(engine.alarms.stabilized),
        if engine.inputs.breaker_closed { "closed" } else { "open" },
    )
}
