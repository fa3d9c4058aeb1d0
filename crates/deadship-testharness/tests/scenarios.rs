//! ---
//! ems_section: "15-testing-qa-runbook"
//! ems_subsection: "integration-tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "End-to-end playback of the canonical scenarios."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use deadship_sim::params::{AUTO_BREAKER_MAX, AUTO_BREAKER_MIN};
use deadship_sim::{Command, CommandOutcome, EngineState, InputPatch, Rejection, SimTimer};
use deadship_testharness::{
    ScenarioAction, ScenarioId, ScenarioScript, ScenarioStep, TrainingSession,
};

const BUDGET: Duration = Duration::from_secs(4 * 3_600);

fn played(id: ScenarioId, seed: u64) -> TrainingSession {
    let mut session = TrainingSession::with_seed(seed);
    session.run_scenario(id);
    assert!(session.run_until_idle(BUDGET), "{id} did not finish");
    session
}

#[test]
fn direct_start_failure_drains_battery_to_fail_to_start() {
    let mut session = played(ScenarioId::DirectStartFailure, 1);
    let sim = session.simulator();
    assert_eq!(sim.state(), EngineState::Tripped);
    assert!(sim.alarms().trip);
    assert!(sim.alarms().fail_to_start);
    assert_eq!(sim.resources().battery_v, 14.0);
    assert!(!sim.inputs().fuel_valve);

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].scenario, ScenarioId::DirectStartFailure);
    assert_eq!(notices[0].at_ms, 48_100);
    assert!(session.take_notices().is_empty());
}

#[test]
fn normal_start_runs_and_closes_breaker_at_fifty_seconds() {
    let mut session = TrainingSession::with_seed(1);
    session.run_scenario(ScenarioId::NormalStart);

    session.advance_to(Duration::from_millis(45_500));
    assert_eq!(session.simulator().state(), EngineState::Starting);
    session.advance_to(Duration::from_millis(45_600));
    assert_eq!(session.simulator().state(), EngineState::Running);
    assert!(session.simulator().alarms().stabilized);

    session.advance_to(Duration::from_millis(50_599));
    assert!(!session.simulator().inputs().breaker_closed);
    session.advance_to(Duration::from_millis(50_600));
    assert!(session.simulator().inputs().breaker_closed);

    assert!(session.run_until_idle(BUDGET));
    let sim = session.simulator();
    assert_eq!(sim.state(), EngineState::Running);
    assert!(sim.alarms().stabilized);
    // Test mode stays on, so the closed breaker carries no load.
    assert_eq!(sim.outputs().power_kw, 0.5);
    assert_eq!(session.take_notices()[0].at_ms, 106_100);
}

#[test]
fn test_mode_off_failure_matches_direct_failure_with_test_mode_off() {
    let session = played(ScenarioId::TestModeOffFailure, 1);
    let sim = session.simulator();
    assert!(!sim.inputs().test_mode);
    assert_eq!(sim.state(), EngineState::Tripped);
    assert!(sim.alarms().fail_to_start);
    assert_eq!(sim.resources().battery_v, 14.0);
}

#[test]
fn fuel_drain_stops_engine_on_low_fuel() {
    let mut session = TrainingSession::with_seed(1);
    session.run_scenario(ScenarioId::FuelDrain);

    session.advance_to(Duration::from_millis(2_875_100));
    assert_eq!(session.simulator().state(), EngineState::Running);
    assert_eq!(session.simulator().resources().fuel_m3, 0.05);

    session.advance_to(Duration::from_millis(2_900_100));
    assert_eq!(session.simulator().state(), EngineState::Stopped);
    assert!(session.simulator().alarms().trip);
    assert!(session.snapshot().is_scenario_running);

    assert!(session.run_until_idle(BUDGET));
    let diagnostics = session.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].at_ms, 61_100);
    assert_eq!(diagnostics[0].snapshot.engine_state, EngineState::Running);
    assert_eq!(diagnostics[0].snapshot.resources.fuel_m3, 1.18);

    let outcome = session.handle(Command::SetValve {
        valve: deadship_sim::Valve::FillAuxTank,
        open: true,
    });
    assert!(matches!(
        outcome,
        CommandOutcome::Rejected(Rejection::FuelCritical { .. })
    ));
}

#[test]
fn hydraulic_start_auto_closes_breaker_inside_window() {
    for seed in [1, 2, 3, 42] {
        let mut session = TrainingSession::with_seed(seed);
        session.run_scenario(ScenarioId::HydraulicStart);
        session.advance_to(Duration::from_millis(800));
        let sim = session.simulator();
        assert_eq!(sim.state(), EngineState::Starting);
        assert_eq!(sim.resources().battery_v, 14.0);

        let offset = Duration::from_millis(800);
        let due = sim
            .timer_due(SimTimer::AutoBreakerClose)
            .expect("auto-close armed");
        assert!(due >= offset + AUTO_BREAKER_MIN && due < offset + AUTO_BREAKER_MAX);

        session.advance_to(due);
        assert!(session.simulator().inputs().breaker_closed);

        assert!(session.run_until_idle(BUDGET));
        let sim = session.simulator();
        assert_eq!(sim.state(), EngineState::Running);
        assert!(sim.alarms().stabilized);
        // Battery untouched by the hydraulic path.
        assert_eq!(sim.resources().battery_v, 14.0);

        let messages: Vec<_> = session
            .diagnostics()
            .iter()
            .map(|record| record.message.as_str())
            .collect();
        assert_eq!(messages.len(), 5);
        assert_eq!(session.diagnostics()[0].snapshot.engine_state, EngineState::Stopped);
        assert_eq!(session.diagnostics()[1].snapshot.engine_state, EngineState::Starting);
        assert!(session.diagnostics()[4].snapshot.inputs.breaker_closed);
    }
}

#[test]
fn seeded_sessions_replay_identically() {
    let a = played(ScenarioId::HydraulicStart, 99);
    let b = played(ScenarioId::HydraulicStart, 99);
    assert_eq!(a.diagnostics(), b.diagnostics());
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn busy_guard_rejects_everything_but_reset() {
    let mut session = TrainingSession::with_seed(1);
    session.run_scenario(ScenarioId::NormalStart);
    session.advance(Duration::from_secs(1));

    let outcome = session.handle(Command::StartBatteryPath);
    assert_eq!(
        outcome,
        CommandOutcome::Rejected(Rejection::ScenarioBusy(2))
    );
    let outcome = session.handle(Command::ManualPump);
    assert!(!outcome.is_accepted());
    assert_eq!(session.simulator().resources().hydraulic_psi, 0.0);

    assert!(session.handle(Command::Reset).is_accepted());
    let snapshot = session.snapshot();
    assert!(!snapshot.is_scenario_running);
    assert_eq!(snapshot.active_scenario_id, None);
    assert_eq!(snapshot.engine.engine_state, EngineState::Stopped);

    // Nothing from the cancelled script fires afterwards.
    session.advance(Duration::from_secs(200));
    assert_eq!(session.simulator().state(), EngineState::Stopped);
    assert!(!session.simulator().inputs().breaker_closed);
    assert!(session.take_notices().is_empty());
}

#[test]
fn new_scenario_preempts_running_one() {
    let mut session = TrainingSession::with_seed(1);
    session.run_scenario(ScenarioId::DirectStartFailure);
    session.advance(Duration::from_secs(5));
    assert!(session.simulator().resources().battery_v < 24.0);

    assert_eq!(session.run_scenario_number(2), Ok(ScenarioId::NormalStart));
    assert_eq!(session.active_scenario(), Some(ScenarioId::NormalStart));
    assert_eq!(session.simulator().resources().battery_v, 24.0);
    assert_eq!(session.simulator().state(), EngineState::Stopped);

    assert!(session.run_until_idle(BUDGET));
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].scenario, ScenarioId::NormalStart);
}

#[test]
fn commands_are_accepted_again_after_completion() {
    let mut session = played(ScenarioId::NormalStart, 1);
    assert!(!session.snapshot().is_scenario_running);
    assert!(session.handle(Command::OpenBreaker).is_accepted());
    assert!(!session.simulator().inputs().breaker_closed);
}

#[test]
fn engine_timers_fire_before_a_step_at_the_same_instant() {
    let script = ScenarioScript {
        steps: vec![
            ScenarioStep {
                delay: Duration::ZERO,
                action: ScenarioAction::SetState(InputPatch {
                    fuel_valve: Some(true),
                    ..InputPatch::default()
                }),
            },
            ScenarioStep {
                delay: Duration::from_secs(1),
                action: ScenarioAction::StartBattery,
            },
            ScenarioStep {
                delay: Duration::from_secs(45),
                action: ScenarioAction::Diagnostic("at stabilisation"),
            },
            ScenarioStep {
                delay: Duration::from_secs(1),
                action: ScenarioAction::Complete,
            },
        ],
        ..ScenarioId::NormalStart.script()
    };
    let mut session = TrainingSession::with_seed(1);
    session.run_script(script);
    assert!(session.run_until_idle(BUDGET));

    let record = &session.diagnostics()[0];
    assert_eq!(record.at_ms, 46_000);
    assert_eq!(record.snapshot.engine_state, EngineState::Running);
    assert!(record.snapshot.alarms.stabilized);
}

#[test]
fn run_until_idle_respects_budget() {
    let mut session = TrainingSession::with_seed(1);
    session.run_scenario(ScenarioId::NormalStart);
    assert!(!session.run_until_idle(Duration::from_secs(10)));
    assert_eq!(session.now(), Duration::from_secs(10));
    assert!(session.snapshot().is_scenario_running);
}
