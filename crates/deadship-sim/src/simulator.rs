//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Engine supervisory state machine and simulation context."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! The simulation context: plant state, alarms and the timers that move them.
//!
//! Transitions:
//!
//! | from | event | to |
//! |---|---|---|
//! | stopped/tripped/failed | battery start, battery ≥ 16 V | starting |
//! | stopped/tripped/failed | hydraulic start, DO32 closed or ≥ 100 psi | starting |
//! | stopped/tripped/failed | hydraulic start, DO32 open and < 100 psi | failed |
//! | starting | 2 s after an attempt with DO32 closed | tripped |
//! | starting | 45 s after an attempt with DO32 open | running |
//! | starting/running | stop command or fuel depletion | stopped |
//! | any | reset | stopped |
use std::time::Duration;

use deadship_common::time::{format_sim_time, millis};
use deadship_common::SimulationConfig;
use deadship_logging::{
    log_system_event, sim_debug, sim_info, sim_warn, LogContext, SystemEventOutcome,
};
use deadship_rt::TimerSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::command::{Command, CommandOutcome, InputPatch, Rejection};
use crate::journal::{Journal, JournalKind};
use crate::params::{
    ATTEMPT_TRIP_DELAY, AUTO_BREAKER_MAX, AUTO_BREAKER_MIN, BATTERY_FAIL_THRESHOLD_V,
    FUEL_DEPLETION_REASON, FUEL_DRAIN_PERIOD, FUEL_FILL_PERIOD, HY31_PULSE,
    HYDRAULIC_START_THRESHOLD_PSI, PLANT_PARTICULARS, STABILIZATION_DELAY, STABILIZED_AFTER_S,
};
use crate::ramp;
use crate::resources::{FillStep, ResourceSimulator, ResourceState};
use crate::snapshot::{EngineSnapshot, Indications};
use crate::state::{AlarmState, EngineState, OutputState, StartPath, SystemInputs, Valve};

/// Purpose of a pending simulator timer. At most one of each kind is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimTimer {
    AttemptTrip,
    Stabilization,
    AutoBreakerClose,
    Hy31Pulse,
    FuelDrain,
    FuelFill,
    FrameTick,
}

/// Engine timers cancelled whenever the engine leaves an attempt.
const ATTEMPT_TIMERS: [SimTimer; 3] = [
    SimTimer::AttemptTrip,
    SimTimer::Stabilization,
    SimTimer::AutoBreakerClose,
];

#[derive(Debug, Clone, Copy)]
struct Attempt {
    path: StartPath,
    started_at: Duration,
}

#[derive(Debug)]
pub struct Simulator {
    now: Duration,
    inputs: SystemInputs,
    resources: ResourceSimulator,
    state: EngineState,
    alarms: AlarmState,
    outputs: OutputState,
    /// Present only while starting or running.
    attempt: Option<Attempt>,
    timers: TimerSet<SimTimer>,
    rng: StdRng,
    seed: Option<u64>,
    frame_period: Duration,
    journal: Journal,
    generation: u64,
}

impl Simulator {
    pub fn new(config: &SimulationConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            now: Duration::ZERO,
            inputs: SystemInputs::default(),
            resources: ResourceSimulator::new(),
            state: EngineState::Stopped,
            alarms: AlarmState::default(),
            outputs: OutputState::default(),
            attempt: None,
            timers: TimerSet::new(),
            rng,
            seed: config.random_seed,
            frame_period: config.frame_period,
            journal: Journal::default(),
            generation: 0,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(&SimulationConfig::seeded(seed))
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn inputs(&self) -> SystemInputs {
        self.inputs
    }

    pub fn resources(&self) -> ResourceState {
        self.resources.state()
    }

    pub fn alarms(&self) -> AlarmState {
        self.alarms
    }

    pub fn outputs(&self) -> OutputState {
        self.outputs
    }

    pub fn start_path(&self) -> Option<StartPath> {
        self.attempt.map(|attempt| attempt.path)
    }

    /// Time since the current attempt began, while starting or running.
    pub fn attempt_elapsed(&self) -> Option<Duration> {
        self.attempt
            .map(|attempt| self.now.saturating_sub(attempt.started_at))
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Incremented on every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_timer_pending(&self, timer: SimTimer) -> bool {
        self.timers.is_pending(timer)
    }

    pub fn timer_due(&self, timer: SimTimer) -> Option<Duration> {
        self.timers.get(timer).map(|pending| pending.due)
    }

    pub fn pending_timers(&self) -> impl Iterator<Item = SimTimer> + '_ {
        self.timers.keys()
    }

    /// Dispatch an operator command.
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        match command {
            Command::SetValve { valve, open } => self.set_valve(valve, open),
            Command::PulseHy31 => self.pulse_hy31(),
            Command::SetTestMode(on) => {
                self.set_test_mode(on);
                CommandOutcome::Accepted
            }
            Command::SetShorePower(connected) => {
                self.inputs.shore_power_connected = connected;
                self.journal.record(
                    self.now,
                    JournalKind::Breaker,
                    format!("shore power {}", if connected { "connected" } else { "disconnected" }),
                );
                CommandOutcome::Accepted
            }
            Command::StartBatteryPath => self.start_battery_path(),
            Command::StopEngine { reason } => self.stop_engine(reason.as_deref()),
            Command::CloseBreaker => {
                self.set_breaker(true, "closed by operator");
                CommandOutcome::Accepted
            }
            Command::OpenBreaker => {
                self.set_breaker(false, "opened by operator");
                CommandOutcome::Accepted
            }
            Command::ManualPump => {
                self.manual_pump();
                CommandOutcome::Accepted
            }
            Command::Reset => {
                self.reset();
                CommandOutcome::Accepted
            }
        }
    }

    pub fn set_valve(&mut self, valve: Valve, open: bool) -> CommandOutcome {
        if valve == Valve::FillAuxTank && open && self.resources.fuel_critical() {
            let fuel_m3 = self.resources.state().fuel_m3;
            self.raise_fail_to_start("refill requested while fuel is critical");
            return self.reject(Rejection::FuelCritical { fuel_m3 });
        }
        *self.inputs.valve_mut(valve) = open;
        match (valve, open) {
            (Valve::FillAuxTank, true) => {
                self.timers
                    .schedule_interval_if_absent(SimTimer::FuelFill, self.now, FUEL_FILL_PERIOD);
            }
            (Valve::FillAuxTank, false) => {
                self.timers.cancel(SimTimer::FuelFill);
            }
            (Valve::DrainToStorage, true) => {
                self.timers
                    .schedule_interval_if_absent(SimTimer::FuelDrain, self.now, FUEL_DRAIN_PERIOD);
            }
            (Valve::DrainToStorage, false) => {
                self.timers.cancel(SimTimer::FuelDrain);
            }
            (Valve::FuelToEngine, _) => {}
        }
        let position = if open { "open" } else { "closed" };
        self.journal
            .record(self.now, JournalKind::Valve, format!("{valve} {position}"));
        sim_debug!(context = self.log_context(), "valve {} {}", valve, position);
        CommandOutcome::Accepted
    }

    pub fn set_test_mode(&mut self, on: bool) {
        self.inputs.test_mode = on;
        self.journal.record(
            self.now,
            JournalKind::Valve,
            format!("test mode {}", if on { "on" } else { "off" }),
        );
        self.update_outputs();
    }

    pub fn close_breaker(&mut self) {
        self.set_breaker(true, "closed");
    }

    pub fn open_breaker(&mut self) {
        self.set_breaker(false, "opened");
    }

    fn set_breaker(&mut self, closed: bool, detail: &str) {
        self.inputs.breaker_closed = closed;
        self.journal
            .record(self.now, JournalKind::Breaker, format!("breaker {detail}"));
        sim_info!(context = self.log_context(), "breaker {}", detail);
        self.update_outputs();
    }

    pub fn manual_pump(&mut self) {
        let psi = self.resources.pump();
        self.journal
            .record(self.now, JournalKind::Resource, format!("hand pump, {psi:.0} psi"));
    }

    /// Apply a scripted set-state step. Valves go through their normal handlers.
    pub fn apply_patch(&mut self, patch: InputPatch) {
        if let Some(open) = patch.fuel_valve {
            self.set_valve(Valve::FuelToEngine, open);
        }
        if let Some(open) = patch.drain_valve {
            self.set_valve(Valve::DrainToStorage, open);
        }
        if let Some(on) = patch.test_mode {
            self.set_test_mode(on);
        }
        if let Some(volts) = patch.battery_v {
            self.resources.set_battery(volts);
            self.journal.record(
                self.now,
                JournalKind::Resource,
                format!("battery forced to {:.1} V", self.resources.state().battery_v),
            );
        }
        if let Some(psi) = patch.hydraulic_psi {
            self.resources.set_hydraulic(psi);
            self.journal.record(
                self.now,
                JournalKind::Resource,
                format!("hydraulic forced to {:.0} psi", self.resources.state().hydraulic_psi),
            );
        }
    }

    /// Press START on the battery path.
    pub fn start_battery_path(&mut self) -> CommandOutcome {
        if !self.state.accepts_start() {
            return self.reject(Rejection::EngineBusy(self.state));
        }
        if !self.resources.can_start_on_battery() {
            let battery_v = self.resources.state().battery_v;
            self.raise_fail_to_start("battery below start threshold");
            return self.reject(Rejection::BatteryLow { battery_v });
        }
        self.alarms.clear_faults();
        let remaining = self.resources.drain_battery_for_attempt();
        self.journal.record(
            self.now,
            JournalKind::Resource,
            format!("battery start attempt, {remaining:.1} V remaining"),
        );
        self.begin_attempt(StartPath::Battery);
        CommandOutcome::Accepted
    }

    /// Operate the momentary HY31 valve: pulse it and crank hydraulically.
    pub fn pulse_hy31(&mut self) -> CommandOutcome {
        if !self.state.accepts_start() {
            return self.reject(Rejection::EngineBusy(self.state));
        }
        self.inputs.hy31 = true;
        self.timers
            .schedule_once(SimTimer::Hy31Pulse, self.now, HY31_PULSE);
        self.start_hydraulic_path()
    }

    /// Crank on the hydraulic accumulator. Does not draw on the battery.
    pub fn start_hydraulic_path(&mut self) -> CommandOutcome {
        if !self.state.accepts_start() {
            return self.reject(Rejection::EngineBusy(self.state));
        }
        self.alarms.clear_faults();
        self.begin_attempt(StartPath::Hydraulic);
        CommandOutcome::Accepted
    }

    pub fn stop_engine(&mut self, reason: Option<&str>) -> CommandOutcome {
        if !self.state.is_active() {
            return self.reject(Rejection::NotRunning(self.state));
        }
        self.stop_with_reason(reason);
        CommandOutcome::Accepted
    }

    /// Reinitialise every entity. Pending timers are cancelled first so nothing
    /// armed before the reset can fire into the new generation.
    pub fn reset(&mut self) {
        let cancelled = self.timers.cancel_all();
        self.generation += 1;
        self.inputs = SystemInputs::default();
        self.resources.reset();
        self.state = EngineState::Stopped;
        self.alarms = AlarmState::default();
        self.outputs = OutputState::default();
        self.attempt = None;
        if let Some(seed) = self.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.journal.record(
            self.now,
            JournalKind::Reset,
            format!("generation {}", self.generation),
        );
        sim_info!(
            context = self.log_context(),
            "simulation reset (generation {}, {} timers cancelled)",
            self.generation,
            cancelled
        );
    }

    /// Earliest pending timer, if any.
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Fire the earliest timer due at or before `until`, moving the clock to it.
    pub fn fire_next(&mut self, until: Duration) -> bool {
        let Some(fired) = self.timers.pop_due(until) else {
            return false;
        };
        if fired.at > self.now {
            self.now = fired.at;
        }
        self.on_timer(fired.key);
        true
    }

    /// Run every timer due up to `target`, then park the clock there.
    pub fn advance_to(&mut self, target: Duration) {
        while self.fire_next(target) {}
        if target > self.now {
            self.now = target;
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.advance_to(self.now.saturating_add(by));
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let can_start_on_battery = self.resources.can_start_on_battery();
        EngineSnapshot {
            sim_time_ms: millis(self.now),
            engine_state: self.state,
            start_path: self.start_path(),
            attempt_elapsed_s: self.attempt_elapsed().map(|elapsed| elapsed.as_secs_f64()),
            alarms: self.alarms,
            resources: self.resources.state(),
            outputs: self.outputs,
            inputs: self.inputs,
            indications: Indications {
                battery_band: self.resources.battery_band(),
                can_start_on_battery,
                low_battery: !can_start_on_battery,
                fuel_critical: self.resources.fuel_critical(),
                fuel_fraction: self.resources.fuel_fraction(),
            },
            particulars: PLANT_PARTICULARS,
        }
    }

    fn begin_attempt(&mut self, path: StartPath) {
        for timer in ATTEMPT_TIMERS {
            self.timers.cancel(timer);
        }
        self.alarms.stabilized = false;

        // A closed fuel valve always ends in a trip, whatever the pressure.
        if path == StartPath::Hydraulic
            && self.inputs.fuel_valve
            && self.resources.state().hydraulic_psi < HYDRAULIC_START_THRESHOLD_PSI
        {
            self.attempt = None;
            let detail = format!(
                "hydraulic pressure {:.0} psi below {:.0} psi",
                self.resources.state().hydraulic_psi,
                HYDRAULIC_START_THRESHOLD_PSI
            );
            self.raise_fail_to_start(&detail);
            self.transition(EngineState::Failed, &detail);
            return;
        }

        self.attempt = Some(Attempt {
            path,
            started_at: self.now,
        });
        self.transition(EngineState::Starting, "start attempt");

        if !self.inputs.fuel_valve {
            self.timers
                .schedule_once(SimTimer::AttemptTrip, self.now, ATTEMPT_TRIP_DELAY);
        } else {
            self.timers
                .schedule_once(SimTimer::Stabilization, self.now, STABILIZATION_DELAY);
            if path == StartPath::Hydraulic {
                let delay = self.auto_breaker_delay();
                let due = self
                    .timers
                    .schedule_once(SimTimer::AutoBreakerClose, self.now, delay);
                sim_debug!(
                    context = self.log_context(),
                    "breaker auto-close armed for {}",
                    format_sim_time(due)
                );
            }
        }
        self.check_fuel_depletion();
    }

    fn auto_breaker_delay(&mut self) -> Duration {
        let ms = self
            .rng
            .gen_range(millis(AUTO_BREAKER_MIN)..millis(AUTO_BREAKER_MAX));
        Duration::from_millis(ms)
    }

    fn on_timer(&mut self, timer: SimTimer) {
        match timer {
            SimTimer::AttemptTrip => self.on_attempt_trip(),
            SimTimer::Stabilization => self.on_stabilization(),
            SimTimer::AutoBreakerClose => {
                if self.state.is_active() {
                    self.set_breaker(true, "auto-closed after hydraulic start");
                }
            }
            SimTimer::Hy31Pulse => {
                self.inputs.hy31 = false;
            }
            SimTimer::FuelDrain => {
                let fuel = self.resources.drain_fuel_step();
                sim_debug!(context = self.log_context(), "drain step, {:.3} m³ left", fuel);
                self.check_fuel_depletion();
            }
            SimTimer::FuelFill => {
                if self.resources.fill_fuel_step() == FillStep::Full {
                    self.timers.cancel(SimTimer::FuelFill);
                    self.journal
                        .record(self.now, JournalKind::Resource, "service tank full");
                }
            }
            SimTimer::FrameTick => {
                self.update_outputs();
                self.check_fuel_depletion();
            }
        }
    }

    fn on_attempt_trip(&mut self) {
        let Some(attempt) = self.attempt else {
            return;
        };
        if self.state != EngineState::Starting {
            return;
        }
        self.alarms.trip = true;
        let mut detail = String::from("fuel valve DO32 closed during start attempt");
        if attempt.path == StartPath::Battery
            && self.resources.state().battery_v < BATTERY_FAIL_THRESHOLD_V
        {
            self.alarms.fail_to_start = true;
            detail.push_str("; battery exhausted");
        }
        self.trip(&detail);
    }

    fn on_stabilization(&mut self) {
        if self.state != EngineState::Starting {
            return;
        }
        if !self.inputs.fuel_valve {
            self.alarms.trip = true;
            self.trip("fuel valve DO32 closed before stabilisation");
            return;
        }
        self.transition(EngineState::Running, "stabilised");
        log_system_event(
            Some(&self.log_context()),
            "engine.running",
            "generator running and stabilised",
            SystemEventOutcome::Success,
        );
    }

    fn trip(&mut self, detail: &str) {
        log_system_event(
            Some(&self.log_context()),
            "engine.trip",
            detail,
            SystemEventOutcome::Fault,
        );
        self.journal
            .record(self.now, JournalKind::Alarm, format!("trip: {detail}"));
        for timer in ATTEMPT_TIMERS {
            self.timers.cancel(timer);
        }
        self.transition(EngineState::Tripped, detail);
        self.attempt = None;
    }

    fn check_fuel_depletion(&mut self) {
        if !self.resources.fuel_critical() || !self.state.is_active() {
            return;
        }
        if self.inputs.fill_valve {
            self.inputs.fill_valve = false;
            self.timers.cancel(SimTimer::FuelFill);
            self.journal.record(
                self.now,
                JournalKind::Valve,
                "DO33 closed: fuel below critical level",
            );
        }
        self.stop_with_reason(Some(FUEL_DEPLETION_REASON));
    }

    fn stop_with_reason(&mut self, reason: Option<&str>) {
        for timer in ATTEMPT_TIMERS {
            self.timers.cancel(timer);
        }
        if let Some(reason) = reason {
            self.alarms.trip = true;
            log_system_event(
                Some(&self.log_context()),
                "engine.stop",
                reason,
                SystemEventOutcome::Fault,
            );
            self.journal
                .record(self.now, JournalKind::Alarm, format!("stop: {reason}"));
        }
        self.transition(EngineState::Stopped, reason.unwrap_or("operator stop"));
        self.attempt = None;
    }

    fn transition(&mut self, to: EngineState, reason: &str) {
        let from = self.state;
        self.state = to;
        if from != to {
            self.journal.record(
                self.now,
                JournalKind::Transition,
                format!("{from} -> {to}: {reason}"),
            );
            sim_info!(context = self.log_context(), "engine {} -> {}: {}", from, to, reason);
        }
        if to.is_active() {
            self.timers
                .schedule_interval_if_absent(SimTimer::FrameTick, self.now, self.frame_period);
            self.update_outputs();
        } else {
            self.timers.cancel(SimTimer::FrameTick);
            self.outputs = OutputState::default();
            self.alarms.stabilized = false;
        }
    }

    /// Per-tick recomputation of the derived outputs. A no-op unless turning.
    fn update_outputs(&mut self) {
        let Some(attempt) = self.attempt else {
            return;
        };
        if !self.state.is_active() {
            return;
        }
        let elapsed = self.now.saturating_sub(attempt.started_at).as_secs_f64();
        let sample = ramp::interpolate(elapsed);
        self.outputs = OutputState::derive(sample, self.state, self.inputs.on_load(self.state));
        let stabilized = self.state == EngineState::Running && elapsed >= STABILIZED_AFTER_S;
        if stabilized && !self.alarms.stabilized {
            self.journal
                .record(self.now, JournalKind::Alarm, "stabilised");
        }
        self.alarms.stabilized = stabilized;
    }

    fn raise_fail_to_start(&mut self, detail: &str) {
        self.alarms.fail_to_start = true;
        self.journal
            .record(self.now, JournalKind::Alarm, format!("fail to start: {detail}"));
        log_system_event(
            Some(&self.log_context()),
            "engine.fail_to_start",
            detail,
            SystemEventOutcome::Fault,
        );
    }

    fn reject(&mut self, rejection: Rejection) -> CommandOutcome {
        self.journal
            .record(self.now, JournalKind::Rejected, rejection.to_string());
        sim_warn!(context = self.log_context(), "command rejected: {}", rejection);
        CommandOutcome::Rejected(rejection)
    }

    fn log_context(&self) -> LogContext<'static> {
        let mut ctx = LogContext::new()
            .with_engine_state(self.state.as_str())
            .with_sim_time_ms(millis(self.now));
        if let Some(attempt) = self.attempt {
            ctx = ctx.with_start_path(attempt.path.as_str());
        }
        ctx
    }
}
