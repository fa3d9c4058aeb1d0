//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Operator command boundary merging engine and scenario timers."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! [`TrainingSession`] is everything the presentation layer talks to: it takes
//! commands (including `runScenario`), advances the shared virtual clock and
//! hands out snapshots.
use std::time::Duration;

use deadship_common::time::millis;
use deadship_common::SimulationConfig;
use deadship_logging::{sim_info, sim_warn, LogContext};
use deadship_sim::{Command, CommandOutcome, EngineSnapshot, Rejection, Simulator};
use serde::Serialize;

use crate::runner::{DiagnosticRecord, ScenarioNotice, ScenarioRunner};
use crate::scenario::{ScenarioError, ScenarioId, ScenarioScript};

/// Engine snapshot plus scenario playback status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub engine: EngineSnapshot,
    pub is_scenario_running: bool,
    pub active_scenario_id: Option<u8>,
}

#[derive(Debug)]
pub struct TrainingSession {
    sim: Simulator,
    runner: ScenarioRunner,
}

impl TrainingSession {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            sim: Simulator::new(config),
            runner: ScenarioRunner::new(config.notice_delay),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(&SimulationConfig::seeded(seed))
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    pub fn runner(&self) -> &ScenarioRunner {
        &self.runner
    }

    pub fn now(&self) -> Duration {
        self.sim.now()
    }

    pub fn active_scenario(&self) -> Option<ScenarioId> {
        self.runner.active()
    }

    /// Apply an operator command. While a scenario plays only `Reset` gets through.
    pub fn handle(&mut self, command: Command) -> CommandOutcome {
        if command == Command::Reset {
            self.reset();
            return CommandOutcome::Accepted;
        }
        if let Some(active) = self.runner.active() {
            let rejection = Rejection::ScenarioBusy(active.number());
            sim_warn!(
                context = self.context(),
                "{:?} rejected: {}",
                command,
                rejection
            );
            return rejection.into();
        }
        self.sim.apply(command)
    }

    /// Reset the plant and play a canonical scenario, pre-empting any running one.
    pub fn run_scenario(&mut self, id: ScenarioId) {
        self.run_script(id.script());
    }

    /// `runScenario(n)` as issued from the command boundary.
    pub fn run_scenario_number(&mut self, number: u8) -> Result<ScenarioId, ScenarioError> {
        let id = ScenarioId::try_from(number)?;
        self.run_scenario(id);
        Ok(id)
    }

    pub fn run_script(&mut self, script: ScenarioScript) {
        if let Some(previous) = self.runner.active() {
            sim_info!(
                context = self.context(),
                "scenario {} pre-empted by scenario {}",
                previous.number(),
                script.id.number()
            );
        }
        self.runner.cancel();
        self.sim.reset();
        self.runner.load(script, self.sim.now());
    }

    /// Cancel any scenario, then reinitialise the plant.
    pub fn reset(&mut self) {
        if self.runner.cancel() {
            sim_info!(context = self.context(), "scenario playback cancelled by reset");
        }
        self.sim.reset();
    }

    /// Advance the shared clock to `target`.
    ///
    /// Engine timers due at or before a scenario step run first, so a step
    /// always sees the plant as of its own instant.
    pub fn advance_to(&mut self, target: Duration) {
        while let Some(due) = self.runner.next_due().filter(|due| *due <= target) {
            self.sim.advance_to(due);
            self.runner.fire_next(&mut self.sim, due);
        }
        self.sim.advance_to(target);
    }

    pub fn advance(&mut self, by: Duration) {
        self.advance_to(self.now().saturating_add(by));
    }

    /// Advance until no scenario is playing and no completion notice is pending,
    /// giving up after `budget` of virtual time. Returns whether it went idle.
    pub fn run_until_idle(&mut self, budget: Duration) -> bool {
        let deadline = self.now().saturating_add(budget);
        loop {
            if !self.runner.is_running() && !self.runner.notice_pending() {
                return true;
            }
            match self.runner.next_due() {
                Some(due) if due <= deadline => self.advance_to(due),
                _ => {
                    self.advance_to(deadline);
                    return false;
                }
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let active = self.runner.active();
        SessionSnapshot {
            engine: self.sim.snapshot(),
            is_scenario_running: active.is_some(),
            active_scenario_id: active.map(ScenarioId::number),
        }
    }

    pub fn take_notices(&mut self) -> Vec<ScenarioNotice> {
        self.runner.take_notices()
    }

    pub fn diagnostics(&self) -> &[DiagnosticRecord] {
        self.runner.diagnostics()
    }

    fn context(&self) -> LogContext<'static> {
        let mut ctx = LogContext::new()
            .with_engine_state(self.sim.state().as_str())
            .with_sim_time_ms(millis(self.sim.now()));
        if let Some(id) = self.runner.active() {
            ctx = ctx.with_scenario(id.as_str());
        }
        ctx
    }
}
