//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Sequential playback of scenario scripts on the virtual clock."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::time::Duration;

use deadship_common::time::{format_sim_time, millis};
use deadship_logging::{sim_info, sim_warn, LogContext};
use deadship_rt::TimerSet;
use deadship_sim::{EngineSnapshot, Simulator};
use serde::Serialize;

use crate::scenario::{ScenarioAction, ScenarioId, ScenarioScript, ScenarioStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerTimer {
    NextStep,
    CompletionNotice,
}

/// Snapshot captured by a diagnostic step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRecord {
    pub scenario: ScenarioId,
    pub at_ms: u64,
    pub message: String,
    pub snapshot: EngineSnapshot,
}

/// Surfaced shortly after a scenario completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioNotice {
    pub scenario: ScenarioId,
    pub at_ms: u64,
    pub message: String,
}

/// Plays one script at a time against a [`Simulator`].
///
/// Owns a single step timer and a completion-notice timer. [`cancel`](Self::cancel)
/// drops both together with the remaining queue.
#[derive(Debug)]
pub struct ScenarioRunner {
    queue: VecDeque<ScenarioStep>,
    active: Option<ScenarioId>,
    completed: Option<ScenarioId>,
    timers: TimerSet<RunnerTimer>,
    notice_delay: Duration,
    diagnostics: Vec<DiagnosticRecord>,
    notices: VecDeque<ScenarioNotice>,
}

impl ScenarioRunner {
    pub fn new(notice_delay: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            active: None,
            completed: None,
            timers: TimerSet::new(),
            notice_delay,
            diagnostics: Vec::new(),
            notices: VecDeque::new(),
        }
    }

    /// Scenario currently playing. Cleared as soon as its script completes.
    pub fn active(&self) -> Option<ScenarioId> {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn notice_pending(&self) -> bool {
        self.timers.is_pending(RunnerTimer::CompletionNotice)
    }

    pub fn remaining_steps(&self) -> usize {
        self.queue.len()
    }

    pub fn diagnostics(&self) -> &[DiagnosticRecord] {
        &self.diagnostics
    }

    pub fn take_notices(&mut self) -> Vec<ScenarioNotice> {
        self.notices.drain(..).collect()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Drop the queue and every outstanding timer. Returns whether anything was playing.
    pub fn cancel(&mut self) -> bool {
        let was_busy = self.active.is_some() || !self.timers.is_empty();
        self.timers.cancel_all();
        self.queue.clear();
        self.active = None;
        self.completed = None;
        was_busy
    }

    /// Start playing `script` from `now`. The caller resets the plant first.
    pub fn load(&mut self, script: ScenarioScript, now: Duration) {
        self.cancel();
        self.diagnostics.clear();
        self.active = Some(script.id);
        self.queue = script.steps.into();
        sim_info!(
            context = Self::context(script.id, now),
            "scenario {} ({}) loaded with {} steps",
            script.id.number(),
            script.name,
            self.queue.len()
        );
        self.arm_next(now);
    }

    /// Fire the earliest runner timer due at or before `until`.
    ///
    /// The simulator clock must already stand at the timer's due time.
    pub fn fire_next(&mut self, sim: &mut Simulator, until: Duration) -> bool {
        let Some(fired) = self.timers.pop_due(until) else {
            return false;
        };
        match fired.key {
            RunnerTimer::NextStep => self.perform_next(sim, fired.at),
            RunnerTimer::CompletionNotice => self.publish_notice(fired.at),
        }
        true
    }

    fn arm_next(&mut self, now: Duration) {
        match (self.active, self.queue.front()) {
            (Some(_), Some(step)) => {
                self.timers
                    .schedule_once(RunnerTimer::NextStep, now, step.delay);
            }
            (Some(id), None) => self.complete(id, now),
            (None, _) => {}
        }
    }

    fn perform_next(&mut self, sim: &mut Simulator, now: Duration) {
        let (Some(id), Some(step)) = (self.active, self.queue.pop_front()) else {
            return;
        };
        let ctx = Self::context(id, now);
        sim_info!(context = ctx, "step {}", step.action.label());
        match step.action {
            ScenarioAction::SetState(patch) => sim.apply_patch(patch),
            ScenarioAction::StartBattery => {
                let outcome = sim.start_battery_path();
                if let Some(rejection) = outcome.rejection() {
                    sim_info!(context = ctx, "scripted battery start refused: {}", rejection);
                }
            }
            ScenarioAction::StartHydraulic => {
                let outcome = sim.start_hydraulic_path();
                if let Some(rejection) = outcome.rejection() {
                    sim_info!(context = ctx, "scripted hydraulic start refused: {}", rejection);
                }
            }
            ScenarioAction::CloseBreaker => sim.close_breaker(),
            ScenarioAction::ForceBreakerClose => {
                if sim.inputs().breaker_closed {
                    sim_info!(context = ctx, "breaker already closed by auto-close");
                } else {
                    sim_warn!(context = ctx, "breaker auto-close did not happen; forcing close");
                    sim.close_breaker();
                }
            }
            ScenarioAction::Diagnostic(message) => {
                let snapshot = sim.snapshot();
                sim_info!(
                    context = ctx,
                    "diagnostic: {} | engine={} breaker={} hydraulic={:.0} psi DO32={} {:.1} V {:.2} Hz",
                    message,
                    snapshot.engine_state,
                    snapshot.inputs.breaker_closed,
                    snapshot.resources.hydraulic_psi,
                    snapshot.inputs.fuel_valve,
                    snapshot.outputs.voltage_v,
                    snapshot.outputs.frequency_hz
                );
                self.diagnostics.push(DiagnosticRecord {
                    scenario: id,
                    at_ms: millis(now),
                    message: message.to_owned(),
                    snapshot,
                });
            }
            ScenarioAction::Complete => {
                self.complete(id, now);
                return;
            }
        }
        self.arm_next(now);
    }

    fn complete(&mut self, id: ScenarioId, now: Duration) {
        self.queue.clear();
        self.active = None;
        self.completed = Some(id);
        let due = self
            .timers
            .schedule_once(RunnerTimer::CompletionNotice, now, self.notice_delay);
        sim_info!(
            context = Self::context(id, now),
            "scenario {} complete; notice at {}",
            id.number(),
            format_sim_time(due)
        );
    }

    fn publish_notice(&mut self, now: Duration) {
        let Some(id) = self.completed.take() else {
            return;
        };
        let script = id.script();
        self.notices.push_back(ScenarioNotice {
            scenario: id,
            at_ms: millis(now),
            message: format!(
                "Scenario {} ({}) completed. Check the plant against the expected behaviour.",
                id.number(),
                script.name
            ),
        });
    }

    fn context(id: ScenarioId, now: Duration) -> LogContext<'static> {
        LogContext::new()
            .with_scenario(id.as_str())
            .with_sim_time_ms(millis(now))
    }
}
