//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging context and macros."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Context-enriched tracing helpers shared by the simulator and harness.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for tests and development.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_test_writer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Canonical scenario being replayed, if any.
    pub scenario: Option<&'a str>,
    /// Engine state at the time of the event.
    pub engine_state: Option<&'a str>,
    /// Start path of the current attempt (battery or hydraulic).
    pub start_path: Option<&'a str>,
    /// Virtual time in milliseconds since simulation start.
    pub sim_time_ms: Option<u64>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a scenario label.
    pub fn with_scenario(mut self, scenario: &'a str) -> Self {
        self.scenario = Some(scenario);
        self
    }

    /// Attach the engine state.
    pub fn with_engine_state(mut self, state: &'a str) -> Self {
        self.engine_state = Some(state);
        self
    }

    /// Attach the start path of the current attempt.
    pub fn with_start_path(mut self, path: &'a str) -> Self {
        self.start_path = Some(path);
        self
    }

    /// Attach the virtual time in milliseconds.
    pub fn with_sim_time_ms(mut self, millis: u64) -> Self {
        self.sim_time_ms = Some(millis);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// A protective function or alarm fired.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized system event with a success/fault outcome.
///
/// Successes are logged at INFO, faults (trips, fail-to-start) at ERROR.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    match outcome {
        SystemEventOutcome::Success => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            scenario = ctx.scenario.unwrap_or(""),
            engine_state = ctx.engine_state.unwrap_or(""),
            start_path = ctx.start_path.unwrap_or(""),
            sim_time_ms = ctx.sim_time_ms.unwrap_or_default(),
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            scenario = ctx.scenario.unwrap_or(""),
            engine_state = ctx.engine_state.unwrap_or(""),
            start_path = ctx.start_path.unwrap_or(""),
            sim_time_ms = ctx.sim_time_ms.unwrap_or_default(),
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_scenario("normal_start")
            .with_engine_state("starting")
            .with_sim_time_ms(600);
        sim_info!(context = ctx.clone(), "attempt started");
        sim_debug!("debug message");
        sim_warn!(context = ctx, "battery at {:.1} V", 14.0);
    }

    #[test]
    fn system_event_helper_emits() {
        init();
        let ctx = LogContext::new().with_start_path("battery");
        log_system_event(
            Some(&ctx),
            "engine.trip",
            "fuel valve closed during start attempt",
            SystemEventOutcome::Fault,
        );
        log_system_event(None, "engine.running", "stabilised", SystemEventOutcome::Success);
    }
}
