//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Scenario playback and training session exports."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Scripted scenario playback for the dead-ship trainer.
//!
//! [`ScenarioRunner`] replays one of the canonical [`ScenarioScript`]s against
//! a simulator; [`TrainingSession`] combines both behind the operator command
//! boundary and drives them on one virtual clock.

pub mod runner;
pub mod scenario;
pub mod session;

pub use runner::{DiagnosticRecord, RunnerTimer, ScenarioNotice, ScenarioRunner};
pub use scenario::{
    catalogue, ScenarioAction, ScenarioError, ScenarioId, ScenarioScript, ScenarioStep,
};
pub use session::{SessionSnapshot, TrainingSession};
